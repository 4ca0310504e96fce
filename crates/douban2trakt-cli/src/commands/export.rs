use super::ui::RecordProgress;
use super::{load_config, load_interest_map, millis, trakt_client_id};
use crate::output::Output;
use chrono::NaiveDate;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use history_sync_config::PathManager;
use history_sync_core::{write_export, CatalogMatcher, DeepRefineOptions, MigrationPipeline, TimeResolver};
use history_sync_sources::{read_raw_records, retain_after, DoubanClient, TraktClient};
use serde_json::json;
use std::path::PathBuf;

pub struct ExportArgs {
    pub input: PathBuf,
    pub out: PathBuf,
    pub user_id: Option<String>,
    pub since: Option<NaiveDate>,
    pub deep_refine: bool,
    pub deep_refine_window: Option<i64>,
    pub all_statuses: bool,
    pub trakt_client_id: Option<String>,
}

pub async fn run_export(args: ExportArgs, output: &Output) -> Result<()> {
    tracing::debug!("Export command started");

    let paths = PathManager::default();
    let mut config = load_config(&paths)?;
    if let Some(user_id) = args.user_id {
        config.douban.user_id = user_id;
    }
    if args.all_statuses {
        config.use_all_statuses();
    }
    if args.deep_refine {
        config.refine.deep_refine = true;
    }
    if args.deep_refine_window.is_some() {
        config.refine.window_days = args.deep_refine_window;
    }

    let mut rows = read_raw_records(&args.input)
        .wrap_err_with(|| format!("Failed to read rows from {}", args.input.display()))?;
    let read = rows.len();
    if let Some(since) = args.since {
        rows = retain_after(rows, since);
        tracing::info!(kept = rows.len(), skipped = read - rows.len(), %since, "Filtered rows by date");
    }
    if rows.is_empty() {
        output.warn(format!("No rows to export from {}", args.input.display()));
    }

    let client_id = trakt_client_id(args.trakt_client_id.as_deref(), &config)?;
    let douban = DoubanClient::from_config(&config.http, config.douban.user_id.clone())
        .wrap_err("Failed to build Douban HTTP client")?;
    let trakt = TraktClient::from_config(&config.http, client_id).wrap_err("Failed to build Trakt HTTP client")?;

    let interests = load_interest_map(&douban, &config, output).await;

    let deep = DeepRefineOptions {
        enabled: config.refine.deep_refine,
        window_days: config.refine.window_days,
    };
    let resolver = TimeResolver::new(&interests).with_deep_refine(&douban, deep);
    let pipeline = MigrationPipeline::new(resolver, CatalogMatcher::new(&trakt))
        .with_request_delay(millis(config.pacing.request_delay_ms));

    let mut progress = RecordProgress::new("Resolving and matching", output.is_quiet());
    let result = pipeline.run(&rows, &mut progress).await;

    let written = write_export(&args.out, &result.records)
        .wrap_err_with(|| format!("Failed to write {}", args.out.display()))?;

    let stats = &result.stats;
    if output.is_human() {
        output.summary(
            "Export",
            &[
                ("Rows", stats.total.to_string()),
                ("Matched", stats.matched.to_string()),
                ("Unmatched", stats.unmatched.to_string()),
                ("Time from feed", stats.feed_timed.to_string()),
                ("Time from page date", stats.page_timed.to_string()),
                ("Time from deep fetch", stats.deep_timed.to_string()),
                ("No time", stats.untimed.to_string()),
            ],
        );
        if stats.unmatched > 0 {
            output.warn(format!(
                "{} rows had no catalog match; fix their slug and set found=1 in {} before syncing",
                stats.unmatched,
                args.out.display()
            ));
        }
        output.success(format!("Wrote {} rows to {}", written, args.out.display()));
    } else {
        output.json(&json!({
            "success": true,
            "output": args.out.display().to_string(),
            "rows": written,
            "stats": stats,
        }));
    }

    Ok(())
}
