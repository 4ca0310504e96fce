use super::ui::RecordProgress;
use super::{load_config, load_interest_map, millis};
use crate::output::Output;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use history_sync_config::PathManager;
use history_sync_core::{
    from_export_row, needs_refine, read_export_rows, refine_records, write_refined, DeepRefineOptions, RefineOptions,
    TimeResolver,
};
use history_sync_sources::DoubanClient;
use serde_json::json;
use std::path::PathBuf;

pub struct RefineArgs {
    pub input: PathBuf,
    pub out: PathBuf,
    pub user_id: Option<String>,
    pub only_missing: bool,
    pub deep_refine: bool,
    pub limit: Option<usize>,
    pub backup: bool,
}

pub async fn run_refine(args: RefineArgs, output: &Output) -> Result<()> {
    tracing::debug!("Refine command started");

    let paths = PathManager::default();
    let mut config = load_config(&paths)?;
    if let Some(user_id) = args.user_id {
        config.douban.user_id = user_id;
    }

    let rows = read_export_rows(&args.input).wrap_err_with(|| format!("Failed to read {}", args.input.display()))?;
    let candidates = rows
        .iter()
        .filter(|row| !args.only_missing || needs_refine(&from_export_row(row)))
        .count();
    output.info(format!(
        "Loaded {} rows from {} ({} to refine)",
        rows.len(),
        args.input.display(),
        candidates
    ));

    let douban = DoubanClient::from_config(&config.http, config.douban.user_id.clone())
        .wrap_err("Failed to build Douban HTTP client")?;
    let interests = load_interest_map(&douban, &config, output).await;

    let deep = DeepRefineOptions {
        enabled: args.deep_refine || config.refine.deep_refine,
        window_days: config.refine.window_days,
    };
    let resolver = TimeResolver::new(&interests).with_deep_refine(&douban, deep);

    let options = RefineOptions {
        only_missing: args.only_missing,
        request_delay: millis(config.pacing.request_delay_ms),
        limit: args.limit,
        backup: args.backup,
    };
    let mut progress = RecordProgress::new("Refining watch times", output.is_quiet());
    let outcome = refine_records(rows, &resolver, options, &mut progress).await;

    let backup = write_refined(&args.input, &args.out, &outcome.rows, &options)
        .wrap_err_with(|| format!("Failed to write {}", args.out.display()))?;

    if output.is_human() {
        output.summary(
            "Refine",
            &[
                ("Rows", outcome.rows.len().to_string()),
                ("Updated", outcome.updated.to_string()),
                ("Kept", outcome.kept.to_string()),
            ],
        );
        if let Some(backup) = &backup {
            output.info(format!("Backup written to {}", backup.display()));
        }
        output.success(format!("Wrote {}", args.out.display()));
    } else {
        output.json(&json!({
            "success": true,
            "output": args.out.display().to_string(),
            "backup": backup.map(|p| p.display().to_string()),
            "rows": outcome.rows.len(),
            "updated": outcome.updated,
            "kept": outcome.kept,
        }));
    }

    Ok(())
}
