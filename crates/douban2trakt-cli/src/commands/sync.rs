use super::{load_config, millis, trakt_client_id};
use crate::output::Output;
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use history_sync_config::{resolve_credential, CredentialStore, PathManager, TRAKT_ACCESS_TOKEN_ENV};
use history_sync_core::transmit::WHOLE_SHOW_WARNING;
use history_sync_core::{preview_payloads, read_export, transmit_batches, PayloadAggregator};
use history_sync_models::{SyncBucket, SyncMode};
use history_sync_sources::TraktClient;
use serde_json::json;
use std::path::PathBuf;

pub struct SyncArgs {
    pub csv: PathBuf,
    pub mode: Option<SyncMode>,
    pub trakt_client_id: Option<String>,
    pub trakt_token: Option<String>,
    pub batch_size: Option<usize>,
    pub dry_run: bool,
}

pub async fn run_sync(args: SyncArgs, output: &Output) -> Result<()> {
    tracing::debug!("Sync command started");

    let paths = PathManager::default();
    let config = load_config(&paths)?;
    let mode = args.mode.unwrap_or(config.sync.mode);
    let batch_size = args.batch_size.unwrap_or(config.sync.batch_size);
    if batch_size == 0 {
        return Err(eyre!("--batch-size must be at least 1"));
    }

    let records = read_export(&args.csv).wrap_err_with(|| format!("Failed to read {}", args.csv.display()))?;
    let plan = PayloadAggregator::new(mode).with_batch_size(batch_size).aggregate(&records);

    output.summary(
        &format!("Sync plan ({})", mode),
        &[
            ("Rows", records.len().to_string()),
            ("Movies", plan.movies.len().to_string()),
            ("Shows with seasons", plan.show_seasons.len().to_string()),
            ("Shows without season", plan.show_whole.len().to_string()),
            ("Excluded", plan.excluded.len().to_string()),
            ("Batches", plan.batches().len().to_string()),
        ],
    );

    if plan.has_whole_show_history() {
        output.warn(WHOLE_SHOW_WARNING);
    }

    if args.dry_run {
        for preview in preview_payloads(&plan) {
            if output.is_human() {
                let shown = preview.payload.len();
                let note = if shown < preview.total_entries {
                    format!(" (first {} of {})", shown, preview.total_entries)
                } else {
                    String::new()
                };
                output.info(format!("POST /sync/{} [{}]{}", preview.endpoint, preview.bucket, note));
            }
            output.json(&serde_json::to_value(&preview)?);
        }
        output.success("Dry run: nothing was sent");
        return Ok(());
    }

    if plan.is_empty() {
        output.warn(format!("No matched rows in {}; nothing to send", args.csv.display()));
        return Ok(());
    }

    let client_id = trakt_client_id(args.trakt_client_id.as_deref(), &config)?;
    let mut trakt = TraktClient::from_config(&config.http, client_id)
        .wrap_err("Failed to build Trakt HTTP client")?
        .with_client_secret(config.trakt.client_secret.clone());

    match resolve_credential(args.trakt_token.as_deref(), TRAKT_ACCESS_TOKEN_ENV, None) {
        Some(token) => trakt = trakt.with_access_token(token),
        None => {
            let credentials_file = paths.credentials_file();
            let mut store = CredentialStore::new(credentials_file.clone());
            store
                .load()
                .map_err(|e| eyre!("Failed to load credentials from {}: {}", credentials_file.display(), e))?;
            trakt
                .authenticate_from_store(&mut store)
                .await
                .map_err(|e| eyre!("{}", e))?;
        }
    }

    let report = transmit_batches(&trakt, &plan, millis(config.pacing.batch_delay_ms)).await;

    if output.is_human() {
        for batch in &report.batches {
            let status = batch.status.map_or_else(|| "error".to_string(), |s| s.to_string());
            let line = format!(
                "[{}/{} #{}] -> {} {}",
                mode.endpoint(),
                batch.bucket.label(),
                batch.index,
                status,
                batch.body_excerpt
            );
            if batch.ok {
                output.info(line);
            } else {
                output.error(line);
            }
        }
    } else {
        output.json(&json!({
            "success": report.is_success(),
            "mode": mode.to_string(),
            "entries_sent": report.entries_sent(),
            "excluded": plan.excluded.len(),
            "report": &report,
        }));
    }

    if !report.is_success() {
        return Err(eyre!(
            "{} of {} batches failed; entries in earlier batches were already sent",
            report.failed(),
            report.batches.len()
        ));
    }

    let whole = plan.entries(SyncBucket::ShowWhole).len();
    output.success(format!(
        "Sent {} entries to Trakt {} ({} whole-show)",
        report.entries_sent(),
        mode.endpoint(),
        whole
    ));
    Ok(())
}
