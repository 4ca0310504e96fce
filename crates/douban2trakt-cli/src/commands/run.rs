use super::export::{run_export, ExportArgs};
use super::sync::{run_sync, SyncArgs};
use super::ui::is_interactive;
use super::{auth, prompts};
use crate::output::Output;
use chrono::{DateTime, NaiveDate, Utc};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use history_sync_config::{resolve_credential, CredentialStore, PathManager, TRAKT_ACCESS_TOKEN_ENV};
use history_sync_models::SyncMode;
use std::path::PathBuf;

pub struct RunArgs {
    pub input: PathBuf,
    pub out: PathBuf,
    pub user_id: Option<String>,
    pub since: Option<NaiveDate>,
    pub deep_refine: bool,
    pub deep_refine_window: Option<i64>,
    pub all_statuses: bool,
    pub mode: Option<SyncMode>,
    pub trakt_client_id: Option<String>,
    pub batch_size: Option<usize>,
    pub dry_run: bool,
    pub yes: bool,
}

/// Authorize when needed, export, then sync the fresh review file.
pub async fn run_workflow(args: RunArgs, output: &Output) -> Result<()> {
    tracing::debug!("Run command started");

    output.summary(
        "Migration",
        &[
            ("Rows", args.input.display().to_string()),
            ("Review file", args.out.display().to_string()),
            (
                "Mode",
                args.mode.map_or_else(|| "from config".to_string(), |m| m.to_string()),
            ),
            ("Dry run", args.dry_run.to_string()),
        ],
    );

    if !args.yes {
        if !is_interactive() {
            return Err(eyre!("Refusing to run unattended without --yes"));
        }
        if !prompts::prompt_yes_no("Continue?", false)? {
            output.warn("Cancelled");
            return Ok(());
        }
    }

    let env_token = resolve_credential(None, TRAKT_ACCESS_TOKEN_ENV, None);
    if !args.dry_run && needs_authorization(env_token.as_deref(), &stored_credentials(), Utc::now()) {
        output.info("No usable Trakt token found, starting authorization");
        auth::run_auth(args.trakt_client_id.clone(), None, output).await?;
    }

    let export = ExportArgs {
        input: args.input,
        out: args.out.clone(),
        user_id: args.user_id,
        since: args.since,
        deep_refine: args.deep_refine,
        deep_refine_window: args.deep_refine_window,
        all_statuses: args.all_statuses,
        trakt_client_id: args.trakt_client_id.clone(),
    };
    run_export(export, output).await?;

    let sync = SyncArgs {
        csv: args.out,
        mode: args.mode,
        trakt_client_id: args.trakt_client_id,
        trakt_token: None,
        batch_size: args.batch_size,
        dry_run: args.dry_run,
    };
    run_sync(sync, output).await?;

    if args.dry_run {
        output.success("All steps finished (dry run, Trakt was not modified)");
    } else {
        output.success("All steps finished");
    }
    Ok(())
}

fn stored_credentials() -> CredentialStore {
    let mut store = CredentialStore::new(PathManager::default().credentials_file());
    // An unreadable store is treated as an empty one
    if let Err(e) = store.load() {
        tracing::warn!(error = %e, "Could not read stored credentials");
    }
    store
}

/// Authorization is skipped when a token comes from the environment or the
/// stored one is still fresh.
fn needs_authorization(env_token: Option<&str>, store: &CredentialStore, now: DateTime<Utc>) -> bool {
    env_token.is_none() && !store.has_fresh_trakt_token(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_authorization_skipped_with_fresh_token() {
        let now = Utc::now();
        let mut store = CredentialStore::new(PathBuf::from("credentials.toml"));
        assert!(needs_authorization(None, &store, now));
        assert!(!needs_authorization(Some("from-env"), &store, now));

        store.set_trakt_access_token("token".to_string());
        store.set_trakt_token_expires(now + Duration::days(30));
        assert!(!needs_authorization(None, &store, now));

        store.set_trakt_token_expires(now - Duration::hours(1));
        assert!(needs_authorization(None, &store, now));
    }
}
