pub mod auth;
pub mod config;
pub mod export;
pub mod prompts;
pub mod refine;
pub mod run;
pub mod sync;
pub mod ui;

use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use history_sync_config::{resolve_credential, Config, PathManager, TRAKT_CLIENT_ID_ENV};
use history_sync_core::{collect_interest_map, FeedOptions};
use history_sync_models::InterestMap;
use history_sync_sources::DoubanClient;
use std::time::Duration;

use crate::output::Output;

/// Load `config.toml` (defaults when missing) and check it.
pub fn load_config(paths: &PathManager) -> Result<Config> {
    let config_file = paths.config_file();
    let config = Config::load_or_default(&config_file)
        .wrap_err_with(|| format!("Failed to load config from {}", config_file.display()))?;
    config
        .validate()
        .wrap_err_with(|| format!("Invalid configuration in {}", config_file.display()))?;
    Ok(config)
}

/// Client id from the flag, then `TRAKT_CLIENT_ID`, then the config file.
pub fn trakt_client_id(cli: Option<&str>, config: &Config) -> Result<String> {
    let stored = Some(config.trakt.client_id.as_str()).filter(|_| config.is_trakt_configured());
    resolve_credential(cli, TRAKT_CLIENT_ID_ENV, stored).ok_or_else(|| {
        eyre!(
            "No Trakt client id. Pass --trakt-client-id, set {} or run `douban2trakt auth`",
            TRAKT_CLIENT_ID_ENV
        )
    })
}

pub fn millis(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

/// Pull the interest feed for the configured account, or an empty map when
/// no account is set.
pub async fn load_interest_map(douban: &DoubanClient, config: &Config, output: &Output) -> InterestMap {
    if douban.user_id().trim().is_empty() {
        output.warn("No Douban user id configured; watch times will come from page dates only");
        return InterestMap::default();
    }

    let options = FeedOptions::from_config(&config.douban, millis(config.pacing.feed_page_delay_ms));
    let spinner = ui::Spinner::new(format!(
        "Fetching interest feed for {} ({})",
        douban.user_id(),
        options.statuses.join(", ")
    ));
    let map = collect_interest_map(douban, &options).await;
    spinner.finish(format!(
        "Interest feed: {} subjects, {} entries",
        map.subject_count(),
        map.entry_count()
    ));
    map
}
