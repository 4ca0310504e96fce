use super::prompts;
use super::ui::is_interactive;
use crate::output::Output;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use history_sync_config::{Config, CredentialStore, PathManager};
use owo_colors::OwoColorize;
use serde_json::json;

pub fn run_config(cmd: crate::ConfigCommands, output: &Output) -> Result<()> {
    match cmd {
        crate::ConfigCommands::Show { full } => show_config(full, output),
        crate::ConfigCommands::Init { force } => init_config(force, output),
    }
}

fn show_config(full: bool, output: &Output) -> Result<()> {
    let paths = PathManager::default();
    let config_file = paths.config_file();

    if !config_file.exists() {
        output.warn(format!("Configuration file not found at: {}", config_file.display()));
        output.info("Run 'douban2trakt config init' or 'douban2trakt auth' to create it. Defaults are used until then.");
    }

    let config = Config::load_or_default(&config_file)
        .wrap_err_with(|| format!("Failed to load config from {}", config_file.display()))?;

    let mut store = CredentialStore::new(paths.credentials_file());
    // Unreadable credentials only hide the token status
    let has_token = store.load().is_ok() && store.get_trakt_access_token().is_some();
    let token_expires = store.get_trakt_token_expires();

    let secret = |s: &str| if full { s.to_string() } else { mask_string(s) };

    if output.is_human() {
        if output.is_quiet() {
            return Ok(());
        }
        println!("\n{}", "Configuration".bright_cyan().bold());
        output.summary("Files", &[("Config", config_file.display().to_string())]);
        output.summary(
            "Douban",
            &[
                ("User ID", or_not_set(&config.douban.user_id)),
                ("Statuses", config.douban.statuses.join(", ")),
                ("Page size", config.douban.page_size.to_string()),
                ("Max empty pages", config.douban.max_empty_pages.to_string()),
                ("Deep refine", config.refine.deep_refine.to_string()),
                (
                    "Deep refine window",
                    config
                        .refine
                        .window_days
                        .map_or_else(|| "unlimited".to_string(), |d| format!("{} days", d)),
                ),
            ],
        );
        output.summary(
            "Trakt",
            &[
                ("Client ID", secret(&config.trakt.client_id)),
                ("Client Secret", secret(&config.trakt.client_secret)),
                (
                    "Access token",
                    match (has_token, token_expires) {
                        (true, Some(at)) => format!("stored, expires {}", at.to_rfc3339()),
                        (true, None) => "stored".to_string(),
                        (false, _) => "<not set>".to_string(),
                    },
                ),
            ],
        );
        output.summary(
            "Sync",
            &[
                ("Mode", config.sync.mode.to_string()),
                ("Batch size", config.sync.batch_size.to_string()),
                ("Request delay", format!("{} ms", config.pacing.request_delay_ms)),
                ("Batch delay", format!("{} ms", config.pacing.batch_delay_ms)),
                ("Feed page delay", format!("{} ms", config.pacing.feed_page_delay_ms)),
                ("HTTP timeout", format!("{} s", config.http.timeout_secs)),
            ],
        );
    } else {
        let mut value = serde_json::to_value(&config)?;
        if let Some(trakt) = value.get_mut("trakt").and_then(|t| t.as_object_mut()) {
            trakt.insert("client_id".to_string(), json!(secret(&config.trakt.client_id)));
            trakt.insert("client_secret".to_string(), json!(secret(&config.trakt.client_secret)));
        }
        output.json(&json!({
            "config_file": config_file.display().to_string(),
            "config": value,
            "trakt_token_stored": has_token,
        }));
    }

    Ok(())
}

fn init_config(force: bool, output: &Output) -> Result<()> {
    let paths = PathManager::default();
    paths
        .ensure_directories()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to create configuration directories: {}", e))?;
    let config_file = paths.config_file();

    if config_file.exists() && !force {
        let overwrite = is_interactive()
            && prompts::prompt_yes_no(
                &format!("{} already exists. Overwrite with defaults?", config_file.display()),
                false,
            )?;
        if !overwrite {
            output.warn(format!(
                "Keeping existing configuration at {} (use --force to overwrite)",
                config_file.display()
            ));
            return Ok(());
        }
    }

    Config::default()
        .save_to_file(&config_file)
        .wrap_err_with(|| format!("Failed to save config to {}", config_file.display()))?;
    output.success(format!("Wrote default configuration to {}", config_file.display()));
    output.info("Set [douban].user_id, then run 'douban2trakt auth' to connect Trakt.");
    Ok(())
}

fn or_not_set(s: &str) -> String {
    if s.trim().is_empty() {
        "<not set>".to_string()
    } else {
        s.to_string()
    }
}

fn mask_string(s: &str) -> String {
    if s.is_empty() || s == "YOUR_CLIENT_ID" || s == "YOUR_CLIENT_SECRET" {
        return "<not set>".to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{}***{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_string() {
        assert_eq!(mask_string(""), "<not set>");
        assert_eq!(mask_string("abcd"), "****");
        assert_eq!(mask_string("abcdef123456"), "ab***56");
    }
}
