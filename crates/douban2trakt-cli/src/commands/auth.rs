use super::prompts;
use super::ui::Spinner;
use crate::output::Output;
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use history_sync_config::{resolve_credential, Config, CredentialStore, PathManager, TRAKT_CLIENT_ID_ENV};
use history_sync_sources::trakt::auth::{poll_for_token, request_device_code};
use history_sync_sources::TraktClient;
use owo_colors::OwoColorize;

pub async fn run_auth(client_id_arg: Option<String>, client_secret_arg: Option<String>, output: &Output) -> Result<()> {
    let paths = PathManager::default();
    paths
        .ensure_directories()
        .map_err(|e| eyre!("Failed to create configuration directories: {}", e))?;

    let config_file = paths.config_file();
    let mut config = Config::load_or_default(&config_file)
        .wrap_err_with(|| format!("Failed to load config from {}", config_file.display()))?;

    print_section_header("Trakt API Setup", output);
    print_instruction_list(
        &[
            "Login to Trakt and open your API apps page: https://trakt.tv/oauth/applications",
            "Create a new API application named 'douban2trakt'",
            "Use 'urn:ietf:wg:oauth:2.0:oob' as the Redirect URI",
        ],
        output,
    );

    let stored_id = Some(config.trakt.client_id.as_str()).filter(|_| config.is_trakt_configured());
    let client_id = match resolve_credential(client_id_arg.as_deref(), TRAKT_CLIENT_ID_ENV, stored_id) {
        Some(id) => id,
        None => prompts::prompt_required(
            "Trakt Client ID",
            "You can find your Client ID at: https://trakt.tv/oauth/applications",
            output,
        )?,
    };

    let client_secret = match client_secret_arg.filter(|s| !s.trim().is_empty()) {
        Some(secret) => secret,
        None if !config.trakt.client_secret.is_empty() => config.trakt.client_secret.clone(),
        None => prompts::prompt_password("Trakt Client Secret")?,
    };
    if client_secret.trim().is_empty() {
        return Err(eyre!("Client Secret is required"));
    }

    config.trakt.client_id = client_id.clone();
    config.trakt.client_secret = client_secret.clone();
    config
        .save_to_file(&config_file)
        .wrap_err_with(|| format!("Failed to save config to {}", config_file.display()))?;

    let trakt = TraktClient::from_config(&config.http, client_id.clone())
        .wrap_err("Failed to build Trakt HTTP client")?
        .with_client_secret(client_secret.clone());

    let code = request_device_code(trakt.http(), &client_id)
        .await
        .map_err(|e| eyre!("Failed to start Trakt authorization: {}", e))?;

    output.info("");
    output.info(format!(
        "{} Open {} and enter the code {}",
        "→".bright_blue(),
        code.verification_url.bright_white(),
        code.user_code.bold().bright_green()
    ));

    let spinner = Spinner::new("Waiting for approval on trakt.tv...".to_string());
    let token_info = poll_for_token(trakt.http(), &client_id, &client_secret, &code).await;
    let token_info = match token_info {
        Ok(info) => {
            spinner.finish("Authorization approved".to_string());
            info
        }
        Err(e) => {
            spinner.finish("Authorization failed".to_string());
            return Err(eyre!("Trakt authorization failed: {}", e));
        }
    };

    let credentials_file = paths.credentials_file();
    let mut store = CredentialStore::new(credentials_file.clone());
    store
        .load()
        .map_err(|e| eyre!("Failed to load credentials from {}: {}", credentials_file.display(), e))?;
    store.set_trakt_access_token(token_info.access_token.clone());
    store.set_trakt_refresh_token(token_info.refresh_token);
    store.set_trakt_token_expires(token_info.expires_at);
    store
        .save()
        .map_err(|e| eyre!("Failed to save credentials to {}: {}", credentials_file.display(), e))?;

    let trakt = trakt.with_access_token(token_info.access_token);
    match trakt.username().await {
        Ok(username) => output.success(format!("Authorized as {}", username.bright_green())),
        Err(e) => {
            tracing::warn!(error = %e, "Could not read Trakt account settings");
            output.success("Trakt authorization saved");
        }
    }
    output.info(format!(
        "  Access token expires at: {}",
        token_info.expires_at.to_rfc3339().bright_green()
    ));

    Ok(())
}

fn print_section_header(title: &str, output: &Output) {
    output.info("");
    output.info(format!("{}", title.bold().bright_cyan()));
    output.info(format!("{}", "─".repeat(title.chars().count()).bright_cyan()));
}

fn print_instruction_list(items: &[&str], output: &Output) {
    for (idx, item) in items.iter().enumerate() {
        output.info(format!("  {}. {}", idx + 1, item));
    }
}
