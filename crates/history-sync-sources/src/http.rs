use history_sync_config::HttpConfig;
use reqwest::Client;
use std::time::Duration;

use crate::error::SourceError;

/// Build the shared client for one remote service.
pub fn build_client(config: &HttpConfig) -> Result<Client, SourceError> {
    let client = Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Read the response body, falling back to an empty string on decode failure.
pub(crate) async fn body_text(response: reqwest::Response) -> String {
    response.text().await.unwrap_or_default()
}
