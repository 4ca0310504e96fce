use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::trakt::api::API_BASE_URL;

#[derive(Debug, Serialize, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: u64,
}

#[derive(Debug)]
pub struct TokenInfo {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl From<TokenResponse> for TokenInfo {
    fn from(token: TokenResponse) -> Self {
        // Two minute margin before the real expiry
        let expires_at = Utc::now() + Duration::seconds(token.expires_in as i64 - 120);
        Self {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at,
        }
    }
}

/// Answer of `POST /oauth/device/code`.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceCode {
    pub device_code: String,
    pub user_code: String,
    pub verification_url: String,
    pub expires_in: u64,
    pub interval: u64,
}

/// How one poll of `/oauth/device/token` should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    Approved,
    Pending,
    SlowDown,
    Invalid,
    AlreadyUsed,
    Expired,
    Denied,
    Unexpected(u16),
}

impl PollStatus {
    pub fn from_status(status: u16) -> Self {
        match status {
            200 => Self::Approved,
            400 => Self::Pending,
            404 => Self::Invalid,
            409 => Self::AlreadyUsed,
            410 => Self::Expired,
            418 => Self::Denied,
            429 => Self::SlowDown,
            other => Self::Unexpected(other),
        }
    }

    /// Terminal statuses end the polling loop without a token.
    pub fn stop_reason(&self) -> Option<&'static str> {
        match self {
            Self::Invalid => Some("device code is invalid"),
            Self::AlreadyUsed => Some("device code was already used"),
            Self::Expired => Some("device code expired"),
            Self::Denied => Some("authorization was denied"),
            _ => None,
        }
    }
}

pub async fn request_device_code(client: &Client, client_id: &str) -> Result<DeviceCode> {
    let payload = serde_json::json!({ "client_id": client_id });

    let response = client
        .post(format!("{}/oauth/device/code", API_BASE_URL))
        .json(&payload)
        .header("Accept", "application/json")
        .header("Content-Type", "application/json")
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        return Err(anyhow!("Failed to request device code: {} - {}", status, error_text));
    }

    Ok(response.json().await?)
}

/// Poll until the user approves the device code, a terminal status arrives,
/// or the code expires.
pub async fn poll_for_token(
    client: &Client,
    client_id: &str,
    client_secret: &str,
    code: &DeviceCode,
) -> Result<TokenInfo> {
    let payload = serde_json::json!({
        "code": code.device_code,
        "client_id": client_id,
        "client_secret": client_secret,
    });

    let interval = std::time::Duration::from_secs(code.interval.max(1));
    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(code.expires_in);

    while std::time::Instant::now() < deadline {
        let response = client
            .post(format!("{}/oauth/device/token", API_BASE_URL))
            .json(&payload)
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .send()
            .await;

        match response {
            Ok(response) => {
                let poll = PollStatus::from_status(response.status().as_u16());
                match poll {
                    PollStatus::Approved => {
                        let token: TokenResponse = response.json().await?;
                        info!("Device code approved");
                        return Ok(token.into());
                    }
                    PollStatus::Pending => debug!("Authorization pending"),
                    PollStatus::SlowDown => {
                        warn!("Polling too fast, backing off");
                        tokio::time::sleep(interval + std::time::Duration::from_secs(5)).await;
                    }
                    PollStatus::Unexpected(status) => warn!("Unexpected device token status: HTTP {}", status),
                    terminal => {
                        let reason = terminal.stop_reason().unwrap_or("authorization failed");
                        return Err(anyhow!("Trakt authorization stopped: {}", reason));
                    }
                }
            }
            Err(e) => warn!("Device token request failed: {}", e),
        }

        tokio::time::sleep(interval).await;
    }

    Err(anyhow!("Trakt authorization timed out before the code was approved"))
}

pub async fn refresh_access_token(
    client: &Client,
    client_id: &str,
    client_secret: &str,
    refresh_token: &str,
) -> Result<TokenInfo> {
    let payload = serde_json::json!({
        "refresh_token": refresh_token,
        "client_id": client_id,
        "client_secret": client_secret,
        "redirect_uri": "urn:ietf:wg:oauth:2.0:oob",
        "grant_type": "refresh_token"
    });

    let response = client
        .post(format!("{}/oauth/token", API_BASE_URL))
        .json(&payload)
        .header("Accept", "application/json")
        .header("Content-Type", "application/json")
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(anyhow!("Token refresh failed: {}", response.status()));
    }

    let token: TokenResponse = response.json().await?;
    Ok(token.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_status_mapping() {
        assert_eq!(PollStatus::from_status(200), PollStatus::Approved);
        assert_eq!(PollStatus::from_status(400), PollStatus::Pending);
        assert_eq!(PollStatus::from_status(429), PollStatus::SlowDown);
        assert_eq!(PollStatus::from_status(500), PollStatus::Unexpected(500));

        for status in [404, 409, 410, 418] {
            assert!(PollStatus::from_status(status).stop_reason().is_some(), "{status}");
        }
        assert!(PollStatus::Pending.stop_reason().is_none());
        assert!(PollStatus::SlowDown.stop_reason().is_none());
    }

    #[test]
    fn test_token_expiry_margin() {
        let before = Utc::now();
        let info: TokenInfo = TokenResponse {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            expires_in: 7_776_000,
        }
        .into();
        let expected = before + Duration::seconds(7_776_000 - 120);
        assert!((info.expires_at - expected).num_seconds().abs() < 5);
    }

    #[test]
    fn test_device_code_deserialize() {
        let code: DeviceCode = serde_json::from_str(
            r#"{"device_code": "d", "user_code": "ABCD1234", "verification_url": "https://trakt.tv/activate", "expires_in": 600, "interval": 5}"#,
        )
        .unwrap();
        assert_eq!(code.user_code, "ABCD1234");
        assert_eq!(code.interval, 5);
    }
}
