use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use history_sync_config::{CredentialStore, HttpConfig};
use history_sync_models::{CatalogCandidate, MediaKind, SyncMode, SyncPayload};
use reqwest::Client;
use std::sync::Arc;
use tracing::info;

use crate::error::SourceError;
use crate::http::build_client;
use crate::traits::{CatalogSearch, SyncTransport, TransportResponse};
use crate::trakt::{api, auth};

#[derive(Clone)]
pub struct TraktClient {
    client: Arc<Client>,
    base_url: String,
    client_id: String,
    client_secret: String,
    access_token: Option<String>,
}

impl TraktClient {
    pub fn new(client: Client, client_id: impl Into<String>) -> Self {
        Self {
            client: Arc::new(client),
            base_url: api::API_BASE_URL.to_string(),
            client_id: client_id.into(),
            client_secret: String::new(),
            access_token: None,
        }
    }

    pub fn from_config(http: &HttpConfig, client_id: impl Into<String>) -> Result<Self, SourceError> {
        Ok(Self::new(build_client(http)?, client_id))
    }

    pub fn with_client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = client_secret.into();
        self
    }

    pub fn with_access_token(mut self, access_token: impl Into<String>) -> Self {
        self.access_token = Some(access_token.into());
        self
    }

    pub fn http(&self) -> &Client {
        &self.client
    }

    fn access_token(&self) -> Result<&str, SourceError> {
        self.access_token
            .as_deref()
            .ok_or(SourceError::NotAuthenticated("trakt"))
    }

    /// Load the stored token, refreshing it first when it is about to expire
    /// and a refresh token plus client secret are available.
    pub async fn authenticate_from_store(&mut self, store: &mut CredentialStore) -> Result<()> {
        if store.has_fresh_trakt_token(Utc::now()) {
            if let Some(token) = store.get_trakt_access_token() {
                self.access_token = Some(token.clone());
                info!("Using saved Trakt access token");
                return Ok(());
            }
        }

        let refresh_token = store.get_trakt_refresh_token().cloned();
        match refresh_token {
            Some(refresh_token) if !self.client_secret.is_empty() => {
                info!("Trakt access token expired or expiring soon, refreshing");
                let token_info = auth::refresh_access_token(
                    &self.client,
                    &self.client_id,
                    &self.client_secret,
                    &refresh_token,
                )
                .await?;
                self.access_token = Some(token_info.access_token.clone());
                store.set_trakt_access_token(token_info.access_token);
                store.set_trakt_refresh_token(token_info.refresh_token);
                store.set_trakt_token_expires(token_info.expires_at);
                store.save()?;
                Ok(())
            }
            _ => Err(anyhow::anyhow!(
                "No valid Trakt access token. Run `douban2trakt auth` or pass --trakt-token"
            )),
        }
    }

    pub async fn username(&self) -> Result<String, SourceError> {
        api::get_username(&self.client, &self.base_url, self.access_token()?, &self.client_id).await
    }
}

#[async_trait]
impl CatalogSearch for TraktClient {
    async fn search(
        &self,
        query: &str,
        kind: MediaKind,
    ) -> Result<Vec<CatalogCandidate>, SourceError> {
        api::search(&self.client, &self.base_url, &self.client_id, query, kind).await
    }
}

#[async_trait]
impl SyncTransport for TraktClient {
    async fn post_sync(
        &self,
        target: SyncMode,
        payload: &SyncPayload,
    ) -> Result<TransportResponse, SourceError> {
        let token = self.access_token()?;
        api::post_sync(&self.client, &self.base_url, token, &self.client_id, target, payload).await
    }
}
