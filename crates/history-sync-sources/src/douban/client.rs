use async_trait::async_trait;
use history_sync_config::HttpConfig;
use history_sync_models::{InterestEntry, SubjectId};
use reqwest::Client;
use std::sync::Arc;
use tracing::debug;

use crate::douban::api;
use crate::error::SourceError;
use crate::http::build_client;
use crate::traits::{InterestFeed, SubjectDetail, SubjectDetailSource};

/// Mobile JSON endpoints of the source catalog for one account.
#[derive(Clone)]
pub struct DoubanClient {
    client: Arc<Client>,
    user_id: String,
    base_url: String,
}

impl DoubanClient {
    pub fn new(client: Client, user_id: impl Into<String>) -> Self {
        Self {
            client: Arc::new(client),
            user_id: user_id.into(),
            base_url: api::REXXAR_BASE_URL.to_string(),
        }
    }

    pub fn from_config(http: &HttpConfig, user_id: impl Into<String>) -> Result<Self, SourceError> {
        Ok(Self::new(build_client(http)?, user_id))
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    fn has_user(&self) -> bool {
        !self.user_id.trim().is_empty()
    }
}

#[async_trait]
impl InterestFeed for DoubanClient {
    async fn fetch_interests(
        &self,
        status: &str,
        start: u32,
        count: u32,
    ) -> Result<Vec<InterestEntry>, SourceError> {
        if !self.has_user() {
            return Ok(Vec::new());
        }
        api::get_interests(&self.client, &self.base_url, &self.user_id, status, start, count).await
    }
}

#[async_trait]
impl SubjectDetailSource for DoubanClient {
    /// Try the single-interest endpoint first, then the mobile subject page.
    /// A kind learned from the subject page is kept even when no time is found.
    async fn fetch_subject_detail(
        &self,
        subject: &SubjectId,
    ) -> Result<Option<SubjectDetail>, SourceError> {
        if self.has_user() {
            match api::get_user_interest(&self.client, &self.base_url, &self.user_id, subject).await {
                Ok(Some(detail)) => {
                    debug!(subject_id = %subject, "Deep fetch hit on single interest endpoint");
                    return Ok(Some(detail));
                }
                Ok(None) => {}
                Err(e) => {
                    debug!(subject_id = %subject, error = %e, "Single interest endpoint failed, trying subject page");
                }
            }
        }

        api::get_mobile_subject(&self.client, &self.base_url, subject).await
    }
}
