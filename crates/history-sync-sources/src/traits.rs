use async_trait::async_trait;
use chrono::NaiveDateTime;
use history_sync_models::{CatalogCandidate, InterestEntry, MediaKind, SubjectId, SyncMode, SyncPayload};

use crate::error::SourceError;

/// What a single-subject lookup could tell us. Either field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectDetail {
    pub kind: Option<MediaKind>,
    /// Source-local time (UTC+8), second precision
    pub created_at: Option<NaiveDateTime>,
}

/// Raw answer of the tracking service to one sync request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Paged access to the account's structured interest feed.
#[async_trait]
pub trait InterestFeed: Send + Sync {
    async fn fetch_interests(
        &self,
        status: &str,
        start: u32,
        count: u32,
    ) -> Result<Vec<InterestEntry>, SourceError>;
}

/// Per-subject lookup used for deep time refinement.
#[async_trait]
pub trait SubjectDetailSource: Send + Sync {
    async fn fetch_subject_detail(
        &self,
        subject: &SubjectId,
    ) -> Result<Option<SubjectDetail>, SourceError>;
}

/// Ranked text search against the tracking service's catalog.
#[async_trait]
pub trait CatalogSearch: Send + Sync {
    async fn search(
        &self,
        query: &str,
        kind: MediaKind,
    ) -> Result<Vec<CatalogCandidate>, SourceError>;
}

/// Sends one batch payload. No retries happen behind this boundary.
#[async_trait]
pub trait SyncTransport: Send + Sync {
    async fn post_sync(
        &self,
        target: SyncMode,
        payload: &SyncPayload,
    ) -> Result<TransportResponse, SourceError>;
}
