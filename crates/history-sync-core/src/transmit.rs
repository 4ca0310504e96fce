use history_sync_models::{SyncBucket, SyncPayload};
use history_sync_sources::SyncTransport;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

use crate::aggregator::SyncPlan;

/// Response bodies are cut to this many characters in reports.
pub const BODY_EXCERPT_CHARS: usize = 200;

/// Whole-show entries shown in a dry-run preview.
pub const WHOLE_SHOW_PREVIEW_LIMIT: usize = 10;

pub const WHOLE_SHOW_WARNING: &str =
    "Shows without a season number are sent as whole-show history; the tracking service may ignore them";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    pub bucket: SyncBucket,
    /// 1-based position within its bucket
    pub index: usize,
    pub entries: usize,
    /// `None` when the request never got a response
    pub status: Option<u16>,
    pub body_excerpt: String,
    pub ok: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub batches: Vec<BatchOutcome>,
    pub whole_show_warning: bool,
}

impl SyncReport {
    pub fn succeeded(&self) -> usize {
        self.batches.iter().filter(|b| b.ok).count()
    }

    pub fn failed(&self) -> usize {
        self.batches.len() - self.succeeded()
    }

    pub fn entries_sent(&self) -> usize {
        self.batches.iter().filter(|b| b.ok).map(|b| b.entries).sum()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

pub fn excerpt(body: &str) -> String {
    body.chars().take(BODY_EXCERPT_CHARS).collect()
}

/// Post every batch of the plan in bucket order. A failed batch is recorded
/// and the next one is still sent; nothing is retried or rolled back.
pub async fn transmit_batches(transport: &dyn SyncTransport, plan: &SyncPlan, delay: Duration) -> SyncReport {
    let mode = plan.mode;
    let mut report = SyncReport::default();

    if plan.has_whole_show_history() {
        warn!(entries = plan.show_whole.len(), "{}", WHOLE_SHOW_WARNING);
        report.whole_show_warning = true;
    }

    let batches = plan.batches();
    let total = batches.len();
    let mut index_in_bucket = 0;
    let mut previous_bucket = None;

    for (position, batch) in batches.iter().enumerate() {
        if previous_bucket != Some(batch.bucket) {
            index_in_bucket = 0;
            previous_bucket = Some(batch.bucket);
        }
        index_in_bucket += 1;

        let payload = batch.to_payload();
        let route = format!("{}/{}", mode.endpoint(), batch.bucket.label());
        let outcome = match transport.post_sync(mode, &payload).await {
            Ok(response) => {
                let body_excerpt = excerpt(&response.body);
                if response.is_success() {
                    info!("[{}] -> {} {}", route, response.status, body_excerpt);
                } else {
                    warn!("[{}] -> {} {}", route, response.status, body_excerpt);
                }
                BatchOutcome {
                    bucket: batch.bucket,
                    index: index_in_bucket,
                    entries: batch.len(),
                    status: Some(response.status),
                    ok: response.is_success(),
                    body_excerpt,
                }
            }
            Err(e) => {
                warn!("[{}] -> request failed: {}", route, e);
                BatchOutcome {
                    bucket: batch.bucket,
                    index: index_in_bucket,
                    entries: batch.len(),
                    status: e.status(),
                    body_excerpt: excerpt(&e.to_string()),
                    ok: false,
                }
            }
        };
        report.batches.push(outcome);

        if position + 1 < total && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    info!(
        mode = %mode,
        batches = report.batches.len(),
        failed = report.failed(),
        entries = report.entries_sent(),
        "Transmission finished"
    );
    report
}

/// One bucket's would-be request body in a dry run.
#[derive(Debug, Clone, Serialize)]
pub struct PayloadPreview {
    pub bucket: &'static str,
    pub endpoint: &'static str,
    pub total_entries: usize,
    pub payload: SyncPayload,
}

/// Payloads a sync would send, one per non-empty bucket, unbatched. The
/// whole-show bucket is cut to its first few entries.
pub fn preview_payloads(plan: &SyncPlan) -> Vec<PayloadPreview> {
    SyncBucket::ALL
        .iter()
        .filter_map(|bucket| {
            let entries = plan.entries(*bucket);
            if entries.is_empty() {
                return None;
            }
            let shown = match bucket {
                SyncBucket::ShowWhole => &entries[..entries.len().min(WHOLE_SHOW_PREVIEW_LIMIT)],
                _ => entries,
            };
            let payload = match bucket {
                SyncBucket::Movies => SyncPayload::Movies(shown.to_vec()),
                SyncBucket::ShowSeasons | SyncBucket::ShowWhole => SyncPayload::Shows(shown.to_vec()),
            };
            Some(PayloadPreview {
                bucket: bucket.label(),
                endpoint: plan.mode.endpoint(),
                total_entries: entries.len(),
                payload,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::{MatchedRecord, PayloadAggregator};
    use async_trait::async_trait;
    use history_sync_models::{CatalogMatch, MediaKind, RawRecord, ResolvedRecord, SyncMode};
    use history_sync_sources::{SourceError, TransportResponse};
    use std::sync::Mutex;

    /// Answers with queued statuses, then 201.
    struct FakeTransport {
        statuses: Mutex<Vec<u16>>,
        sent: Mutex<Vec<(SyncMode, serde_json::Value)>>,
        fail_transport_at: Option<usize>,
    }

    impl FakeTransport {
        fn new(statuses: Vec<u16>) -> Self {
            Self {
                statuses: Mutex::new(statuses),
                sent: Mutex::new(Vec::new()),
                fail_transport_at: None,
            }
        }
    }

    #[async_trait]
    impl SyncTransport for FakeTransport {
        async fn post_sync(&self, target: SyncMode, payload: &SyncPayload) -> Result<TransportResponse, SourceError> {
            let mut sent = self.sent.lock().unwrap();
            sent.push((target, serde_json::to_value(payload).unwrap()));
            if self.fail_transport_at == Some(sent.len()) {
                return Err(SourceError::NotAuthenticated("trakt"));
            }
            let mut statuses = self.statuses.lock().unwrap();
            let status = if statuses.is_empty() { 201 } else { statuses.remove(0) };
            Ok(TransportResponse {
                status,
                body: "x".repeat(500),
            })
        }
    }

    fn matched(kind: MediaKind, season: Option<u32>, slug: &str) -> MatchedRecord {
        let raw = RawRecord::new(slug, None, "");
        MatchedRecord::new(
            ResolvedRecord::new(&raw, kind, season, None),
            Some(CatalogMatch::new(slug, slug, None)),
        )
    }

    fn plan(mode: SyncMode, movies: usize, whole: usize) -> SyncPlan {
        let mut records: Vec<MatchedRecord> = (0..movies)
            .map(|i| matched(MediaKind::Movie, None, &format!("movie-{i}")))
            .collect();
        records.push(matched(MediaKind::Show, Some(1), "seasoned"));
        records.extend((0..whole).map(|i| matched(MediaKind::Show, None, &format!("show-{i}"))));
        PayloadAggregator::new(mode).with_batch_size(2).aggregate(&records)
    }

    #[tokio::test]
    async fn test_failed_batch_does_not_stop_later_batches() {
        let transport = FakeTransport::new(vec![201, 500]);
        let report = transmit_batches(&transport, &plan(SyncMode::Watched, 5, 1), Duration::ZERO).await;

        // 3 movie batches, 1 season batch, 1 whole-show batch
        assert_eq!(report.batches.len(), 5);
        assert_eq!(report.failed(), 1);
        assert!(!report.is_success());
        assert!(report.whole_show_warning);

        let failed = &report.batches[1];
        assert_eq!(failed.bucket, SyncBucket::Movies);
        assert_eq!(failed.index, 2);
        assert_eq!(failed.status, Some(500));
        assert_eq!(failed.body_excerpt.chars().count(), BODY_EXCERPT_CHARS);

        assert_eq!(report.batches[3].bucket, SyncBucket::ShowSeasons);
        assert_eq!(report.batches[3].index, 1);
        assert_eq!(report.entries_sent(), 5);

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 5);
        assert!(sent[0].1.get("movies").is_some());
        assert!(sent[3].1.get("shows").is_some());
    }

    #[tokio::test]
    async fn test_transport_errors_are_recorded() {
        let mut transport = FakeTransport::new(Vec::new());
        transport.fail_transport_at = Some(1);
        let report = transmit_batches(&transport, &plan(SyncMode::Watchlist, 1, 0), Duration::ZERO).await;

        assert_eq!(report.batches.len(), 2);
        assert!(!report.batches[0].ok);
        assert_eq!(report.batches[0].status, None);
        assert!(report.batches[1].ok);
        assert!(!report.whole_show_warning);

        let sent = transport.sent.lock().unwrap();
        assert!(sent.iter().all(|(mode, _)| *mode == SyncMode::Watchlist));
    }

    #[test]
    fn test_preview_caps_whole_shows() {
        let previews = preview_payloads(&plan(SyncMode::Watched, 3, 15));
        assert_eq!(previews.len(), 3);

        assert_eq!(previews[0].payload.len(), 3);
        assert_eq!(previews[0].endpoint, "history");

        let whole = &previews[2];
        assert_eq!(whole.bucket, SyncBucket::ShowWhole.label());
        assert_eq!(whole.total_entries, 15);
        assert_eq!(whole.payload.len(), WHOLE_SHOW_PREVIEW_LIMIT);
    }
}
