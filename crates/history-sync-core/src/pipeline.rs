use history_sync_models::{RawRecord, TimeSource};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::aggregator::MatchedRecord;
use crate::classifier::normalize_for_search;
use crate::matcher::CatalogMatcher;
use crate::progress::ProgressSink;
use crate::resolver::TimeResolver;

/// Counts gathered over one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub total: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub feed_timed: usize,
    pub page_timed: usize,
    pub deep_timed: usize,
    pub untimed: usize,
    pub deep_fetches: usize,
    pub searches: usize,
}

impl PipelineStats {
    fn record(&mut self, record: &MatchedRecord) {
        self.total += 1;
        if record.is_matched() {
            self.matched += 1;
        } else {
            self.unmatched += 1;
        }
        match record.resolved.watched_at.map(|w| w.source) {
            Some(TimeSource::InterestFeed) => self.feed_timed += 1,
            Some(TimeSource::PageDate) => self.page_timed += 1,
            Some(TimeSource::DeepFetch) => self.deep_timed += 1,
            // Records read back from an export never come through here
            Some(TimeSource::Imported) => {}
            None => self.untimed += 1,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PipelineOutput {
    /// One entry per input row, in input order
    pub records: Vec<MatchedRecord>,
    pub stats: PipelineStats,
}

/// Resolve then match every row, one at a time.
pub struct MigrationPipeline<'a> {
    resolver: TimeResolver<'a>,
    matcher: CatalogMatcher<'a>,
    request_delay: Duration,
}

impl<'a> MigrationPipeline<'a> {
    pub fn new(resolver: TimeResolver<'a>, matcher: CatalogMatcher<'a>) -> Self {
        Self {
            resolver,
            matcher,
            request_delay: Duration::ZERO,
        }
    }

    /// Pause after every step that touched the network.
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    pub async fn run(&self, rows: &[RawRecord], progress: &mut dyn ProgressSink) -> PipelineOutput {
        let mut output = PipelineOutput {
            records: Vec::with_capacity(rows.len()),
            stats: PipelineStats::default(),
        };
        progress.start(rows.len());

        for raw in rows {
            let (resolved, resolution) = self.resolver.resolve_record(raw).await;
            if resolution.deep_fetched {
                output.stats.deep_fetches += 1;
                self.pause().await;
            }

            let normalized = normalize_for_search(&resolved.title);
            let attempt = self
                .matcher
                .match_title(&normalized, &resolved.title, resolved.year_hint(), resolved.kind)
                .await;
            if attempt.queries > 0 {
                output.stats.searches += attempt.queries;
                self.pause().await;
            }

            debug!(
                title = %resolved.title,
                kind = %resolved.kind,
                season = ?resolved.season,
                slug = ?attempt.catalog_match.as_ref().map(|m| m.slug.as_str()),
                "Processed record"
            );

            let record = MatchedRecord::new(resolved, attempt.catalog_match);
            output.stats.record(&record);
            progress.advance(&record.resolved.title);
            output.records.push(record);
        }

        progress.finish();
        let stats = &output.stats;
        info!(
            total = stats.total,
            matched = stats.matched,
            unmatched = stats.unmatched,
            feed_timed = stats.feed_timed,
            page_timed = stats.page_timed,
            deep_timed = stats.deep_timed,
            "Pipeline finished"
        );
        output
    }

    async fn pause(&self) {
        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }
    }
}
