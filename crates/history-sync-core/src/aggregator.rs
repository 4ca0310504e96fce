use history_sync_models::{
    CatalogMatch, ExcludedRecord, MediaKind, MovieEntry, ResolvedRecord, SeasonEntry, ShowSeasonGroup,
    ShowWholeEntry, SlugIds, SyncBatch, SyncBucket, SyncEntry, SyncMode,
};
use std::collections::HashMap;
use tracing::{debug, info};

pub const DEFAULT_BATCH_SIZE: usize = 80;

/// A resolved record together with its catalog match, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedRecord {
    pub resolved: ResolvedRecord,
    pub catalog_match: Option<CatalogMatch>,
}

impl MatchedRecord {
    pub fn new(resolved: ResolvedRecord, catalog_match: Option<CatalogMatch>) -> Self {
        Self {
            resolved,
            catalog_match,
        }
    }

    pub fn is_matched(&self) -> bool {
        self.catalog_match.is_some()
    }
}

/// Entries per bucket plus the records that never made it into one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncPlan {
    pub mode: SyncMode,
    pub movies: Vec<SyncEntry>,
    pub show_seasons: Vec<SyncEntry>,
    pub show_whole: Vec<SyncEntry>,
    pub excluded: Vec<ExcludedRecord>,
    batch_size: usize,
}

impl SyncPlan {
    pub fn entries(&self, bucket: SyncBucket) -> &[SyncEntry] {
        match bucket {
            SyncBucket::Movies => &self.movies,
            SyncBucket::ShowSeasons => &self.show_seasons,
            SyncBucket::ShowWhole => &self.show_whole,
        }
    }

    pub fn total_entries(&self) -> usize {
        self.movies.len() + self.show_seasons.len() + self.show_whole.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_entries() == 0
    }

    /// Whole-show history writes are likely ignored by the tracking service.
    pub fn has_whole_show_history(&self) -> bool {
        self.mode == SyncMode::Watched && !self.show_whole.is_empty()
    }

    /// Batches of at most `batch_size` entries, movies first, then shows with
    /// seasons, then whole shows. Order inside each bucket is preserved.
    pub fn batches(&self) -> Vec<SyncBatch> {
        let size = self.batch_size.max(1);
        SyncBucket::ALL
            .iter()
            .flat_map(|bucket| {
                self.entries(*bucket).chunks(size).map(move |chunk| SyncBatch {
                    bucket: *bucket,
                    entries: chunk.to_vec(),
                })
            })
            .collect()
    }
}

/// Groups matched records into wire-ready entries.
#[derive(Debug, Clone, Copy)]
pub struct PayloadAggregator {
    mode: SyncMode,
    batch_size: usize,
}

impl PayloadAggregator {
    pub fn new(mode: SyncMode) -> Self {
        Self {
            mode,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn aggregate(&self, records: &[MatchedRecord]) -> SyncPlan {
        let include_time = self.mode.includes_timestamps();
        let mut plan = SyncPlan {
            mode: self.mode,
            batch_size: self.batch_size,
            ..SyncPlan::default()
        };

        // slug -> index into `groups`, so groups keep first-seen order
        let mut group_index: HashMap<String, usize> = HashMap::new();
        let mut groups: Vec<(String, Vec<SeasonEntry>)> = Vec::new();

        for record in records {
            let resolved = &record.resolved;
            let Some(found) = &record.catalog_match else {
                debug!(title = %resolved.title, "Dropping record without catalog match");
                plan.excluded.push(ExcludedRecord {
                    title: resolved.title.clone(),
                    subject_id: resolved.subject_id.as_ref().map(|s| s.to_string()),
                    kind: resolved.kind,
                    page_date: resolved.page_date,
                    reason: "no catalog match".to_string(),
                });
                continue;
            };

            let watched_at = resolved.watched_at_utc().filter(|_| include_time);
            let ids = SlugIds {
                slug: found.slug.clone(),
            };

            match (resolved.kind, resolved.season) {
                (MediaKind::Movie, _) => {
                    plan.movies.push(SyncEntry::Movie(MovieEntry { ids, watched_at }));
                }
                (MediaKind::Show, Some(number)) => {
                    let idx = *group_index.entry(ids.slug.clone()).or_insert_with(|| {
                        groups.push((ids.slug.clone(), Vec::new()));
                        groups.len() - 1
                    });
                    let seasons = &mut groups[idx].1;
                    if seasons.iter().any(|s| s.number == number) {
                        debug!(slug = %ids.slug, season = number, "Keeping first timestamp for season");
                    } else {
                        seasons.push(SeasonEntry { number, watched_at });
                    }
                }
                (MediaKind::Show, None) => {
                    plan.show_whole.push(SyncEntry::ShowWhole(ShowWholeEntry { ids, watched_at }));
                }
            }
        }

        plan.show_seasons = groups
            .into_iter()
            .map(|(slug, mut seasons)| {
                seasons.sort_by_key(|s| s.number);
                SyncEntry::ShowSeasons(ShowSeasonGroup {
                    ids: SlugIds { slug },
                    seasons,
                })
            })
            .collect();

        info!(
            mode = %self.mode,
            movies = plan.movies.len(),
            show_seasons = plan.show_seasons.len(),
            show_whole = plan.show_whole.len(),
            excluded = plan.excluded.len(),
            "Aggregated sync entries"
        );
        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use history_sync_models::{RawRecord, TimeSource, WatchTime};
    use serde_json::json;

    fn instant(s: &str) -> WatchTime {
        let at = chrono::DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&chrono::Utc);
        WatchTime::new(at, TimeSource::InterestFeed)
    }

    fn record(
        title: &str,
        kind: MediaKind,
        season: Option<u32>,
        watched_at: Option<&str>,
        slug: Option<&str>,
    ) -> MatchedRecord {
        let raw = RawRecord::new(
            title,
            NaiveDate::from_ymd_opt(2020, 1, 5),
            "https://movie.douban.com/subject/1/",
        );
        let resolved = ResolvedRecord::new(&raw, kind, season, watched_at.map(instant));
        MatchedRecord::new(resolved, slug.map(|s| CatalogMatch::new(s, title, Some(2020))))
    }

    fn seasons_of(entry: &SyncEntry) -> Vec<(u32, Option<String>)> {
        match entry {
            SyncEntry::ShowSeasons(group) => group
                .seasons
                .iter()
                .map(|s| (s.number, s.watched_at.map(|w| w.to_rfc3339())))
                .collect(),
            other => panic!("not a season group: {other:?}"),
        }
    }

    #[test]
    fn test_buckets_and_exclusions() {
        let records = vec![
            record("Heat", MediaKind::Movie, None, Some("2020-01-05T13:00:00+00:00"), Some("heat-1995")),
            record("Unknown", MediaKind::Movie, None, None, None),
            record("Fargo S2", MediaKind::Show, Some(2), None, Some("fargo")),
            record("Some Show", MediaKind::Show, None, None, Some("some-show")),
        ];

        let plan = PayloadAggregator::new(SyncMode::Watched).aggregate(&records);
        assert_eq!(plan.movies.len(), 1);
        assert_eq!(plan.show_seasons.len(), 1);
        assert_eq!(plan.show_whole.len(), 1);
        assert_eq!(plan.excluded.len(), 1);
        assert_eq!(plan.excluded[0].title, "Unknown");
        assert_eq!(plan.excluded[0].subject_id.as_deref(), Some("1"));
        assert!(plan.has_whole_show_history());
    }

    #[test]
    fn test_first_seen_season_wins() {
        let records = vec![
            record("示例 第二季", MediaKind::Show, Some(2), Some("2020-01-05T13:00:00+00:00"), Some("example")),
            record("示例 第二季", MediaKind::Show, Some(2), Some("2021-03-01T10:00:00+00:00"), Some("example")),
            record("示例 第一季", MediaKind::Show, Some(1), Some("2019-06-01T10:00:00+00:00"), Some("example")),
        ];

        let plan = PayloadAggregator::new(SyncMode::Watched).aggregate(&records);
        assert_eq!(plan.show_seasons.len(), 1);
        assert_eq!(
            seasons_of(&plan.show_seasons[0]),
            vec![
                (1, Some("2019-06-01T10:00:00+00:00".to_string())),
                (2, Some("2020-01-05T13:00:00+00:00".to_string())),
            ]
        );
    }

    #[test]
    fn test_season_lists_are_stable_across_reordering() {
        let mut records = vec![
            record("S1", MediaKind::Show, Some(1), Some("2019-01-01T00:00:00+00:00"), Some("x")),
            record("S3", MediaKind::Show, Some(3), Some("2021-01-01T00:00:00+00:00"), Some("x")),
            record("S2", MediaKind::Show, Some(2), Some("2020-01-01T00:00:00+00:00"), Some("x")),
        ];
        let aggregator = PayloadAggregator::new(SyncMode::Watched);
        let first = aggregator.aggregate(&records);
        records.reverse();
        let second = aggregator.aggregate(&records);
        assert_eq!(first.show_seasons, second.show_seasons);
        assert_eq!(aggregator.aggregate(&records), second);
    }

    #[test]
    fn test_watchlist_never_has_watched_at() {
        let records = vec![
            record("Heat", MediaKind::Movie, None, Some("2020-01-05T13:00:00+00:00"), Some("heat-1995")),
            record("Fargo S2", MediaKind::Show, Some(2), Some("2020-01-05T13:00:00+00:00"), Some("fargo")),
            record("Show", MediaKind::Show, None, Some("2020-01-05T13:00:00+00:00"), Some("show")),
        ];

        let plan = PayloadAggregator::new(SyncMode::Watchlist).aggregate(&records);
        for batch in plan.batches() {
            for entry in &batch.entries {
                assert!(!entry.has_watched_at(), "{entry:?}");
                let value = serde_json::to_value(entry).unwrap();
                assert!(!value.to_string().contains("watched_at"));
            }
        }
        assert!(!plan.has_whole_show_history());
    }

    #[test]
    fn test_watched_at_only_when_known() {
        let records = vec![
            record("Known", MediaKind::Movie, None, Some("2020-01-05T13:00:00+00:00"), Some("known")),
            record("Unknown", MediaKind::Movie, None, None, Some("unknown")),
        ];
        let plan = PayloadAggregator::new(SyncMode::Watched).aggregate(&records);
        let batch = &plan.batches()[0];
        assert_eq!(
            serde_json::to_value(batch.to_payload()).unwrap(),
            json!({"movies": [
                {"ids": {"slug": "known"}, "watched_at": "2020-01-05T13:00:00+00:00"},
                {"ids": {"slug": "unknown"}}
            ]})
        );
    }

    #[test]
    fn test_batching_preserves_order() {
        for n in [0usize, 1, 79, 80, 81, 200] {
            let records: Vec<MatchedRecord> = (0..n)
                .map(|i| {
                    let slug = format!("movie-{i}");
                    record("M", MediaKind::Movie, None, None, Some(slug.as_str()))
                })
                .collect();
            let plan = PayloadAggregator::new(SyncMode::Watched).aggregate(&records);
            let batches = plan.batches();

            assert_eq!(batches.len(), n.div_ceil(80), "n = {n}");
            assert!(batches.iter().all(|b| b.len() <= 80 && !b.is_empty()));
            let flattened: Vec<&str> = batches
                .iter()
                .flat_map(|b| b.entries.iter().map(|e| e.slug()))
                .collect();
            let expected: Vec<String> = (0..n).map(|i| format!("movie-{i}")).collect();
            assert_eq!(flattened, expected.iter().map(String::as_str).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_bucket_order_and_custom_batch_size() {
        let records = vec![
            record("Whole", MediaKind::Show, None, None, Some("whole")),
            record("S", MediaKind::Show, Some(1), None, Some("seasoned")),
            record("M1", MediaKind::Movie, None, None, Some("m1")),
            record("M2", MediaKind::Movie, None, None, Some("m2")),
            record("M3", MediaKind::Movie, None, None, Some("m3")),
        ];
        let plan = PayloadAggregator::new(SyncMode::Watched)
            .with_batch_size(2)
            .aggregate(&records);
        let buckets: Vec<SyncBucket> = plan.batches().iter().map(|b| b.bucket).collect();
        assert_eq!(
            buckets,
            vec![
                SyncBucket::Movies,
                SyncBucket::Movies,
                SyncBucket::ShowSeasons,
                SyncBucket::ShowWhole
            ]
        );
    }

    #[test]
    fn test_end_to_end_season_payload_shape() {
        let records = vec![record(
            "示例 第二季",
            MediaKind::Show,
            Some(2),
            Some("2020-01-05T13:00:00+00:00"),
            Some("example"),
        )];
        let plan = PayloadAggregator::new(SyncMode::Watched).aggregate(&records);
        assert_eq!(
            serde_json::to_value(&plan.show_seasons[0]).unwrap(),
            json!({"ids": {"slug": "example"}, "seasons": [{"number": 2, "watched_at": "2020-01-05T13:00:00+00:00"}]})
        );
    }
}
