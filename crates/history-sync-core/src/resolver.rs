use chrono::{NaiveDate, NaiveDateTime, Utc};
use history_sync_models::{
    InterestEntry, InterestMap, MediaKind, RawRecord, ResolvedRecord, SubjectId, TimeSource, WatchTime,
};
use history_sync_sources::SubjectDetailSource;
use tracing::{debug, warn};

use crate::classifier::{classify_type, extract_season};
use crate::time::{midday_utc, source_to_utc, utc_to_source};

/// Tiers in precedence order. A later tier only runs while the best value so
/// far is less precise than what it could produce.
const TIER_CHAIN: [TimeSource; 3] = [
    TimeSource::InterestFeed,
    TimeSource::PageDate,
    TimeSource::DeepFetch,
];

#[derive(Debug, Clone, Copy, Default)]
pub struct DeepRefineOptions {
    pub enabled: bool,
    /// Skip records whose page date is more than this many days before today
    pub window_days: Option<i64>,
}

/// Outcome of time resolution for one record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub watched_at: Option<WatchTime>,
    /// Kind reported by the deep fetch, then the feed
    pub kind: Option<MediaKind>,
    /// A deep per-subject request was issued
    pub deep_fetched: bool,
}

#[derive(Debug, Default)]
struct TierOutcome {
    time: Option<WatchTime>,
    kind: Option<MediaKind>,
}

/// Reconciles each record's watch time from the interest feed, the page date
/// and, when enabled, a deep per-subject fetch.
pub struct TimeResolver<'a> {
    interests: &'a InterestMap,
    detail: Option<&'a dyn SubjectDetailSource>,
    deep: DeepRefineOptions,
    today: NaiveDate,
}

impl<'a> TimeResolver<'a> {
    pub fn new(interests: &'a InterestMap) -> Self {
        Self {
            interests,
            detail: None,
            deep: DeepRefineOptions::default(),
            today: utc_to_source(Utc::now()).date(),
        }
    }

    pub fn with_deep_refine(mut self, detail: &'a dyn SubjectDetailSource, options: DeepRefineOptions) -> Self {
        self.detail = Some(detail);
        self.deep = options;
        self
    }

    /// Pin "today" for the look-back window.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Classify and time one raw record.
    pub async fn resolve_record(&self, raw: &RawRecord) -> (ResolvedRecord, Resolution) {
        let resolution = self.resolve_time(raw).await;
        let kind = resolution
            .kind
            .or(raw.kind_hint)
            .unwrap_or_else(|| classify_type(&raw.title));
        let season = match kind {
            MediaKind::Show => raw.season_hint.or_else(|| extract_season(&raw.title)),
            MediaKind::Movie => None,
        };
        let record = ResolvedRecord::new(raw, kind, season, resolution.watched_at);
        (record, resolution)
    }

    /// Run the tier chain for one record. Tier failures never surface; the
    /// worst case is no time at all.
    pub async fn resolve_time(&self, raw: &RawRecord) -> Resolution {
        let subject = raw.subject_id();
        let mut resolution = Resolution::default();
        let mut feed_kind = None;
        let mut deep_kind = None;

        for tier in TIER_CHAIN {
            if resolution.watched_at.is_some_and(|w| !w.is_day_granularity()) {
                break;
            }

            let outcome = match tier {
                TimeSource::InterestFeed => self.from_interest_feed(subject.as_ref(), raw.page_date),
                TimeSource::PageDate => TierOutcome {
                    time: raw
                        .page_date
                        .and_then(midday_utc)
                        .map(|at| WatchTime::new(at, TimeSource::PageDate)),
                    kind: None,
                },
                TimeSource::DeepFetch => {
                    let Some(subject) = subject.as_ref().filter(|_| self.deep_allowed(raw.page_date)) else {
                        continue;
                    };
                    resolution.deep_fetched = true;
                    self.from_deep_fetch(subject).await
                }
                TimeSource::Imported => continue,
            };

            match tier {
                TimeSource::InterestFeed => feed_kind = outcome.kind,
                TimeSource::DeepFetch => deep_kind = outcome.kind,
                _ => {}
            }

            if let Some(candidate) = outcome.time {
                let better = resolution
                    .watched_at
                    .map_or(true, |best| candidate.precision() > best.precision());
                if better {
                    resolution.watched_at = Some(candidate);
                }
            }
        }

        resolution.kind = deep_kind.or(feed_kind);
        debug!(
            title = %raw.title,
            source = ?resolution.watched_at.map(|w| w.source),
            deep = resolution.deep_fetched,
            "Resolved watch time"
        );
        resolution
    }

    fn deep_allowed(&self, page_date: Option<NaiveDate>) -> bool {
        if !self.deep.enabled || self.detail.is_none() {
            return false;
        }
        match (self.deep.window_days, page_date) {
            (Some(window), Some(date)) => (self.today - date).num_days() <= window,
            _ => true,
        }
    }

    fn from_interest_feed(&self, subject: Option<&SubjectId>, page_date: Option<NaiveDate>) -> TierOutcome {
        let Some(subject) = subject else {
            return TierOutcome::default();
        };
        let time = pick_closest_entry(self.interests.entries_for(subject), page_date)
            .map(|entry| WatchTime::new(source_to_utc(entry.created_at), TimeSource::InterestFeed));
        TierOutcome {
            time,
            kind: self.interests.kind_for(subject),
        }
    }

    async fn from_deep_fetch(&self, subject: &SubjectId) -> TierOutcome {
        let Some(detail_source) = self.detail else {
            return TierOutcome::default();
        };
        match detail_source.fetch_subject_detail(subject).await {
            Ok(Some(detail)) => TierOutcome {
                time: detail
                    .created_at
                    .map(|local| WatchTime::new(source_to_utc(local), TimeSource::DeepFetch)),
                kind: detail.kind,
            },
            Ok(None) => TierOutcome::default(),
            Err(e) => {
                warn!(subject_id = %subject, error = %e, "Deep fetch failed, keeping coarser time");
                TierOutcome::default()
            }
        }
    }
}

/// Entry whose calendar day is closest to the page date, preferring the later
/// clock time on ties. Without a page date the newest entry wins.
pub fn pick_closest_entry(entries: &[InterestEntry], page_date: Option<NaiveDate>) -> Option<&InterestEntry> {
    let Some(page_date) = page_date else {
        return entries.iter().max_by_key(|e| e.created_at);
    };
    let distance = |at: NaiveDateTime| (at.date() - page_date).num_days().abs();
    entries
        .iter()
        .min_by(|a, b| {
            distance(a.created_at)
                .cmp(&distance(b.created_at))
                .then_with(|| b.created_at.cmp(&a.created_at))
        })
}
