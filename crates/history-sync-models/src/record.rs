use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use crate::media::MediaKind;
use crate::subject::SubjectId;

/// A row as scraped or loaded from the source catalog, before any resolution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawRecord {
    pub title: String,
    /// Calendar day shown on the collection page
    pub page_date: Option<NaiveDate>,
    pub source_link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind_hint: Option<MediaKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season_hint: Option<u32>,
}

impl RawRecord {
    pub fn new(title: impl Into<String>, page_date: Option<NaiveDate>, source_link: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            page_date,
            source_link: source_link.into(),
            kind_hint: None,
            season_hint: None,
        }
    }

    pub fn subject_id(&self) -> Option<SubjectId> {
        SubjectId::from_link(&self.source_link)
    }

    /// Year of the page date, used to disambiguate catalog search results.
    pub fn year_hint(&self) -> Option<i32> {
        self.page_date.map(|d| d.year())
    }
}

/// Which tier produced a resolved watch time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TimeSource {
    InterestFeed,
    PageDate,
    DeepFetch,
    /// Read back from a previously exported file
    Imported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TimePrecision {
    /// Only the calendar day is known; the clock time is the synthetic midday
    Day,
    Second,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct WatchTime {
    pub instant: DateTime<Utc>,
    pub source: TimeSource,
}

impl WatchTime {
    pub fn new(instant: DateTime<Utc>, source: TimeSource) -> Self {
        Self { instant, source }
    }

    pub fn precision(&self) -> TimePrecision {
        match self.source {
            TimeSource::PageDate => TimePrecision::Day,
            TimeSource::InterestFeed | TimeSource::DeepFetch | TimeSource::Imported => {
                TimePrecision::Second
            }
        }
    }

    pub fn is_day_granularity(&self) -> bool {
        self.precision() == TimePrecision::Day
    }
}

/// A record after classification and time resolution.
///
/// `season` is only ever set when `kind` is [`MediaKind::Show`]; construct
/// through [`ResolvedRecord::new`] to keep that invariant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolvedRecord {
    pub title: String,
    pub page_date: Option<NaiveDate>,
    pub source_link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<SubjectId>,
    pub kind: MediaKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watched_at: Option<WatchTime>,
}

impl ResolvedRecord {
    pub fn new(
        raw: &RawRecord,
        kind: MediaKind,
        season: Option<u32>,
        watched_at: Option<WatchTime>,
    ) -> Self {
        let season = match kind {
            MediaKind::Show => season.filter(|n| *n > 0),
            MediaKind::Movie => None,
        };
        Self {
            title: raw.title.clone(),
            page_date: raw.page_date,
            source_link: raw.source_link.clone(),
            subject_id: raw.subject_id(),
            kind,
            season,
            watched_at,
        }
    }

    pub fn watched_at_utc(&self) -> Option<DateTime<Utc>> {
        self.watched_at.map(|w| w.instant)
    }

    pub fn year_hint(&self) -> Option<i32> {
        self.page_date.map(|d| d.year())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn raw() -> RawRecord {
        RawRecord::new(
            "示例 第二季",
            NaiveDate::from_ymd_opt(2020, 1, 5),
            "https://movie.douban.com/subject/123/",
        )
    }

    #[test]
    fn test_season_dropped_for_movies() {
        let record = ResolvedRecord::new(&raw(), MediaKind::Movie, Some(2), None);
        assert_eq!(record.season, None);

        let record = ResolvedRecord::new(&raw(), MediaKind::Show, Some(2), None);
        assert_eq!(record.season, Some(2));
        assert_eq!(record.subject_id.unwrap().as_str(), "123");
    }

    #[test]
    fn test_zero_season_is_discarded() {
        let record = ResolvedRecord::new(&raw(), MediaKind::Show, Some(0), None);
        assert_eq!(record.season, None);
    }

    #[test]
    fn test_precision_follows_source() {
        let at = Utc.with_ymd_and_hms(2020, 1, 5, 4, 0, 0).unwrap();
        assert!(WatchTime::new(at, TimeSource::PageDate).is_day_granularity());
        assert!(!WatchTime::new(at, TimeSource::InterestFeed).is_day_granularity());
        assert_eq!(WatchTime::new(at, TimeSource::DeepFetch).precision(), TimePrecision::Second);
    }

    #[test]
    fn test_year_hint() {
        assert_eq!(raw().year_hint(), Some(2020));
        let undated = RawRecord::new("x", None, "");
        assert_eq!(undated.year_hint(), None);
    }
}
