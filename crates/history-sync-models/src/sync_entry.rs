use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Where a sync writes: the watch history or the watchlist.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    #[default]
    Watched,
    Watchlist,
}

impl SyncMode {
    /// Watchlist writes never carry `watched_at`.
    pub fn includes_timestamps(&self) -> bool {
        matches!(self, SyncMode::Watched)
    }

    /// Path segment under `/sync/` on the tracking service.
    pub fn endpoint(&self) -> &'static str {
        match self {
            SyncMode::Watched => "history",
            SyncMode::Watchlist => "watchlist",
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncMode::Watched => f.write_str("watched"),
            SyncMode::Watchlist => f.write_str("watchlist"),
        }
    }
}

impl FromStr for SyncMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "watched" | "history" => Ok(SyncMode::Watched),
            "watchlist" => Ok(SyncMode::Watchlist),
            other => Err(format!("Invalid sync mode: '{}'. Use 'watched' or 'watchlist'", other)),
        }
    }
}

/// Serialize timestamps as `2020-01-05T13:00:00+00:00`, the form the
/// tracking service documents, rather than chrono's default `Z` suffix.
fn serialize_watched_at<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(at) => serializer.serialize_str(&at.to_rfc3339()),
        None => serializer.serialize_none(),
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SlugIds {
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MovieEntry {
    pub ids: SlugIds,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_watched_at")]
    pub watched_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SeasonEntry {
    pub number: u32,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_watched_at")]
    pub watched_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ShowSeasonGroup {
    pub ids: SlugIds,
    pub seasons: Vec<SeasonEntry>,
}

/// Show-level entry used when no season number could be determined.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ShowWholeEntry {
    pub ids: SlugIds,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_watched_at")]
    pub watched_at: Option<DateTime<Utc>>,
}

/// A wire-ready sync entry. Serialization is untagged: each variant renders
/// as the bare object the sync endpoint expects.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum SyncEntry {
    Movie(MovieEntry),
    ShowSeasons(ShowSeasonGroup),
    ShowWhole(ShowWholeEntry),
}

impl SyncEntry {
    pub fn slug(&self) -> &str {
        match self {
            SyncEntry::Movie(e) => &e.ids.slug,
            SyncEntry::ShowSeasons(e) => &e.ids.slug,
            SyncEntry::ShowWhole(e) => &e.ids.slug,
        }
    }

    pub fn bucket(&self) -> SyncBucket {
        match self {
            SyncEntry::Movie(_) => SyncBucket::Movies,
            SyncEntry::ShowSeasons(_) => SyncBucket::ShowSeasons,
            SyncEntry::ShowWhole(_) => SyncBucket::ShowWhole,
        }
    }

    /// True when this entry, or any of its seasons, carries a timestamp.
    pub fn has_watched_at(&self) -> bool {
        match self {
            SyncEntry::Movie(e) => e.watched_at.is_some(),
            SyncEntry::ShowSeasons(e) => e.seasons.iter().any(|s| s.watched_at.is_some()),
            SyncEntry::ShowWhole(e) => e.watched_at.is_some(),
        }
    }
}

/// The three aggregation buckets, in transmission order.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SyncBucket {
    Movies,
    ShowSeasons,
    ShowWhole,
}

impl SyncBucket {
    pub const ALL: [SyncBucket; 3] = [SyncBucket::Movies, SyncBucket::ShowSeasons, SyncBucket::ShowWhole];

    pub fn label(&self) -> &'static str {
        match self {
            SyncBucket::Movies => "movies",
            SyncBucket::ShowSeasons => "shows(seasons)",
            SyncBucket::ShowWhole => "shows(no-season)",
        }
    }
}

/// Top-level request body for the sync endpoints: `{"movies": [...]}` or
/// `{"shows": [...]}`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SyncPayload {
    Movies(Vec<SyncEntry>),
    Shows(Vec<SyncEntry>),
}

impl SyncPayload {
    pub fn len(&self) -> usize {
        match self {
            SyncPayload::Movies(v) | SyncPayload::Shows(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A bounded run of same-bucket entries, sent as one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncBatch {
    pub bucket: SyncBucket,
    pub entries: Vec<SyncEntry>,
}

impl SyncBatch {
    pub fn to_payload(&self) -> SyncPayload {
        match self.bucket {
            SyncBucket::Movies => SyncPayload::Movies(self.entries.clone()),
            SyncBucket::ShowSeasons | SyncBucket::ShowWhole => SyncPayload::Shows(self.entries.clone()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
