use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The two item kinds the tracking service accepts in sync payloads.
///
/// There is deliberately no "unknown" kind: classification always lands on
/// one of these, with `Movie` as the default.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Movie,
    Show,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Show => "show",
        }
    }

    /// Map a free-form subject type label from the source catalog
    /// (e.g. "tv", "movie", "电视剧") onto a kind.
    ///
    /// Returns `None` for labels that carry no usable signal.
    pub fn from_source_label(raw: &str) -> Option<Self> {
        let raw = raw.trim().to_lowercase();
        if raw.is_empty() {
            return None;
        }
        if raw.contains("tv") || raw.contains("show") || raw.contains("series") || raw.contains('剧') {
            return Some(MediaKind::Show);
        }
        if raw.contains("movie") || raw.contains("film") {
            return Some(MediaKind::Movie);
        }
        None
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "movie" => Ok(MediaKind::Movie),
            "show" => Ok(MediaKind::Show),
            other => Err(format!("Invalid media kind: '{}'. Use 'movie' or 'show'", other)),
        }
    }
}
