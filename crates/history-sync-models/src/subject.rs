use serde::{Deserialize, Serialize};
use std::fmt;

/// Source catalog identifier, the join key across all time sources.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(String);

impl SubjectId {
    /// Wrap a raw id, rejecting blank strings.
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Extract the numeric id from a subject link such as
    /// `https://movie.douban.com/subject/1292052/`.
    pub fn from_link(link: &str) -> Option<Self> {
        let start = link.find("/subject/")? + "/subject/".len();
        let digits: String = link[start..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        Self::new(digits)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
