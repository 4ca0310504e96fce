use serde::{Deserialize, Serialize};

/// One ranked result from the tracking service's search endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogCandidate {
    pub title: String,
    pub year: Option<i32>,
    pub slug: Option<String>,
}

/// A resolved catalog identity. The slug is the only identifier the sync
/// endpoints are given.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogMatch {
    pub slug: String,
    pub matched_title: String,
    pub matched_year: Option<i32>,
}

impl CatalogMatch {
    pub fn new(slug: impl Into<String>, matched_title: impl Into<String>, matched_year: Option<i32>) -> Self {
        Self {
            slug: slug.into(),
            matched_title: matched_title.into(),
            matched_year,
        }
    }
}
