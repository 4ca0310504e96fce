use serde::{Deserialize, Serialize};
use chrono::NaiveDate;
use crate::media::MediaKind;

/// A record that was resolved but kept out of the sync payload
/// (e.g., no catalog match was found for it).
///
/// These stay in the export artifact so they can be fixed by hand.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExcludedRecord {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    pub kind: MediaKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_date: Option<NaiveDate>,
    pub reason: String,
}
