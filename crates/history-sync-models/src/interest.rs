use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use crate::media::MediaKind;
use crate::subject::SubjectId;

/// One observation from the account's structured interest feed.
///
/// `created_at` is in the source catalog's local time (UTC+8), exactly as
/// the feed reports it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InterestEntry {
    pub subject_id: SubjectId,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<MediaKind>,
    pub created_at: NaiveDateTime,
}

/// Read-only subject → interest entries mapping, built once per run.
#[derive(Debug, Clone, Default)]
pub struct InterestMap {
    entries: HashMap<SubjectId, Vec<InterestEntry>>,
    kinds: HashMap<SubjectId, MediaKind>,
}

impl InterestMap {
    /// Merge entries per subject. Duplicate create times are dropped, entries
    /// are kept newest first, and the last observed kind wins.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = InterestEntry>,
    {
        let mut map = Self::default();
        for entry in entries {
            if let Some(kind) = entry.kind {
                map.kinds.insert(entry.subject_id.clone(), kind);
            }
            let bucket = map.entries.entry(entry.subject_id.clone()).or_default();
            if !bucket.iter().any(|e| e.created_at == entry.created_at) {
                bucket.push(entry);
            }
        }
        for bucket in map.entries.values_mut() {
            bucket.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        }
        map
    }

    /// Entries for a subject, newest first. Empty when the feed never saw it.
    pub fn entries_for(&self, subject_id: &SubjectId) -> &[InterestEntry] {
        self.entries
            .get(subject_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn kind_for(&self, subject_id: &SubjectId) -> Option<MediaKind> {
        self.kinds.get(subject_id).copied()
    }

    pub fn contains(&self, subject_id: &SubjectId) -> bool {
        self.entries.contains_key(subject_id)
    }

    pub fn subject_count(&self) -> usize {
        self.entries.len()
    }

    pub fn entry_count(&self) -> usize {
        self.entries.values().map(|v| v.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, status: &str, kind: Option<MediaKind>, at: &str) -> InterestEntry {
        InterestEntry {
            subject_id: SubjectId::new(id).unwrap(),
            status: status.to_string(),
            kind,
            created_at: NaiveDateTime::parse_from_str(at, "%Y-%m-%d %H:%M:%S").unwrap(),
        }
    }

    #[test]
    fn test_merges_and_sorts_newest_first() {
        let map = InterestMap::from_entries(vec![
            entry("1", "done", Some(MediaKind::Movie), "2020-01-01 10:00:00"),
            entry("1", "wish", None, "2021-03-04 08:00:00"),
            entry("1", "done", None, "2020-01-01 10:00:00"),
            entry("2", "done", Some(MediaKind::Show), "2019-05-05 21:00:00"),
        ]);

        assert_eq!(map.subject_count(), 2);
        assert_eq!(map.entry_count(), 3);

        let first = SubjectId::new("1").unwrap();
        let times: Vec<String> = map
            .entries_for(&first)
            .iter()
            .map(|e| e.created_at.to_string())
            .collect();
        assert_eq!(times, vec!["2021-03-04 08:00:00", "2020-01-01 10:00:00"]);
        assert_eq!(map.kind_for(&first), Some(MediaKind::Movie));
    }

    #[test]
    fn test_last_observed_kind_wins() {
        let map = InterestMap::from_entries(vec![
            entry("7", "done", Some(MediaKind::Movie), "2020-01-01 10:00:00"),
            entry("7", "do", Some(MediaKind::Show), "2020-02-01 10:00:00"),
        ]);
        assert_eq!(map.kind_for(&SubjectId::new("7").unwrap()), Some(MediaKind::Show));
    }

    #[test]
    fn test_unknown_subject_is_empty() {
        let map = InterestMap::default();
        let id = SubjectId::new("404").unwrap();
        assert!(map.entries_for(&id).is_empty());
        assert!(!map.contains(&id));
        assert!(map.is_empty());
    }
}
