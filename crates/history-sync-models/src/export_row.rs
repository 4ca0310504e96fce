use serde::{Deserialize, Serialize};

/// Column order of the manual-review CSV.
pub const EXPORT_FIELDS: [&str; 10] = [
    "title",
    "date",
    "datetime",
    "type",
    "season",
    "slug",
    "matched_title",
    "matched_year",
    "found",
    "douban_link",
];

/// One row of the manual-review CSV.
///
/// Every column is kept as text so hand-edited files load without fuss;
/// typed parsing happens when rows are turned back into records.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExportRow {
    #[serde(default)]
    pub title: String,
    /// Page date, `YYYY-MM-DD`
    #[serde(default)]
    pub date: String,
    /// Resolved watch time in source-local time, `YYYY-MM-DD HH:MM:SS`
    #[serde(default)]
    pub datetime: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub season: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub matched_title: String,
    #[serde(default)]
    pub matched_year: String,
    #[serde(default)]
    pub found: String,
    #[serde(default)]
    pub douban_link: String,
}

impl ExportRow {
    /// Hand-edited files use a handful of truthy spellings.
    pub fn is_found(&self) -> bool {
        matches!(self.found.trim(), "1" | "true" | "True" | "yes" | "Y")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_found() {
        for truthy in ["1", "true", "True", "yes", "Y", " 1 "] {
            let row = ExportRow { found: truthy.to_string(), ..Default::default() };
            assert!(row.is_found(), "{truthy} should count as found");
        }
        for falsy in ["0", "", "no", "false", "y"] {
            let row = ExportRow { found: falsy.to_string(), ..Default::default() };
            assert!(!row.is_found(), "{falsy} should not count as found");
        }
    }
}
