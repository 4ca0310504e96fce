use chrono::NaiveDate;
use csv::Reader;
use history_sync_models::{MediaKind, RawRecord};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

use crate::error::SourceError;

const REQUIRED_COLUMNS: [&str; 3] = ["title", "date", "douban_link"];

/// Read scraped rows (`title,date,douban_link[,type,season]`) from a CSV file.
pub fn read_raw_records<P: AsRef<Path>>(path: P) -> Result<Vec<RawRecord>, SourceError> {
    let file = File::open(path)?;
    read_raw_records_from(file)
}

pub fn read_raw_records_from<R: Read>(input: R) -> Result<Vec<RawRecord>, SourceError> {
    let mut reader = Reader::from_reader(input);

    let headers = reader.headers()?.clone();
    let header_map: HashMap<String, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim().to_string(), i))
        .collect();

    let available_columns: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    for col in REQUIRED_COLUMNS {
        if !header_map.contains_key(col) {
            return Err(SourceError::MissingColumn {
                column: col.to_string(),
                available: available_columns,
            });
        }
    }

    let type_col = header_map.get("type").copied();
    let season_col = header_map.get("season").copied();

    let mut records = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let record = result?;
        let cell = |idx: usize| record.get(idx).unwrap_or("").trim();

        let title = cell(header_map["title"]);
        if title.is_empty() {
            debug!(row = row + 1, "Skipping row with empty title");
            continue;
        }

        let date_str = cell(header_map["date"]);
        let page_date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").ok();
        if page_date.is_none() && !date_str.is_empty() {
            debug!(row = row + 1, date = %date_str, "Unparseable page date, keeping row undated");
        }

        let mut raw = RawRecord::new(title, page_date, cell(header_map["douban_link"]));
        raw.kind_hint = type_col
            .map(cell)
            .filter(|s| !s.is_empty())
            .and_then(MediaKind::from_source_label);
        raw.season_hint = season_col
            .map(cell)
            .and_then(|s| s.parse::<u32>().ok())
            .filter(|n| *n > 0);
        records.push(raw);
    }

    Ok(records)
}

/// Drop rows dated on or before `since`. Undated rows are kept.
pub fn retain_after(records: Vec<RawRecord>, since: NaiveDate) -> Vec<RawRecord> {
    records
        .into_iter()
        .filter(|r| r.page_date.map_or(true, |d| d > since))
        .collect()
}
