use chrono::{NaiveDate, Timelike};
use csv::{Reader, Writer};
use history_sync_models::{
    CatalogMatch, ExportRow, MediaKind, RawRecord, ResolvedRecord, TimeSource, WatchTime, EXPORT_FIELDS,
};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::aggregator::MatchedRecord;
use crate::classifier::classify_type;
use crate::time::{format_source_local, parse_source_datetime, utc_to_source, MIDDAY_HOUR};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to access export file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed export CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Export file is missing columns {missing:?}. Expected: {expected}")]
    MissingColumns { missing: Vec<String>, expected: String },
}

pub fn to_export_row(record: &MatchedRecord) -> ExportRow {
    let resolved = &record.resolved;
    let found = record.catalog_match.as_ref();
    ExportRow {
        title: resolved.title.clone(),
        date: resolved
            .page_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        datetime: resolved
            .watched_at_utc()
            .map(format_source_local)
            .unwrap_or_default(),
        kind: resolved.kind.as_str().to_string(),
        season: resolved.season.map(|s| s.to_string()).unwrap_or_default(),
        slug: found.map(|m| m.slug.clone()).unwrap_or_default(),
        matched_title: found.map(|m| m.matched_title.clone()).unwrap_or_default(),
        matched_year: found
            .and_then(|m| m.matched_year)
            .map(|y| y.to_string())
            .unwrap_or_default(),
        found: if found.is_some() { "1" } else { "0" }.to_string(),
        douban_link: resolved.source_link.clone(),
    }
}

/// Turn a review row back into a record. Bad cells read as absent; a row
/// without a slug, a type, or a truthy `found` comes back unmatched.
pub fn from_export_row(row: &ExportRow) -> MatchedRecord {
    let title = row.title.trim();
    let page_date = NaiveDate::parse_from_str(row.date.trim(), "%Y-%m-%d").ok();
    let raw = RawRecord::new(title, page_date, row.douban_link.trim());

    let explicit_kind = row.kind.parse::<MediaKind>().ok();
    let kind = explicit_kind.unwrap_or_else(|| classify_type(title));
    let season = row.season.trim().parse::<u32>().ok();
    let watched_at = parse_source_datetime(&row.datetime).map(|instant| {
        let local = utc_to_source(instant);
        // Midnight and midday are what a bare day turns into
        let source = if local.minute() == 0
            && local.second() == 0
            && (local.hour() == 0 || local.hour() == MIDDAY_HOUR)
        {
            TimeSource::PageDate
        } else {
            TimeSource::Imported
        };
        WatchTime::new(instant, source)
    });

    let resolved = ResolvedRecord::new(&raw, kind, season, watched_at);

    let slug = row.slug.trim();
    let catalog_match = (row.is_found() && !slug.is_empty() && explicit_kind.is_some()).then(|| {
        CatalogMatch::new(
            slug,
            row.matched_title.trim(),
            row.matched_year.trim().parse::<i32>().ok(),
        )
    });

    MatchedRecord::new(resolved, catalog_match)
}

/// True when the row has no time or only a day-granularity one.
pub fn needs_refine(record: &MatchedRecord) -> bool {
    record
        .resolved
        .watched_at
        .map_or(true, |w| w.is_day_granularity())
}

pub fn write_export<P: AsRef<Path>>(path: P, records: &[MatchedRecord]) -> Result<usize, ExportError> {
    let rows: Vec<ExportRow> = records.iter().map(to_export_row).collect();
    write_export_rows(path, &rows)
}

/// Write rows exactly as given, hand edits included.
pub fn write_export_rows<P: AsRef<Path>>(path: P, rows: &[ExportRow]) -> Result<usize, ExportError> {
    if let Some(parent) = path.as_ref().parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    write_export_rows_to(file, rows)
}

pub fn write_export_rows_to<W: Write>(output: W, rows: &[ExportRow]) -> Result<usize, ExportError> {
    let mut writer = Writer::from_writer(output);
    for row in rows {
        writer.serialize(row)?;
    }
    if rows.is_empty() {
        writer.write_record(EXPORT_FIELDS)?;
    }
    writer.flush()?;
    Ok(rows.len())
}

pub fn read_export<P: AsRef<Path>>(path: P) -> Result<Vec<MatchedRecord>, ExportError> {
    Ok(read_export_rows(path)?.iter().map(from_export_row).collect())
}

pub fn read_export_rows<P: AsRef<Path>>(path: P) -> Result<Vec<ExportRow>, ExportError> {
    let file = File::open(path)?;
    read_export_rows_from(file)
}

/// Raw review rows, every cell as written. Rows with an empty title are dropped.
pub fn read_export_rows_from<R: Read>(input: R) -> Result<Vec<ExportRow>, ExportError> {
    let mut reader = Reader::from_reader(input);

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
    let missing: Vec<String> = EXPORT_FIELDS
        .iter()
        .filter(|field| !headers.iter().any(|h| h == *field))
        .map(|field| field.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ExportError::MissingColumns {
            missing,
            expected: EXPORT_FIELDS.join(","),
        });
    }

    let mut rows = Vec::new();
    for (index, result) in reader.deserialize::<ExportRow>().enumerate() {
        let row = result?;
        if row.title.trim().is_empty() {
            debug!(row = index + 1, "Skipping export row with empty title");
            continue;
        }
        rows.push(row);
    }

    Ok(rows)
}
