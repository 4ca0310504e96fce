use history_sync_models::{ExportRow, RawRecord};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::export::{from_export_row, needs_refine, write_export_rows, ExportError};
use crate::progress::ProgressSink;
use crate::resolver::TimeResolver;
use crate::time::format_source_local;

#[derive(Debug, Clone, Copy, Default)]
pub struct RefineOptions {
    /// Only touch rows without a time or with a day-granularity one
    pub only_missing: bool,
    pub request_delay: Duration,
    /// Stop looking once this many rows were updated
    pub limit: Option<usize>,
    /// Copy the input to `<input>.bak` before overwriting it in place
    pub backup: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RefineOutcome {
    pub rows: Vec<ExportRow>,
    pub updated: usize,
    pub kept: usize,
}

/// Re-run time resolution over review rows. Only the `datetime` cell is
/// ever rewritten, and only when resolution finds a different time at
/// least as precise as the one the row already has.
pub async fn refine_records(
    rows: Vec<ExportRow>,
    resolver: &TimeResolver<'_>,
    options: RefineOptions,
    progress: &mut dyn ProgressSink,
) -> RefineOutcome {
    let mut outcome = RefineOutcome {
        rows: Vec::with_capacity(rows.len()),
        ..RefineOutcome::default()
    };
    progress.start(rows.len());

    for mut row in rows {
        let limit_reached = options.limit.is_some_and(|limit| outcome.updated >= limit);
        let record = from_export_row(&row);
        if limit_reached || (options.only_missing && !needs_refine(&record)) {
            outcome.kept += 1;
            progress.advance(&row.title);
            outcome.rows.push(row);
            continue;
        }

        let resolved = &record.resolved;
        let mut raw = RawRecord::new(resolved.title.as_str(), resolved.page_date, resolved.source_link.as_str());
        raw.kind_hint = Some(resolved.kind);
        raw.season_hint = resolved.season;

        let resolution = resolver.resolve_time(&raw).await;
        if resolution.deep_fetched && !options.request_delay.is_zero() {
            tokio::time::sleep(options.request_delay).await;
        }

        let previous = resolved.watched_at;
        let replacement = resolution.watched_at.filter(|candidate| match previous {
            None => true,
            Some(old) => candidate.instant != old.instant && candidate.precision() >= old.precision(),
        });

        match replacement {
            Some(candidate) => {
                debug!(
                    title = %row.title,
                    from = %row.datetime,
                    to = %candidate.instant,
                    source = ?candidate.source,
                    "Refined watch time"
                );
                row.datetime = format_source_local(candidate.instant);
                outcome.updated += 1;
            }
            None => outcome.kept += 1,
        }

        progress.advance(&row.title);
        outcome.rows.push(row);
    }

    progress.finish();
    info!(updated = outcome.updated, kept = outcome.kept, "Refine finished");
    outcome
}

/// `<input>.bak`, next to the input.
pub fn backup_path(input: &Path) -> PathBuf {
    let mut name = input.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Write refined rows to `out`. When `backup` is set and `out` is the input
/// itself, the untouched input is copied aside first; its path is returned.
pub fn write_refined(
    input: &Path,
    out: &Path,
    rows: &[ExportRow],
    options: &RefineOptions,
) -> Result<Option<PathBuf>, ExportError> {
    let backup = if options.backup && same_file(input, out) {
        let target = backup_path(input);
        std::fs::copy(input, &target)?;
        info!(backup = %target.display(), "Wrote backup of review file");
        Some(target)
    } else {
        None
    };

    write_export_rows(out, rows)?;
    Ok(backup)
}
