// Level ingestion
// Recorded L2 books (JSON lines) -> aggregated snapshots appended to the raw store

use crate::core::aggregator::RawOrderBook;
use crate::core::cancel::CancelToken;
use crate::core::types::{PrecisionRules, Snapshot};
use crate::error::{ArbError, ArbResult};
use crate::store;
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub books_read: usize,
    pub appended: usize,
    pub empty: usize,
    pub out_of_order: usize,
    /// Gave up after too many consecutive empty books
    pub delisted: bool,
    pub cancelled: bool,
}

/// Options for one ingestion run
#[derive(Debug, Clone, Copy)]
pub struct IngestOptions {
    pub depth_limit: usize,
    pub precision: PrecisionRules,
    pub max_empty_books: usize,
}

/// Aggregate every book in `input` and append the usable snapshots to `output`.
///
/// Empty books are skipped; once `max_empty_books` arrive in a row the
/// instrument is treated as delisted and the rest of the input is ignored.
/// Books not newer than the last stored snapshot are skipped.
pub fn ingest_levels(
    input: &Path,
    output: &Path,
    options: IngestOptions,
    cancel: &CancelToken,
) -> ArbResult<IngestSummary> {
    let file = File::open(input).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ArbError::FileNotFound(input.display().to_string()),
        _ => ArbError::FileRead(format!("{}: {}", input.display(), e)),
    })?;

    let mut summary = IngestSummary::default();
    let mut last_timestamp = store::last_timestamp(output)?;
    let mut consecutive_empty = 0usize;
    let mut accepted: Vec<Snapshot> = Vec::new();

    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        if cancel.is_cancelled() {
            summary.cancelled = true;
            break;
        }

        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let book: RawOrderBook = serde_json::from_str(&line).map_err(|e| {
            ArbError::DataFormat(format!("{}:{}: {}", input.display(), line_no + 1, e))
        })?;
        summary.books_read += 1;

        let snapshot = book.to_snapshot(options.depth_limit, options.precision);
        if snapshot.is_empty() {
            summary.empty += 1;
            consecutive_empty += 1;
            debug!(timestamp = snapshot.timestamp, "Empty order book skipped");

            if consecutive_empty >= options.max_empty_books {
                warn!(
                    "⚠️  {} consecutive empty books, treating {} as delisted",
                    consecutive_empty,
                    output.display()
                );
                summary.delisted = true;
                break;
            }
            continue;
        }
        consecutive_empty = 0;

        if last_timestamp.map_or(false, |last| snapshot.timestamp <= last) {
            warn!(timestamp = snapshot.timestamp, "Out-of-order book skipped");
            summary.out_of_order += 1;
            continue;
        }

        last_timestamp = Some(snapshot.timestamp);
        accepted.push(snapshot);
    }

    store::append_snapshots(output, &accepted)?;
    summary.appended = accepted.len();

    info!(
        "📥 Ingested {}: {} books, {} appended, {} empty, {} out of order",
        input.display(),
        summary.books_read,
        summary.appended,
        summary.empty,
        summary.out_of_order
    );
    Ok(summary)
}
