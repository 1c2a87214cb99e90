//! File-backed storage for snapshot series and refined profitability datasets
//!
//! Raw series live in `{BASE}_{QUOTE}_{exchange}.csv`, refined datasets in
//! `{BASE}_{QUOTE}_{exchange_a}_{exchange_b}.csv`. Every pipeline writes only
//! its own refined file, so no two pipelines ever share an output.

pub mod records;
pub mod snapshots;

use crate::core::types::Symbol;
use crate::error::{ArbError, ArbResult};
use polars::prelude::*;
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

pub use records::{read_records, summarize_records, write_records, RecordStats};
pub use snapshots::{append_snapshot, append_snapshots, last_timestamp, read_snapshots, write_snapshots};

const CSV_EXTENSION: &str = "csv";

/// A raw snapshot file for one exchange and symbol
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SnapshotSource {
    pub symbol: Symbol,
    pub exchange: String,
    pub path: PathBuf,
}

/// A refined dataset for one symbol and exchange pair
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct RefinedSource {
    pub symbol: Symbol,
    pub exchange_a: String,
    pub exchange_b: String,
    pub path: PathBuf,
}

impl RefinedSource {
    pub fn name(&self) -> String {
        refined_stem(&self.symbol, &self.exchange_a, &self.exchange_b)
    }
}

pub fn raw_file_name(symbol: &Symbol, exchange: &str) -> String {
    format!("{}_{}.{}", symbol.file_stem(), exchange, CSV_EXTENSION)
}

pub fn refined_stem(symbol: &Symbol, exchange_a: &str, exchange_b: &str) -> String {
    format!("{}_{}_{}", symbol.file_stem(), exchange_a, exchange_b)
}

pub fn refined_file_name(symbol: &Symbol, exchange_a: &str, exchange_b: &str) -> String {
    format!("{}.{}", refined_stem(symbol, exchange_a, exchange_b), CSV_EXTENSION)
}

fn csv_stem(path: &Path) -> Option<&str> {
    if path.extension().and_then(|e| e.to_str()) != Some(CSV_EXTENSION) {
        return None;
    }
    path.file_stem().and_then(|s| s.to_str())
}

/// Split a file stem into its underscore-separated parts: base, quote, then exchanges
fn stem_parts(stem: &str) -> Option<(Symbol, Vec<&str>)> {
    let mut parts = stem.split('_');
    let base = parts.next().filter(|s| !s.is_empty())?;
    let quote = parts.next().filter(|s| !s.is_empty())?;
    let exchanges: Vec<&str> = parts.collect();
    if exchanges.iter().any(|e| e.is_empty()) {
        return None;
    }
    Some((Symbol::new(base, quote), exchanges))
}

pub fn parse_raw_file_name(path: &Path) -> Option<(Symbol, String)> {
    let (symbol, exchanges) = stem_parts(csv_stem(path)?)?;
    match exchanges.as_slice() {
        [exchange] => Some((symbol, exchange.to_string())),
        _ => None,
    }
}

pub fn parse_refined_file_name(path: &Path) -> Option<(Symbol, String, String)> {
    let (symbol, exchanges) = stem_parts(csv_stem(path)?)?;
    match exchanges.as_slice() {
        [a, b] => Some((symbol, a.to_string(), b.to_string())),
        _ => None,
    }
}

fn sorted_entries(dir: &Path) -> ArbResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(ArbError::FileNotFound(dir.display().to_string()));
    }
    let mut paths = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()?;
    paths.sort();
    Ok(paths)
}

/// All raw snapshot files in `dir`; unrecognized names are ignored
pub fn discover_sources(dir: &Path) -> ArbResult<Vec<SnapshotSource>> {
    let mut sources = Vec::new();
    for path in sorted_entries(dir)? {
        match parse_raw_file_name(&path) {
            Some((symbol, exchange)) => sources.push(SnapshotSource { symbol, exchange, path }),
            None => debug!(path = %path.display(), "Skipping non-snapshot file"),
        }
    }
    Ok(sources)
}

/// All refined datasets in `dir`
pub fn discover_refined(dir: &Path) -> ArbResult<Vec<RefinedSource>> {
    let mut refined = Vec::new();
    for path in sorted_entries(dir)? {
        match parse_refined_file_name(&path) {
            Some((symbol, exchange_a, exchange_b)) => refined.push(RefinedSource {
                symbol,
                exchange_a,
                exchange_b,
                path,
            }),
            None => debug!(path = %path.display(), "Skipping non-refined file"),
        }
    }
    Ok(refined)
}

pub fn group_by_symbol(sources: Vec<SnapshotSource>) -> BTreeMap<Symbol, Vec<SnapshotSource>> {
    let mut grouped: BTreeMap<Symbol, Vec<SnapshotSource>> = BTreeMap::new();
    for source in sources {
        grouped.entry(source.symbol.clone()).or_default().push(source);
    }
    grouped
}

// Shared polars helpers

pub(crate) fn read_frame(path: &Path) -> ArbResult<DataFrame> {
    if !path.exists() {
        return Err(ArbError::FileNotFound(path.display().to_string()));
    }
    let frame = CsvReader::from_path(path)?.has_header(true).finish()?;
    Ok(frame)
}

/// Write `frame` to `path`, either replacing the file or appending without a header
pub(crate) fn write_frame(path: &Path, frame: &mut DataFrame, append: bool) -> ArbResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let has_header = !(append && path.exists());
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(append)
        .truncate(!append)
        .open(path)
        .map_err(|e| ArbError::FileWrite(format!("{}: {}", path.display(), e)))?;

    CsvWriter::new(file).has_header(has_header).finish(frame)?;
    Ok(())
}

pub(crate) fn f64_column(frame: &DataFrame, name: &str) -> ArbResult<Vec<Option<f64>>> {
    let series = frame.column(name)?.cast(&DataType::Float64)?;
    let values = series.f64()?.into_iter().collect();
    Ok(values)
}

pub(crate) fn i64_column(frame: &DataFrame, name: &str) -> ArbResult<Vec<Option<i64>>> {
    let series = frame.column(name)?.cast(&DataType::Int64)?;
    let values = series.i64()?.into_iter().collect();
    Ok(values)
}

pub(crate) fn string_column(frame: &DataFrame, name: &str) -> ArbResult<Vec<Option<String>>> {
    let series = frame.column(name)?.cast(&DataType::Utf8)?;
    let values = series.utf8()?.into_iter().map(|v| v.map(str::to_string)).collect();
    Ok(values)
}

/// Unwrap a required cell, naming the file, column and row when it is missing
pub(crate) fn required<T>(value: Option<T>, source: &Path, column: &str, row: usize) -> ArbResult<T> {
    value.ok_or_else(|| {
        ArbError::DataFormat(format!(
            "{}: missing {} at row {}",
            source.display(),
            column,
            row
        ))
    })
}
