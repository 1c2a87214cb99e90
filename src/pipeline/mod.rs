//! Per (symbol, exchange pair) pipelines
//!
//! A pipeline refines two raw snapshot series into a profitability dataset and
//! backtests that dataset once per trade direction. Pipelines share nothing but
//! read-only configuration; qualifying results leave through the report queue.

pub mod ingest;
pub mod report_writer;
pub mod runner;

use crate::backtesting::{BacktestResult, BacktestSimulator, TradeDirection};
use crate::config::Config;
use crate::core::cancel::CancelToken;
use crate::core::exchange::ExchangeProfile;
use crate::core::profitability::{ProfitabilityModel, ProfitabilityRecord};
use crate::core::synchronizer::AlignedPairs;
use crate::core::types::{Snapshot, Symbol};
use crate::error::{ArbError, ArbResult};
use crate::store::{self, SnapshotSource};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub use ingest::{ingest_levels, IngestOptions, IngestSummary};
pub use report_writer::{
    open_sink, ReportEntry, ReportSender, ReportSink, ReportWriter, SqliteReportSink, TextReportSink,
};
pub use runner::{pool_size, PipelineOutcome, PipelineRunner, PipelineStatus, RunSummary, Stage};

/// One symbol traded across one unordered pair of exchanges
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PipelineSpec {
    pub symbol: Symbol,
    pub exchange_a: String,
    pub exchange_b: String,
}

impl PipelineSpec {
    pub fn new(symbol: Symbol, exchange_a: impl Into<String>, exchange_b: impl Into<String>) -> Self {
        Self {
            symbol,
            exchange_a: exchange_a.into(),
            exchange_b: exchange_b.into(),
        }
    }

    /// Stable name, also the refined file stem
    pub fn name(&self) -> String {
        store::refined_stem(&self.symbol, &self.exchange_a, &self.exchange_b)
    }

    pub fn raw_path(&self, raw_dir: &Path, exchange: &str) -> PathBuf {
        raw_dir.join(store::raw_file_name(&self.symbol, exchange))
    }

    pub fn refined_path(&self, refined_dir: &Path) -> PathBuf {
        refined_dir.join(store::refined_file_name(&self.symbol, &self.exchange_a, &self.exchange_b))
    }

    /// A→B first, then B→A
    pub fn directions(&self) -> [TradeDirection; 2] {
        let forward = TradeDirection::new(self.exchange_a.clone(), self.exchange_b.clone());
        let backward = forward.reversed();
        [forward, backward]
    }
}

/// Every pair of exchanges recording the same symbol, in file order
pub fn plan_pipelines(sources: Vec<SnapshotSource>) -> Vec<PipelineSpec> {
    let mut specs = Vec::new();
    for (symbol, sources) in store::group_by_symbol(sources) {
        for (i, a) in sources.iter().enumerate() {
            for b in &sources[i + 1..] {
                specs.push(PipelineSpec::new(symbol.clone(), a.exchange.clone(), b.exchange.clone()));
            }
        }
    }
    specs
}

/// Pipelines whose refined dataset already exists
pub fn plan_refined(refined_dir: &Path) -> ArbResult<Vec<PipelineSpec>> {
    Ok(store::discover_refined(refined_dir)?
        .into_iter()
        .map(|r| PipelineSpec::new(r.symbol, r.exchange_a, r.exchange_b))
        .collect())
}

fn profile<'a>(config: &'a Config, id: &str) -> ArbResult<&'a ExchangeProfile> {
    config
        .exchange(id)
        .ok_or_else(|| ArbError::UnknownExchange(id.to_string()))
}

/// Align two series and evaluate every pair. Stops at the first poll that
/// sees cancellation and returns `None`.
#[allow(clippy::too_many_arguments)]
pub fn refine_series(
    symbol: &Symbol,
    stream_a: &[Snapshot],
    stream_b: &[Snapshot],
    profile_a: &ExchangeProfile,
    profile_b: &ExchangeProfile,
    model: &ProfitabilityModel<'_>,
    tolerance_ms: i64,
    cancel: &CancelToken,
) -> Option<Vec<ProfitabilityRecord>> {
    let mut records = Vec::with_capacity(stream_a.len().min(stream_b.len()));

    for pair in AlignedPairs::new(stream_a, stream_b, tolerance_ms) {
        if cancel.is_cancelled() {
            return None;
        }
        records.push(model.evaluate(symbol, &pair, profile_a, profile_b));
    }
    Some(records)
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefineOutcome {
    pub path: PathBuf,
    pub records: usize,
}

/// Load both raw series, refine them and replace the pipeline's refined dataset
pub fn refine(spec: &PipelineSpec, config: &Config, cancel: &CancelToken) -> ArbResult<RefineOutcome> {
    let profile_a = profile(config, &spec.exchange_a)?;
    let profile_b = profile(config, &spec.exchange_b)?;

    let stream_a = store::read_snapshots(
        &spec.raw_path(&config.data.raw_dir, &spec.exchange_a),
        profile_a.precision_for(&spec.symbol),
    )?;
    let stream_b = store::read_snapshots(
        &spec.raw_path(&config.data.raw_dir, &spec.exchange_b),
        profile_b.precision_for(&spec.symbol),
    )?;
    debug!(pipeline = %spec.name(), a = stream_a.len(), b = stream_b.len(), "Loaded snapshot series");

    let model = ProfitabilityModel::new(&config.conversion).with_volume_cap(config.pipeline.volume_cap);
    let records = refine_series(
        &spec.symbol,
        &stream_a,
        &stream_b,
        profile_a,
        profile_b,
        &model,
        config.pipeline.tolerance_ms,
        cancel,
    )
    .ok_or_else(|| ArbError::Cancelled(spec.name()))?;

    let path = spec.refined_path(&config.data.refined_dir);
    store::write_records(&path, &records)?;
    info!(pipeline = %spec.name(), records = records.len(), "Refined dataset written");

    Ok(RefineOutcome {
        path,
        records: records.len(),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectionOutcome {
    pub direction: TradeDirection,
    pub result: BacktestResult,
}

/// Run the simulator once per direction over the matching records
pub fn backtest_records(
    spec: &PipelineSpec,
    records: &[ProfitabilityRecord],
    simulator: &BacktestSimulator,
    cancel: &CancelToken,
) -> Vec<DirectionOutcome> {
    spec.directions()
        .into_iter()
        .map(|direction| {
            let selected = direction.select(records);
            let result = simulator.run_with_cancel(&selected, cancel);
            debug!(
                pipeline = %spec.name(),
                direction = %direction,
                trades = result.trades,
                cumulative = result.cumulative_profit,
                "Direction backtested"
            );
            DirectionOutcome { direction, result }
        })
        .collect()
}

/// Backtest the pipeline's refined dataset
pub fn backtest(spec: &PipelineSpec, config: &Config, cancel: &CancelToken) -> ArbResult<Vec<DirectionOutcome>> {
    let records = store::read_records(&spec.refined_path(&config.data.refined_dir))?;
    let simulator = BacktestSimulator::new(config.backtest.clone());
    let outcomes = backtest_records(spec, &records, &simulator, cancel);

    if outcomes.iter().any(|o| o.result.cancelled) {
        return Err(ArbError::Cancelled(spec.name()));
    }
    Ok(outcomes)
}

/// Queue every outcome that clears the reporting threshold; returns how many were queued
pub fn report_outcomes(
    spec: &PipelineSpec,
    outcomes: &[DirectionOutcome],
    config: &Config,
    reports: &ReportSender,
) -> ArbResult<usize> {
    let mut queued = 0;
    for outcome in outcomes {
        let entry = ReportEntry::qualifying(
            &spec.name(),
            &spec.symbol,
            &outcome.direction,
            config.backtest.unit,
            &outcome.result,
            config.backtest.reporting_threshold,
        );
        if let Some(entry) = entry {
            reports.send(entry)?;
            queued += 1;
        }
    }
    Ok(queued)
}
