// Report writer
// Pipelines enqueue qualifying results; one consumer owns the sink

use crate::backtesting::{BacktestResult, TradeDirection};
use crate::config::{Config, ReportFormat};
use crate::core::exchange::ReferenceUnit;
use crate::core::types::{round_to, Symbol};
use crate::db::{BacktestReport, Database};
use crate::error::{ArbError, ArbResult};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// A result that cleared the reporting threshold
#[derive(Debug, Clone, PartialEq)]
pub struct ReportEntry {
    pub pipeline: String,
    pub symbol: Symbol,
    pub direction: TradeDirection,
    pub unit: ReferenceUnit,
    pub trades: usize,
    pub cumulative_profit: f64,
    pub cumulative_profit_normalized: f64,
    pub elapsed_minutes: Option<f64>,
}

impl ReportEntry {
    /// `None` unless the result qualifies for the report
    pub fn qualifying(
        pipeline: &str,
        symbol: &Symbol,
        direction: &TradeDirection,
        unit: ReferenceUnit,
        result: &BacktestResult,
        reporting_threshold: f64,
    ) -> Option<Self> {
        if !result.qualifies_for_report(reporting_threshold) {
            return None;
        }
        Some(Self {
            pipeline: pipeline.to_string(),
            symbol: symbol.clone(),
            direction: direction.clone(),
            unit,
            trades: result.trades,
            cumulative_profit: result.cumulative_profit,
            cumulative_profit_normalized: result.cumulative_profit_normalized?,
            elapsed_minutes: result.elapsed_minutes_total,
        })
    }

    pub fn key(&self) -> String {
        format!("{}_{}", self.pipeline, self.direction)
    }

    fn unit_name(&self) -> &'static str {
        match self.unit {
            ReferenceUnit::Quote => "quote",
            ReferenceUnit::Fiat => "fiat",
            ReferenceUnit::Crypto => "crypto",
        }
    }
}

/// Destination of qualifying results. Only the writer task touches a sink.
pub trait ReportSink: Send {
    fn write(&mut self, entry: &ReportEntry) -> ArbResult<()>;

    fn flush(&mut self) -> ArbResult<()> {
        Ok(())
    }
}

/// Append-only text report, one `"key":value,` line per result
pub struct TextReportSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl TextReportSink {
    pub fn open(path: &Path) -> ArbResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| ArbError::FileWrite(format!("{}: {}", path.display(), e)))?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    pub fn format_line(entry: &ReportEntry) -> String {
        format!(
            "\"{}\":{:.2},",
            entry.key(),
            round_to(entry.cumulative_profit_normalized, 2)
        )
    }
}

impl ReportSink for TextReportSink {
    fn write(&mut self, entry: &ReportEntry) -> ArbResult<()> {
        writeln!(self.writer, "{}", Self::format_line(entry))
            .map_err(|e| ArbError::FileWrite(format!("{}: {}", self.path.display(), e)))
    }

    fn flush(&mut self) -> ArbResult<()> {
        self.writer
            .flush()
            .map_err(|e| ArbError::FileWrite(format!("{}: {}", self.path.display(), e)))
    }
}

/// One `backtest_reports` row per result, tagged with the run id
pub struct SqliteReportSink {
    db: Database,
    run_id: String,
}

impl SqliteReportSink {
    pub fn new(db: Database, run_id: impl Into<String>) -> Self {
        Self {
            db,
            run_id: run_id.into(),
        }
    }

    pub fn open(path: &Path, run_id: impl Into<String>) -> ArbResult<Self> {
        Ok(Self::new(Database::open_with_schema(path)?, run_id))
    }
}

impl ReportSink for SqliteReportSink {
    fn write(&mut self, entry: &ReportEntry) -> ArbResult<()> {
        let report = BacktestReport {
            id: None,
            run_id: self.run_id.clone(),
            pipeline: entry.pipeline.clone(),
            symbol: entry.symbol.to_string(),
            buy_exchange: entry.direction.buy_exchange.clone(),
            sell_exchange: entry.direction.sell_exchange.clone(),
            trades: i64::try_from(entry.trades).unwrap_or(i64::MAX),
            cumulative_profit: entry.cumulative_profit,
            cumulative_profit_normalized: entry.cumulative_profit_normalized,
            elapsed_minutes: entry.elapsed_minutes,
            unit: entry.unit_name().to_string(),
            created_at: String::new(),
        };
        report.insert(&self.db)?;
        Ok(())
    }
}

/// Build the sink selected by `data.report_format`
pub fn open_sink(config: &Config, run_id: &str) -> ArbResult<Box<dyn ReportSink>> {
    let path = &config.data.report_path;
    match config.data.report_format {
        ReportFormat::Text => Ok(Box::new(TextReportSink::open(path)?)),
        ReportFormat::Sqlite => Ok(Box::new(SqliteReportSink::open(path, run_id)?)),
    }
}

/// Cloneable producer side of the report queue
#[derive(Clone)]
pub struct ReportSender {
    sender: UnboundedSender<ReportEntry>,
}

impl ReportSender {
    pub fn send(&self, entry: ReportEntry) -> ArbResult<()> {
        self.sender
            .send(entry)
            .map_err(|_| ArbError::ReportChannelClosed)
    }
}

/// Owns the consumer task draining the report queue into a sink
pub struct ReportWriter {
    sender: ReportSender,
    handle: JoinHandle<ArbResult<usize>>,
}

impl ReportWriter {
    /// Start the consumer. Must be called from within a tokio runtime.
    pub fn spawn(sink: Box<dyn ReportSink>) -> Self {
        let (sender, receiver) = unbounded_channel();
        let handle = tokio::task::spawn_blocking(move || drain(receiver, sink));

        Self {
            sender: ReportSender { sender },
            handle,
        }
    }

    pub fn sender(&self) -> ReportSender {
        self.sender.clone()
    }

    /// Close the queue and wait for every pending entry to be written.
    /// Returns the number of entries written.
    pub async fn finish(self) -> ArbResult<usize> {
        drop(self.sender);
        self.handle
            .await
            .map_err(|e| ArbError::Internal(format!("report writer task failed: {}", e)))?
    }
}

fn drain(mut receiver: UnboundedReceiver<ReportEntry>, mut sink: Box<dyn ReportSink>) -> ArbResult<usize> {
    let mut written = 0usize;

    while let Some(entry) = receiver.blocking_recv() {
        match sink.write(&entry) {
            Ok(()) => {
                written += 1;
                debug!(key = %entry.key(), normalized = entry.cumulative_profit_normalized, "Report written");
            }
            Err(e) => {
                error!(key = %entry.key(), category = e.category(), "Failed to write report: {}", e);
            }
        }
    }

    sink.flush()?;
    info!("📝 Report writer finished: {} entries", written);
    Ok(written)
}
