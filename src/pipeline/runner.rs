// Pipeline runner
// Drives independent pipelines on a bounded worker pool

use crate::config::Config;
use crate::core::cancel::CancelToken;
use crate::error::{ArbError, ArbResult};
use crate::pipeline::report_writer::{open_sink, ReportSender, ReportWriter};
use crate::pipeline::{backtest, refine, report_outcomes, DirectionOutcome, PipelineSpec};
use crate::progress::PipelineProgress;
use rayon::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Refine,
    Backtest,
    /// Refine, then backtest the fresh dataset
    Full,
}

impl Stage {
    pub fn refines(&self) -> bool {
        matches!(self, Stage::Refine | Stage::Full)
    }

    pub fn backtests(&self) -> bool {
        matches!(self, Stage::Backtest | Stage::Full)
    }

    fn label(&self) -> &'static str {
        match self {
            Stage::Refine => "Refining",
            Stage::Backtest => "Backtesting",
            Stage::Full => "Refining and backtesting",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStatus {
    Completed,
    Failed { category: &'static str, message: String },
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineOutcome {
    pub pipeline: String,
    pub spec: PipelineSpec,
    pub status: PipelineStatus,
    pub refined_records: Option<usize>,
    pub directions: Vec<DirectionOutcome>,
    /// Results handed to the report writer
    pub reported: usize,
}

impl PipelineOutcome {
    fn pending(spec: &PipelineSpec) -> Self {
        Self {
            pipeline: spec.name(),
            spec: spec.clone(),
            status: PipelineStatus::Completed,
            refined_records: None,
            directions: Vec::new(),
            reported: 0,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.status == PipelineStatus::Completed
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub stage: Stage,
    pub outcomes: Vec<PipelineOutcome>,
    pub reports_written: usize,
}

impl RunSummary {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, PipelineStatus::Failed { .. }))
            .count()
    }

    pub fn cancelled(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == PipelineStatus::Cancelled)
            .count()
    }

    pub fn display(&self) {
        info!("📊 Run Summary ({})", self.run_id);
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        info!("   Pipelines: {}", self.outcomes.len());
        info!("   Succeeded: {}", self.succeeded());
        info!("   Failed:    {}", self.failed());
        if self.cancelled() > 0 {
            warn!("   Cancelled: {}", self.cancelled());
        }
        if self.stage.backtests() {
            info!("   Reported:  {}", self.reports_written);
        }
        for outcome in &self.outcomes {
            if let PipelineStatus::Failed { category, message } = &outcome.status {
                warn!("   • {} [{}]: {}", outcome.pipeline, category, message);
            }
        }
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }
}

/// Worker threads for `pipelines` units of work: never more than the
/// hardware offers, the configured bound allows, or there is work for
pub fn pool_size(pipelines: usize, workers: Option<usize>) -> usize {
    let hardware = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let size = pipelines.min(hardware);
    workers.map_or(size, |bound| size.min(bound)).max(1)
}

#[derive(Clone)]
pub struct PipelineRunner {
    config: Arc<Config>,
    cancel: CancelToken,
    show_progress: bool,
}

impl PipelineRunner {
    pub fn new(config: Arc<Config>, cancel: CancelToken) -> Self {
        Self {
            config,
            cancel,
            show_progress: true,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    fn run_stages(
        &self,
        spec: &PipelineSpec,
        stage: Stage,
        reports: Option<&ReportSender>,
        outcome: &mut PipelineOutcome,
    ) -> ArbResult<()> {
        if stage.refines() {
            let refined = refine(spec, &self.config, &self.cancel)?;
            outcome.refined_records = Some(refined.records);
        }

        if stage.backtests() {
            let directions = backtest(spec, &self.config, &self.cancel)?;
            if let Some(reports) = reports {
                outcome.reported = report_outcomes(spec, &directions, &self.config, reports)?;
            }
            outcome.directions = directions;
        }
        Ok(())
    }

    /// Run one pipeline. Failures are captured in the outcome, never propagated.
    pub fn run_one(&self, spec: &PipelineSpec, stage: Stage, reports: Option<&ReportSender>) -> PipelineOutcome {
        let mut outcome = PipelineOutcome::pending(spec);

        if self.cancel.is_cancelled() {
            outcome.status = PipelineStatus::Cancelled;
            return outcome;
        }

        let result = self.run_stages(spec, stage, reports, &mut outcome);
        outcome.status = match result {
            Ok(()) => PipelineStatus::Completed,
            Err(e) if e.is_cancellation() => {
                info!(pipeline = %outcome.pipeline, "Pipeline cancelled");
                PipelineStatus::Cancelled
            }
            Err(e) => {
                error!(
                    pipeline = %outcome.pipeline,
                    category = e.category(),
                    "❌ Pipeline failed: {}",
                    e
                );
                PipelineStatus::Failed {
                    category: e.category(),
                    message: e.to_string(),
                }
            }
        };
        outcome
    }

    /// Run every pipeline on a bounded pool, blocking until all finish.
    /// Outcomes are returned in input order.
    pub fn run_all(
        &self,
        specs: &[PipelineSpec],
        stage: Stage,
        reports: Option<ReportSender>,
    ) -> ArbResult<Vec<PipelineOutcome>> {
        if specs.is_empty() {
            return Ok(Vec::new());
        }

        let threads = pool_size(specs.len(), self.config.pipeline.workers);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("pipeline-{}", i))
            .build()
            .map_err(|e| ArbError::WorkerPool(e.to_string()))?;

        info!("⚙️  {} {} pipelines on {} workers", stage.label(), specs.len(), threads);

        let progress = if self.show_progress {
            PipelineProgress::new(specs.len(), stage.label())
        } else {
            PipelineProgress::hidden()
        };

        let outcomes: Vec<PipelineOutcome> = pool.install(|| {
            specs
                .par_iter()
                .map(|spec| {
                    let outcome = self.run_one(spec, stage, reports.as_ref());
                    progress.advance(&outcome.pipeline, outcome.succeeded());
                    outcome
                })
                .collect()
        });

        let failed = outcomes.iter().filter(|o| !o.succeeded()).count();
        progress.finish(outcomes.len() - failed, failed);
        Ok(outcomes)
    }

    /// Run a batch with its own report writer and summarize it. The report
    /// sink is only opened when the stage backtests.
    pub async fn execute(&self, specs: Vec<PipelineSpec>, stage: Stage) -> ArbResult<RunSummary> {
        let run_id = Uuid::new_v4().to_string();

        let writer = if stage.backtests() {
            Some(ReportWriter::spawn(open_sink(&self.config, &run_id)?))
        } else {
            None
        };
        let sender = writer.as_ref().map(ReportWriter::sender);

        let runner = self.clone();
        let outcomes = tokio::task::spawn_blocking(move || runner.run_all(&specs, stage, sender))
            .await
            .map_err(|e| ArbError::Internal(format!("pipeline pool task failed: {}", e)))??;

        let reports_written = match writer {
            Some(writer) => writer.finish().await?,
            None => 0,
        };

        Ok(RunSummary {
            run_id,
            stage,
            outcomes,
            reports_written,
        })
    }
}
