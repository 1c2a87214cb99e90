// Command implementations for arb-bot
use arb_backtester::backtesting::BacktestSimulator;
use arb_backtester::pipeline::{
    self, ingest_levels, IngestOptions, IngestSummary, PipelineRunner, PipelineSpec, RunSummary, Stage,
};
use arb_backtester::store;
use arb_backtester::{ArbError, ArbResult, CancelToken, Config, PreFlightValidator, Spinner, Symbol, ValidationResult};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

fn require_passed(validation: ValidationResult) -> ArbResult<()> {
    if !validation.passed {
        validation.display();
        return Err(ArbError::ConfigValidation("pre-flight validation failed".to_string()));
    }
    for warning in validation.warnings() {
        warn!("⚠️  {}: {}", warning.name, warning.message);
    }
    Ok(())
}

fn runner(config: &Config, cancel: &CancelToken) -> PipelineRunner {
    PipelineRunner::new(Arc::new(config.clone()), cancel.clone())
}

pub async fn aggregate(
    exchange: &str,
    symbol: &str,
    input: &Path,
    config: &Config,
    cancel: &CancelToken,
) -> ArbResult<IngestSummary> {
    let symbol = Symbol::parse(symbol)
        .ok_or_else(|| ArbError::DataFormat(format!("'{}' is not a symbol like BTC/EUR", symbol)))?;
    let profile = config
        .exchange(exchange)
        .ok_or_else(|| ArbError::UnknownExchange(exchange.to_string()))?;

    fs::create_dir_all(&config.data.raw_dir)?;
    let output = config.data.raw_dir.join(store::raw_file_name(&symbol, exchange));
    let options = IngestOptions {
        depth_limit: config.pipeline.depth_limit,
        precision: profile.precision_for(&symbol),
        max_empty_books: config.pipeline.max_empty_books,
    };

    info!("📥 Aggregating {} on {} into {}", symbol, exchange, output.display());
    let spinner = Spinner::new(&format!("Reading {}...", input.display()));

    let input = input.to_path_buf();
    let cancel = cancel.clone();
    let summary = tokio::task::spawn_blocking(move || ingest_levels(&input, &output, options, &cancel))
        .await
        .map_err(|e| ArbError::Internal(format!("ingestion task failed: {}", e)))?;

    match &summary {
        Ok(s) => spinner.finish(&format!("Appended {} snapshots", s.appended)),
        Err(e) => spinner.finish_with_error(&e.to_string()),
    }
    let summary = summary?;

    if summary.delisted {
        warn!("⚠️  {} looks delisted on {}; ingestion stopped early", symbol, exchange);
    }
    Ok(summary)
}

pub async fn refine(config: &Config, cancel: &CancelToken) -> ArbResult<RunSummary> {
    require_passed(PreFlightValidator::new(config).validate_for_refine())?;

    let specs = pipeline::plan_pipelines(store::discover_sources(&config.data.raw_dir)?);
    if specs.is_empty() {
        warn!("⚠️  No symbol is recorded on two exchanges in {}", config.data.raw_dir.display());
    }
    fs::create_dir_all(&config.data.refined_dir)?;

    let summary = runner(config, cancel).execute(specs, Stage::Refine).await?;
    summary.display();
    Ok(summary)
}

pub async fn backtest(config: &Config, json: bool, cancel: &CancelToken) -> ArbResult<RunSummary> {
    require_passed(PreFlightValidator::new(config).validate_for_backtest())?;

    let specs = pipeline::plan_refined(&config.data.refined_dir)?;
    if specs.is_empty() {
        warn!("⚠️  No refined datasets in {}; run `arb-bot refine` first", config.data.refined_dir.display());
    }

    let summary = runner(config, cancel).execute(specs, Stage::Backtest).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        summary.display();
    }
    Ok(summary)
}

pub async fn run(config: &Config, cancel: &CancelToken) -> ArbResult<RunSummary> {
    require_passed(PreFlightValidator::new(config).validate_all())?;

    let specs = pipeline::plan_pipelines(store::discover_sources(&config.data.raw_dir)?);
    fs::create_dir_all(&config.data.refined_dir)?;

    let summary = runner(config, cancel).execute(specs, Stage::Full).await?;
    summary.display();
    Ok(summary)
}

pub fn validate(config: &Config) -> ArbResult<()> {
    let validation = PreFlightValidator::new(config).validate_all();
    validation.display();
    if validation.passed {
        Ok(())
    } else {
        Err(ArbError::ConfigValidation("pre-flight validation failed".to_string()))
    }
}

/// Backtest a single refined file and print its statistics
pub fn summary(path: &Path, config: &Config) -> ArbResult<()> {
    let (symbol, exchange_a, exchange_b) = store::parse_refined_file_name(path).ok_or_else(|| {
        ArbError::DataFormat(format!(
            "{} is not named like BASE_QUOTE_exchangeA_exchangeB.csv",
            path.display()
        ))
    })?;
    let spec = PipelineSpec::new(symbol, exchange_a, exchange_b);

    let stats = store::summarize_records(path)?;
    info!("📊 {} ({:?})", spec.name(), config.backtest.unit);
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("   Records:          {}", stats.rows);
    info!("   Gross-profitable: {}", stats.profitable);
    if let (Some(mean), Some(max)) = (stats.mean_gross_profit, stats.max_gross_profit) {
        info!("   Gross profit:     mean {:.4}, max {:.4} {}", mean, max, spec.symbol.quote);
    }

    let records = store::read_records(path)?;
    let simulator = BacktestSimulator::new(config.backtest.clone());
    for outcome in pipeline::backtest_records(&spec, &records, &simulator, &CancelToken::new()) {
        let result = &outcome.result;
        info!("");
        info!("🔁 {}", outcome.direction);
        info!("   Records evaluated: {}", result.records_evaluated);
        info!("   Trades:            {}", result.trades);
        info!("   Cumulative profit: {:.4}", result.cumulative_profit);
        if let Some(average) = result.average_profit() {
            info!("   Average per trade: {:.4}", average);
        }
        match (result.elapsed_minutes_total, result.cumulative_profit_normalized) {
            (Some(minutes), Some(normalized)) => {
                info!("   Elapsed:           {:.2} min", minutes);
                info!("   Normalized (24h):  {:.2}", normalized);
            }
            _ => info!("   Normalized (24h):  undefined"),
        }
        let reportable = result.qualifies_for_report(config.backtest.reporting_threshold);
        info!("   Reportable:        {}", if reportable { "yes" } else { "no" });
    }
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    Ok(())
}
