// End-to-end pipeline tests over a temporary data directory

mod common;

use arb_backtester::pipeline::{plan_pipelines, plan_refined};
use arb_backtester::store::{self, discover_sources};
use arb_backtester::{
    BacktestReport, CancelToken, Config, Database, PipelineRunner, PipelineStatus, ReportFormat, Snapshot,
    Stage,
};
use common::{create_test_workspace, raw_path, snapshot};
use std::fs;
use std::sync::Arc;

const START_MS: i64 = 1_500_000_000_000;
const TWO_HOURS_MS: i64 = 2 * 60 * 60 * 1000;

/// 13 snapshots two hours apart, 24 hours end to end
fn series(bid: f64, ask: f64) -> Vec<Snapshot> {
    (0..13)
        .map(|i| snapshot(START_MS + i * TWO_HOURS_MS, bid, 1.0, ask, 1.0))
        .collect()
}

/// Kraken is persistently cheap and bitstamp persistently rich
fn write_raw_series(config: &Config) {
    store::write_snapshots(&raw_path(config, "BTC_EUR_kraken.csv"), &series(99.5, 100.0)).unwrap();
    store::write_snapshots(&raw_path(config, "BTC_EUR_bitstamp.csv"), &series(105.0, 105.5)).unwrap();
}

fn runner(config: Config, cancel: CancelToken) -> PipelineRunner {
    PipelineRunner::new(Arc::new(config), cancel).with_progress(false)
}

#[test]
fn test_discover_and_plan() {
    let (_dir, config) = create_test_workspace();
    write_raw_series(&config);
    fs::write(config.data.raw_dir.join("notes.txt"), "ignored").unwrap();

    let sources = discover_sources(&config.data.raw_dir).unwrap();
    assert_eq!(sources.len(), 2);

    let specs = plan_pipelines(sources);
    assert_eq!(specs.len(), 1);
    assert_eq!(specs[0].name(), "BTC_EUR_bitstamp_kraken");
}

#[tokio::test]
async fn test_full_run_writes_text_report() {
    let (_dir, config) = create_test_workspace();
    write_raw_series(&config);
    let specs = plan_pipelines(discover_sources(&config.data.raw_dir).unwrap());
    let report_path = config.data.report_path.clone();
    let refined_dir = config.data.refined_dir.clone();

    let summary = runner(config, CancelToken::new()).execute(specs, Stage::Full).await.unwrap();

    assert_eq!(summary.succeeded(), 1);
    assert_eq!(summary.reports_written, 1);
    let outcome = &summary.outcomes[0];
    assert_eq!(outcome.refined_records, Some(13));

    // Every record buys on kraken; the reverse direction has nothing to trade
    let records = store::read_records(&refined_dir.join("BTC_EUR_bitstamp_kraken.csv")).unwrap();
    assert_eq!(records.len(), 13);
    assert!(records.iter().all(|r| r.buy_exchange == "kraken" && r.sell_exchange == "bitstamp"));
    assert!(records.iter().all(|r| r.net_profit.is_some()));

    let forward = outcome
        .directions
        .iter()
        .find(|d| d.direction.buy_exchange == "kraken")
        .unwrap();
    assert_eq!(forward.result.trades, 13);
    assert_eq!(forward.result.elapsed_minutes_total, Some(1440.0));
    let reverse = outcome
        .directions
        .iter()
        .find(|d| d.direction.buy_exchange == "bitstamp")
        .unwrap();
    assert_eq!(reverse.result.trades, 0);

    let report = fs::read_to_string(&report_path).unwrap();
    let lines: Vec<&str> = report.lines().collect();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("\"BTC_EUR_bitstamp_kraken_kraken->bitstamp\":"));
    assert!(lines[0].ends_with(','));
}

#[tokio::test]
async fn test_backtest_stage_writes_sqlite_reports() {
    let (dir, mut config) = create_test_workspace();
    write_raw_series(&config);
    let specs = plan_pipelines(discover_sources(&config.data.raw_dir).unwrap());

    let refined = runner(config.clone(), CancelToken::new())
        .execute(specs, Stage::Refine)
        .await
        .unwrap();
    assert_eq!(refined.succeeded(), 1);
    assert_eq!(refined.reports_written, 0);

    config.data.report_format = ReportFormat::Sqlite;
    config.data.report_path = dir.path().join("reports.db");
    let db_path = config.data.report_path.clone();
    let specs = plan_refined(&config.data.refined_dir).unwrap();
    assert_eq!(specs.len(), 1);

    let summary = runner(config, CancelToken::new())
        .execute(specs, Stage::Backtest)
        .await
        .unwrap();
    assert_eq!(summary.reports_written, 1);

    let db = Database::open_with_schema(&db_path).unwrap();
    let reports = BacktestReport::list_by_run(&db, &summary.run_id).unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].buy_exchange, "kraken");
    assert_eq!(reports[0].trades, 13);
    assert_eq!(reports[0].unit, "fiat");
    assert!(reports[0].cumulative_profit_normalized > 10.0);
}

#[tokio::test]
async fn test_unknown_exchange_fails_only_its_pipeline() {
    let (_dir, config) = create_test_workspace();
    write_raw_series(&config);
    store::write_snapshots(&raw_path(&config, "BTC_EUR_gdax.csv"), &series(101.0, 101.5)).unwrap();
    let specs = plan_pipelines(discover_sources(&config.data.raw_dir).unwrap());
    assert_eq!(specs.len(), 3);

    let summary = runner(config, CancelToken::new()).execute(specs, Stage::Full).await.unwrap();

    assert_eq!(summary.succeeded(), 1);
    assert_eq!(summary.failed(), 2);
    for outcome in summary.outcomes.iter().filter(|o| o.pipeline.contains("gdax")) {
        assert!(matches!(outcome.status, PipelineStatus::Failed { .. }));
    }
}

#[tokio::test]
async fn test_cancelled_run_reports_nothing() {
    let (_dir, config) = create_test_workspace();
    write_raw_series(&config);
    let specs = plan_pipelines(discover_sources(&config.data.raw_dir).unwrap());
    let report_path = config.data.report_path.clone();

    let cancel = CancelToken::new();
    cancel.cancel();
    let summary = runner(config, cancel).execute(specs, Stage::Full).await.unwrap();

    assert_eq!(summary.cancelled(), 1);
    assert_eq!(summary.reports_written, 0);
    assert_eq!(fs::read_to_string(&report_path).unwrap_or_default(), "");
}
