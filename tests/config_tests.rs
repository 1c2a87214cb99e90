// Configuration loading tests

use arb_backtester::{Config, ConfigError, ReferenceUnit, ReportFormat, Symbol};
use std::fs;
use tempfile::TempDir;

const EXAMPLE: &str = include_str!("../config.toml.example");

#[test]
fn test_example_config_parses() {
    let config = Config::from_toml_str(EXAMPLE).unwrap();

    assert_eq!(config.pipeline.tolerance_ms, 60_000);
    assert_eq!(config.pipeline.depth_limit, 3);
    assert_eq!(config.backtest.cooldown_secs, 5400);
    assert_eq!(config.backtest.unit, ReferenceUnit::Fiat);
    assert_eq!(config.data.report_format, ReportFormat::Text);

    let kraken = config.exchange("kraken").unwrap();
    assert_eq!(kraken.id, "kraken");
    assert_eq!(kraken.withdrawal_fee("EUR"), Some(0.09));
    let precision = kraken.precision_for(&Symbol::new("BTC", "EUR"));
    assert_eq!((precision.price, precision.amount), (1, 8));

    assert!(config.exchange("gdax").unwrap().withdrawal_fee("EUR").is_none());
}

#[test]
fn test_empty_config_uses_defaults() {
    let config = Config::from_toml_str("").unwrap();
    assert_eq!(config.pipeline.tolerance_ms, 60_000);
    assert_eq!(config.backtest.max_trade_volume, 1000.0);
    assert!(config.exchanges.is_empty());
}

#[test]
fn test_invalid_values_are_rejected() {
    let cases = [
        "[pipeline]\ntolerance_ms = 0",
        "[pipeline]\nworkers = 0",
        "[backtest]\nmin_profit_threshold = -1.0",
        "[backtest]\nmax_trade_volume = 0.0",
        "[exchanges.kraken]\ntaker_fee = 1.5",
        "[conversion.fiat_rates]\nBTC = -5.0",
    ];

    for case in cases {
        let err = Config::from_toml_str(case).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)), "accepted: {}", case);
    }
}

#[test]
fn test_malformed_toml() {
    let err = Config::from_toml_str("[pipeline\n").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn test_missing_file() {
    let dir = TempDir::new().unwrap();
    let err = Config::load_or_error(dir.path().join("config.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::FileNotFound(_)));
}

#[test]
fn test_save_and_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, EXAMPLE).unwrap();

    let config = Config::load_or_error(&path).unwrap();
    let saved = dir.path().join("saved.toml");
    config.to_file(&saved).unwrap();

    let reloaded = Config::from_file(&saved).unwrap();
    assert_eq!(reloaded.exchanges, config.exchanges);
    assert_eq!(reloaded.backtest, config.backtest);
}
