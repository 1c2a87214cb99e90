// Common test utilities and helpers
#![allow(dead_code)]

use arb_backtester::{
    Amount, BacktestConfig, Config, ConversionTable, ExchangeProfile, PrecisionRules, ProfitabilityRecord,
    ReferenceUnit, Snapshot,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Deterministic generator so property loops are reproducible
pub fn seeded(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

pub fn snapshot(timestamp: i64, bid_price: f64, bid_volume: f64, ask_price: f64, ask_volume: f64) -> Snapshot {
    Snapshot {
        timestamp,
        bid_price,
        bid_volume,
        ask_price,
        ask_volume,
        precision: PrecisionRules::default(),
    }
}

/// A strictly increasing snapshot stream with random gaps and a random walk price
pub fn random_stream(rng: &mut StdRng, len: usize, start_ms: i64, max_gap_ms: i64, base_price: f64) -> Vec<Snapshot> {
    let mut timestamp = start_ms;
    let mut price = base_price;
    let mut stream = Vec::with_capacity(len);

    for _ in 0..len {
        timestamp += rng.gen_range(1..=max_gap_ms);
        price *= 1.0 + rng.gen_range(-0.002..0.002);
        let spread = price * rng.gen_range(0.0001..0.002);
        stream.push(snapshot(
            timestamp,
            price - spread / 2.0,
            rng.gen_range(0.0..5.0),
            price + spread / 2.0,
            rng.gen_range(0.0..5.0),
        ));
    }
    stream
}

pub fn profile(id: &str, taker_fee: f64, eur_withdrawal_fee: Option<f64>) -> ExchangeProfile {
    let profile = ExchangeProfile::new(id, taker_fee);
    match eur_withdrawal_fee {
        Some(fee) => profile.with_withdrawal_fee("EUR", fee),
        None => profile,
    }
}

/// EUR fiat reference, BTC crypto reference
pub fn conversion_table() -> ConversionTable {
    let mut table = ConversionTable::default();
    table.fiat_rates.insert("BTC".to_string(), 5000.0);
    table.crypto_rates.insert("EUR".to_string(), 0.0002);
    table
}

pub fn amount(value: f64) -> Amount {
    Amount {
        quote: value,
        fiat: Some(value),
        crypto: Some(value * 0.0002),
    }
}

/// A record with the given profit and outlay, in EUR
pub fn record(timestamp_secs: i64, profit: f64, outlay: f64) -> ProfitabilityRecord {
    ProfitabilityRecord {
        timestamp: timestamp_secs * 1000,
        buy_exchange: "kraken".to_string(),
        sell_exchange: "bitstamp".to_string(),
        trade_volume: 1.0,
        max_initial_amount: amount(outlay),
        gross_profit: amount(profit),
        percent_gross_profit: if outlay > 0.0 { Some(profit / outlay * 100.0) } else { None },
        net_profit: None,
        percent_net_profit: None,
    }
}

/// Records at strictly increasing times with profits in [-20, 40)
pub fn random_records(rng: &mut StdRng, count: usize, max_gap_secs: i64) -> Vec<ProfitabilityRecord> {
    let mut t = 0;
    (0..count)
        .map(|_| {
            t += rng.gen_range(1..=max_gap_secs);
            record(t, rng.gen_range(-20.0..40.0), rng.gen_range(10.0..3000.0))
        })
        .collect()
}

pub fn backtest_config(cooldown_secs: u64, min_profit_threshold: f64) -> BacktestConfig {
    BacktestConfig {
        max_trade_volume: 1000.0,
        cooldown_secs,
        min_profit_threshold,
        reporting_threshold: 10.0,
        unit: ReferenceUnit::Fiat,
    }
}

/// Temp workspace with raw/refined directories and kraken/bitstamp profiles
pub fn create_test_workspace() -> (TempDir, Config) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let raw = temp_dir.path().join("raw");
    let refined = temp_dir.path().join("refined");
    fs::create_dir_all(&raw).unwrap();
    fs::create_dir_all(&refined).unwrap();

    let mut config = Config::default();
    config.data.raw_dir = raw;
    config.data.refined_dir = refined;
    config.data.report_path = temp_dir.path().join("backtest_results.txt");
    config.conversion = conversion_table();
    config.exchanges.insert("kraken".to_string(), profile("kraken", 0.0026, Some(0.09)));
    config.exchanges.insert("bitstamp".to_string(), profile("bitstamp", 0.0025, Some(0.9)));
    (temp_dir, config)
}

pub fn raw_path(config: &Config, file_name: &str) -> PathBuf {
    config.data.raw_dir.join(file_name)
}
