// Refined profitability datasets
// One row per aligned pair; reference-unit columns are empty when no rate was known

use crate::core::exchange::Amount;
use crate::core::profitability::ProfitabilityRecord;
use crate::error::{ArbError, ArbResult};
use crate::store::{f64_column, i64_column, read_frame, required, string_column, write_frame};
use polars::prelude::*;
use serde::Serialize;
use std::path::Path;

fn amount_columns(prefix: &str, amounts: &[Option<Amount>]) -> [Series; 3] {
    let quote: Vec<Option<f64>> = amounts.iter().map(|a| a.map(|a| a.quote)).collect();
    let fiat: Vec<Option<f64>> = amounts.iter().map(|a| a.and_then(|a| a.fiat)).collect();
    let crypto: Vec<Option<f64>> = amounts.iter().map(|a| a.and_then(|a| a.crypto)).collect();
    [
        Series::new(prefix, quote),
        Series::new(&format!("{}_fiat", prefix), fiat),
        Series::new(&format!("{}_crypto", prefix), crypto),
    ]
}

fn records_to_frame(records: &[ProfitabilityRecord]) -> ArbResult<DataFrame> {
    let timestamps: Vec<i64> = records.iter().map(|r| r.timestamp).collect();
    let buys: Vec<&str> = records.iter().map(|r| r.buy_exchange.as_str()).collect();
    let sells: Vec<&str> = records.iter().map(|r| r.sell_exchange.as_str()).collect();
    let volumes: Vec<f64> = records.iter().map(|r| r.trade_volume).collect();
    let outlays: Vec<Option<Amount>> = records.iter().map(|r| Some(r.max_initial_amount)).collect();
    let gross: Vec<Option<Amount>> = records.iter().map(|r| Some(r.gross_profit)).collect();
    let net: Vec<Option<Amount>> = records.iter().map(|r| r.net_profit).collect();
    let gross_pct: Vec<Option<f64>> = records.iter().map(|r| r.percent_gross_profit).collect();
    let net_pct: Vec<Option<f64>> = records.iter().map(|r| r.percent_net_profit).collect();

    let mut columns = vec![
        Series::new("timestamp", timestamps),
        Series::new("buy_exchange", buys),
        Series::new("sell_exchange", sells),
        Series::new("trade_volume", volumes),
    ];
    columns.extend(amount_columns("max_initial_amount", &outlays));
    columns.extend(amount_columns("gross_profit", &gross));
    columns.push(Series::new("percent_gross_profit", gross_pct));
    columns.extend(amount_columns("net_profit", &net));
    columns.push(Series::new("percent_net_profit", net_pct));

    Ok(DataFrame::new(columns)?)
}

/// Replace `path` with the given records
pub fn write_records(path: &Path, records: &[ProfitabilityRecord]) -> ArbResult<()> {
    let mut frame = records_to_frame(records)?;
    write_frame(path, &mut frame, false)
}

struct AmountColumns {
    quote: Vec<Option<f64>>,
    fiat: Vec<Option<f64>>,
    crypto: Vec<Option<f64>>,
}

impl AmountColumns {
    fn read(frame: &DataFrame, prefix: &str) -> ArbResult<Self> {
        Ok(Self {
            quote: f64_column(frame, prefix)?,
            fiat: f64_column(frame, &format!("{}_fiat", prefix))?,
            crypto: f64_column(frame, &format!("{}_crypto", prefix))?,
        })
    }

    fn at(&self, row: usize) -> Option<Amount> {
        self.quote[row].map(|quote| Amount {
            quote,
            fiat: self.fiat[row],
            crypto: self.crypto[row],
        })
    }
}

/// Load a refined dataset in file order
pub fn read_records(path: &Path) -> ArbResult<Vec<ProfitabilityRecord>> {
    let frame = read_frame(path)?;

    let timestamps = i64_column(&frame, "timestamp")?;
    let buys = string_column(&frame, "buy_exchange")?;
    let sells = string_column(&frame, "sell_exchange")?;
    let volumes = f64_column(&frame, "trade_volume")?;
    let outlays = AmountColumns::read(&frame, "max_initial_amount")?;
    let gross = AmountColumns::read(&frame, "gross_profit")?;
    let net = AmountColumns::read(&frame, "net_profit")?;
    let gross_pct = f64_column(&frame, "percent_gross_profit")?;
    let net_pct = f64_column(&frame, "percent_net_profit")?;

    let mut records = Vec::with_capacity(frame.height());
    for row in 0..frame.height() {
        records.push(ProfitabilityRecord {
            timestamp: required(timestamps[row], path, "timestamp", row)?,
            buy_exchange: required(buys[row].clone(), path, "buy_exchange", row)?,
            sell_exchange: required(sells[row].clone(), path, "sell_exchange", row)?,
            trade_volume: required(volumes[row], path, "trade_volume", row)?,
            max_initial_amount: required(outlays.at(row), path, "max_initial_amount", row)?,
            gross_profit: required(gross.at(row), path, "gross_profit", row)?,
            percent_gross_profit: gross_pct[row],
            net_profit: net.at(row),
            percent_net_profit: net_pct[row],
        });
    }
    Ok(records)
}

/// Column statistics over a refined dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordStats {
    pub rows: usize,
    pub profitable: usize,
    pub mean_gross_profit: Option<f64>,
    pub max_gross_profit: Option<f64>,
    pub first_timestamp: Option<i64>,
    pub last_timestamp: Option<i64>,
}

fn first_cell<T>(values: Vec<Option<T>>) -> Option<T> {
    values.into_iter().next().flatten()
}

/// Summarize a refined dataset without materializing its records
pub fn summarize_records(path: &Path) -> ArbResult<RecordStats> {
    if !path.exists() {
        return Err(ArbError::FileNotFound(path.display().to_string()));
    }

    let gross = || col("gross_profit").cast(DataType::Float64);
    let stats = LazyCsvReader::new(path)
        .has_header(true)
        .finish()?
        .select([
            col("timestamp").count().alias("rows"),
            gross().filter(gross().gt(lit(0.0))).count().alias("profitable"),
            gross().mean().alias("mean_gross_profit"),
            gross().max().alias("max_gross_profit"),
            col("timestamp").cast(DataType::Int64).min().alias("first_timestamp"),
            col("timestamp").cast(DataType::Int64).max().alias("last_timestamp"),
        ])
        .collect()?;

    let count = |name: &str| -> ArbResult<usize> {
        let value = first_cell(i64_column(&stats, name)?).unwrap_or(0);
        Ok(usize::try_from(value).unwrap_or(0))
    };

    Ok(RecordStats {
        rows: count("rows")?,
        profitable: count("profitable")?,
        mean_gross_profit: first_cell(f64_column(&stats, "mean_gross_profit")?),
        max_gross_profit: first_cell(f64_column(&stats, "max_gross_profit")?),
        first_timestamp: first_cell(i64_column(&stats, "first_timestamp")?),
        last_timestamp: first_cell(i64_column(&stats, "last_timestamp")?),
    })
}
