// Backtest Simulator
// Walks profitability records, realizing trades under a cooldown policy

use crate::backtesting::{BacktestConfig, BacktestResult, ProfitSample, MINUTES_PER_DAY};
use crate::core::cancel::CancelToken;
use crate::core::profitability::ProfitabilityRecord;
use tracing::debug;

/// Scale a cumulative profit earned over `elapsed_minutes` to a 24h basis.
/// Zero or negative elapsed time has no meaningful rate.
pub fn normalize_to_day(cumulative_profit: f64, elapsed_minutes: f64) -> Option<f64> {
    if elapsed_minutes > 0.0 && elapsed_minutes.is_finite() {
        Some(cumulative_profit * (MINUTES_PER_DAY / elapsed_minutes))
    } else {
        None
    }
}

fn minutes_between(from_ms: i64, to_ms: i64) -> f64 {
    let minutes = (to_ms - from_ms) as f64 / 60_000.0;
    (minutes * 100.0).round() / 100.0
}

/// Running totals, owned by a single simulation
#[derive(Debug, Default)]
struct BacktestState {
    cumulative_profit: f64,
    samples: Vec<(i64, f64)>,
}

impl BacktestState {
    fn realize(&mut self, timestamp: i64, profit: f64) {
        self.cumulative_profit += profit;
        self.samples.push((timestamp, profit));
    }
}

#[derive(Debug, Clone)]
pub struct BacktestSimulator {
    config: BacktestConfig,
}

impl BacktestSimulator {
    pub fn new(config: BacktestConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Profit of a record limited to what `max_trade_volume` could earn.
    /// Profit scales linearly with outlay, so a larger opportunity is scaled
    /// down to the cap. `None` when the record has no value in the configured unit.
    pub fn capped_profit(&self, record: &ProfitabilityRecord) -> Option<f64> {
        let unit = self.config.unit;
        let profit = record.realizable_profit().in_unit(unit)?;
        let outlay = record.max_initial_amount.in_unit(unit)?;

        if outlay > self.config.max_trade_volume && outlay > 0.0 {
            let at_cap = profit * (self.config.max_trade_volume / outlay);
            Some(profit.min(at_cap))
        } else {
            Some(profit)
        }
    }

    pub fn run(&self, records: &[ProfitabilityRecord]) -> BacktestResult {
        self.run_with_cancel(records, &CancelToken::new())
    }

    /// Records must be ordered by timestamp. The token is polled before each
    /// evaluated record; on cancellation the partial result is returned.
    pub fn run_with_cancel(&self, records: &[ProfitabilityRecord], cancel: &CancelToken) -> BacktestResult {
        let cooldown_ms = self.config.cooldown_ms();
        let mut state = BacktestState::default();
        let mut evaluated = 0usize;
        let mut cancelled = false;
        let mut cursor = 0usize;

        while let Some(record) = records.get(cursor) {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            evaluated += 1;

            let realized = self
                .capped_profit(record)
                .filter(|&profit| profit > self.config.min_profit_threshold);

            match realized {
                Some(profit) => {
                    state.realize(record.timestamp, profit);
                    let resume_at = record.timestamp.saturating_add(cooldown_ms);
                    let rest = &records[cursor + 1..];
                    cursor += 1 + rest.partition_point(|r| r.timestamp < resume_at);
                }
                None => cursor += 1,
            }
        }

        if cancelled {
            debug!(evaluated, trades = state.samples.len(), "Backtest cancelled");
        }

        self.finish(state, evaluated, cancelled)
    }

    fn finish(&self, state: BacktestState, records_evaluated: usize, cancelled: bool) -> BacktestResult {
        let first_timestamp = state.samples.first().map(|&(t, _)| t);

        let profit_series: Vec<ProfitSample> = match first_timestamp {
            Some(t0) => state
                .samples
                .iter()
                .map(|&(t, profit)| ProfitSample {
                    elapsed_minutes: minutes_between(t0, t),
                    profit,
                })
                .collect(),
            None => Vec::new(),
        };

        let elapsed_minutes_total = profit_series.last().map(|s| s.elapsed_minutes);
        let cumulative_profit_normalized =
            elapsed_minutes_total.and_then(|minutes| normalize_to_day(state.cumulative_profit, minutes));

        BacktestResult {
            trades: profit_series.len(),
            profit_series,
            cumulative_profit: state.cumulative_profit,
            cumulative_profit_normalized,
            elapsed_minutes_total,
            records_evaluated,
            first_timestamp,
            cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::exchange::{Amount, ReferenceUnit};

    fn amount(v: f64) -> Amount {
        Amount { quote: v, fiat: Some(v), crypto: None }
    }

    fn record(timestamp_secs: i64, profit: f64, outlay: f64) -> ProfitabilityRecord {
        ProfitabilityRecord {
            timestamp: timestamp_secs * 1000,
            buy_exchange: "a".to_string(),
            sell_exchange: "b".to_string(),
            trade_volume: 1.0,
            max_initial_amount: amount(outlay),
            gross_profit: amount(profit),
            percent_gross_profit: Some(profit / outlay * 100.0),
            net_profit: None,
            percent_net_profit: None,
        }
    }

    fn config(cooldown_secs: u64, min_profit_threshold: f64) -> BacktestConfig {
        BacktestConfig {
            max_trade_volume: 1000.0,
            cooldown_secs,
            min_profit_threshold,
            reporting_threshold: 10.0,
            unit: ReferenceUnit::Fiat,
        }
    }

    #[test]
    fn test_below_threshold_is_not_realized() {
        let sim = BacktestSimulator::new(config(0, 10.0));
        let result = sim.run(&[record(0, 5.0, 100.0)]);
        assert_eq!(result.trades, 0);
        assert_eq!(result.cumulative_profit, 0.0);
        assert_eq!(result.records_evaluated, 1);
        assert_eq!(result.cumulative_profit_normalized, None);
    }

    #[test]
    fn test_cooldown_skips_records() {
        let sim = BacktestSimulator::new(config(5400, 0.0));
        let records = vec![
            record(0, 1.0, 100.0),
            record(3000, 50.0, 100.0),
            record(5400, 2.0, 100.0),
        ];
        let result = sim.run(&records);
        assert_eq!(result.trades, 2);
        assert_eq!(result.records_evaluated, 2);
        assert_eq!(result.cumulative_profit, 3.0);
        assert_eq!(result.profit_series[1].elapsed_minutes, 90.0);
    }

    #[test]
    fn test_unprofitable_record_advances_by_one() {
        let sim = BacktestSimulator::new(config(5400, 0.0));
        let records = vec![record(0, -1.0, 100.0), record(10, 1.0, 100.0)];
        let result = sim.run(&records);
        assert_eq!(result.trades, 1);
        assert_eq!(result.first_timestamp, Some(10_000));
    }

    #[test]
    fn test_profit_is_capped_by_trade_volume() {
        let sim = BacktestSimulator::new(config(0, 0.0));
        // 40 profit on a 4000 outlay is 10 at the 1000 cap
        assert_eq!(sim.capped_profit(&record(0, 40.0, 4000.0)), Some(10.0));
        assert_eq!(sim.capped_profit(&record(0, 5.0, 500.0)), Some(5.0));
    }

    #[test]
    fn test_missing_unit_value_is_skipped() {
        let mut cfg = config(0, 0.0);
        cfg.unit = ReferenceUnit::Crypto;
        let sim = BacktestSimulator::new(cfg);
        let result = sim.run(&[record(0, 5.0, 100.0)]);
        assert_eq!(result.trades, 0);
    }

    #[test]
    fn test_normalization() {
        assert_eq!(normalize_to_day(100.0, 720.0), Some(200.0));
        assert_eq!(normalize_to_day(100.0, 0.0), None);

        let sim = BacktestSimulator::new(config(0, 0.0));
        let records = vec![record(0, 50.0, 100.0), record(720 * 60, 50.0, 100.0)];
        let result = sim.run(&records);
        assert_eq!(result.elapsed_minutes_total, Some(720.0));
        assert_eq!(result.cumulative_profit_normalized, Some(200.0));
    }

    #[test]
    fn test_single_trade_has_no_normalized_profit() {
        let sim = BacktestSimulator::new(config(0, 0.0));
        let result = sim.run(&[record(0, 50.0, 100.0)]);
        assert_eq!(result.cumulative_profit, 50.0);
        assert_eq!(result.elapsed_minutes_total, Some(0.0));
        assert_eq!(result.cumulative_profit_normalized, None);
    }

    #[test]
    fn test_cancelled_run_returns_partial_result() {
        let sim = BacktestSimulator::new(config(0, 0.0));
        let token = CancelToken::new();
        token.cancel();
        let result = sim.run_with_cancel(&[record(0, 50.0, 100.0)], &token);
        assert!(result.cancelled);
        assert_eq!(result.records_evaluated, 0);
        assert!(result.profit_series.is_empty());
    }
}
