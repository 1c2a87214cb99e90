// Backtesting data structures and types

pub mod simulator;

use crate::core::exchange::ReferenceUnit;
use crate::core::profitability::ProfitabilityRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use simulator::{normalize_to_day, BacktestSimulator};

/// Minutes in the fixed time base results are normalized to
pub const MINUTES_PER_DAY: f64 = 1440.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    /// Largest outlay per trade, in `unit`
    pub max_trade_volume: f64,
    /// Minimum time between two realized trades
    pub cooldown_secs: u64,
    /// A trade is realized only when its capped profit exceeds this
    pub min_profit_threshold: f64,
    /// Results whose normalized profit does not exceed this are discarded
    pub reporting_threshold: f64,
    /// Unit profits and `max_trade_volume` are measured in
    pub unit: ReferenceUnit,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            max_trade_volume: 1000.0,
            cooldown_secs: 90 * 60,
            min_profit_threshold: 0.0,
            reporting_threshold: 10.0,
            unit: ReferenceUnit::Fiat,
        }
    }
}

impl BacktestConfig {
    pub fn cooldown_ms(&self) -> i64 {
        i64::try_from(self.cooldown_secs.saturating_mul(1000)).unwrap_or(i64::MAX)
    }
}

/// Which venue is bought on and which is sold on
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TradeDirection {
    pub buy_exchange: String,
    pub sell_exchange: String,
}

impl TradeDirection {
    pub fn new(buy_exchange: impl Into<String>, sell_exchange: impl Into<String>) -> Self {
        Self {
            buy_exchange: buy_exchange.into(),
            sell_exchange: sell_exchange.into(),
        }
    }

    pub fn reversed(&self) -> Self {
        Self::new(self.sell_exchange.clone(), self.buy_exchange.clone())
    }

    pub fn matches(&self, record: &ProfitabilityRecord) -> bool {
        record.buy_exchange == self.buy_exchange && record.sell_exchange == self.sell_exchange
    }

    /// Records of this direction, order preserved
    pub fn select(&self, records: &[ProfitabilityRecord]) -> Vec<ProfitabilityRecord> {
        records.iter().filter(|r| self.matches(r)).cloned().collect()
    }
}

impl fmt::Display for TradeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.buy_exchange, self.sell_exchange)
    }
}

/// A realized trade, timed relative to the first one
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfitSample {
    pub elapsed_minutes: f64,
    pub profit: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub profit_series: Vec<ProfitSample>,
    pub cumulative_profit: f64,
    /// `None` when fewer than two distinct sample times exist
    pub cumulative_profit_normalized: Option<f64>,
    pub elapsed_minutes_total: Option<f64>,
    pub trades: usize,
    pub records_evaluated: usize,
    /// Absolute time of the first realized trade, ms
    pub first_timestamp: Option<i64>,
    /// Stopped early; the series up to that point is still valid
    pub cancelled: bool,
}

impl BacktestResult {
    /// Whether this result belongs in the report
    pub fn qualifies_for_report(&self, reporting_threshold: f64) -> bool {
        !self.cancelled
            && self
                .cumulative_profit_normalized
                .map_or(false, |normalized| normalized > reporting_threshold)
    }

    pub fn average_profit(&self) -> Option<f64> {
        if self.trades == 0 {
            None
        } else {
            Some(self.cumulative_profit / self.trades as f64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::exchange::Amount;

    fn record(buy: &str, sell: &str) -> ProfitabilityRecord {
        let zero = Amount { quote: 0.0, fiat: Some(0.0), crypto: Some(0.0) };
        ProfitabilityRecord {
            timestamp: 0,
            buy_exchange: buy.to_string(),
            sell_exchange: sell.to_string(),
            trade_volume: 0.0,
            max_initial_amount: zero,
            gross_profit: zero,
            percent_gross_profit: None,
            net_profit: None,
            percent_net_profit: None,
        }
    }

    #[test]
    fn test_default_config() {
        let config = BacktestConfig::default();
        assert_eq!(config.cooldown_ms(), 5_400_000);
        assert_eq!(config.max_trade_volume, 1000.0);
    }

    #[test]
    fn test_direction_selection() {
        let records = vec![record("a", "b"), record("b", "a"), record("a", "b")];
        let direction = TradeDirection::new("a", "b");
        assert_eq!(direction.select(&records).len(), 2);
        assert_eq!(direction.reversed().select(&records).len(), 1);
        assert_eq!(direction.to_string(), "a->b");
    }

    #[test]
    fn test_report_qualification() {
        let mut result = BacktestResult {
            profit_series: Vec::new(),
            cumulative_profit: 100.0,
            cumulative_profit_normalized: Some(200.0),
            elapsed_minutes_total: Some(720.0),
            trades: 4,
            records_evaluated: 10,
            first_timestamp: Some(0),
            cancelled: false,
        };
        assert!(result.qualifies_for_report(10.0));
        assert!(!result.qualifies_for_report(200.0));
        assert_eq!(result.average_profit(), Some(25.0));

        result.cancelled = true;
        assert!(!result.qualifies_for_report(10.0));

        result.cancelled = false;
        result.cumulative_profit_normalized = None;
        assert!(!result.qualifies_for_report(-1.0));
    }
}
