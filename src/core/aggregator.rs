// Snapshot Aggregator
// Condenses raw L2 levels into one volume-weighted top-of-book sample

use crate::core::types::{round_to, PrecisionRules, Snapshot};
use serde::{Deserialize, Serialize};

/// Number of levels weighted on each side unless configured otherwise
pub const DEFAULT_DEPTH_LIMIT: usize = 3;

/// A single (price, volume) level as recorded from an exchange
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Level(pub f64, pub f64);

impl Level {
    pub fn price(&self) -> f64 {
        self.0
    }

    pub fn volume(&self) -> f64 {
        self.1
    }
}

/// Raw order book as delivered by the collector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawOrderBook {
    pub timestamp: i64,
    #[serde(default)]
    pub bids: Vec<Level>,
    #[serde(default)]
    pub asks: Vec<Level>,
}

/// Total volume and volume-weighted price over the first `depth` levels.
/// Zero volume gives a weighted price of zero.
pub fn weighted_side(levels: &[Level], depth: usize) -> (f64, f64) {
    let top = &levels[..levels.len().min(depth)];
    let volume: f64 = top.iter().map(Level::volume).sum();
    if volume <= 0.0 {
        return (0.0, 0.0);
    }
    let notional: f64 = top.iter().map(|l| l.price() * l.volume()).sum();
    (volume, notional / volume)
}

/// Build a snapshot from the top `depth` levels of each side, rounded to the
/// exchange's precision. A side with no volume yields the empty sentinel.
pub fn aggregate(
    timestamp: i64,
    bids: &[Level],
    asks: &[Level],
    depth: usize,
    precision: PrecisionRules,
) -> Snapshot {
    let (bid_volume, bid_price) = weighted_side(bids, depth);
    let (ask_volume, ask_price) = weighted_side(asks, depth);

    Snapshot {
        timestamp,
        bid_price: round_to(bid_price, precision.price),
        bid_volume: round_to(bid_volume, precision.amount),
        ask_price: round_to(ask_price, precision.price),
        ask_volume: round_to(ask_volume, precision.amount),
        precision,
    }
}

impl RawOrderBook {
    pub fn to_snapshot(&self, depth: usize, precision: PrecisionRules) -> Snapshot {
        aggregate(self.timestamp, &self.bids, &self.asks, depth, precision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels(raw: &[(f64, f64)]) -> Vec<Level> {
        raw.iter().map(|&(p, v)| Level(p, v)).collect()
    }

    #[test]
    fn test_weighted_price_uses_top_levels_only() {
        let bids = levels(&[(100.0, 1.0), (99.0, 1.0), (98.0, 2.0), (10.0, 100.0)]);
        let (volume, price) = weighted_side(&bids, 3);
        assert_eq!(volume, 4.0);
        assert!((price - 98.75).abs() < 1e-12); // (100 + 99 + 196) / 4
    }

    #[test]
    fn test_zero_volume_side() {
        let (volume, price) = weighted_side(&[], 3);
        assert_eq!((volume, price), (0.0, 0.0));

        let zero = levels(&[(100.0, 0.0)]);
        assert_eq!(weighted_side(&zero, 3), (0.0, 0.0));
    }

    #[test]
    fn test_aggregate_rounds_to_precision() {
        let bids = levels(&[(100.123, 1.0), (100.0, 2.0)]);
        let asks = levels(&[(101.0, 0.333333), (102.0, 0.666667)]);
        let snapshot = aggregate(1000, &bids, &asks, 3, PrecisionRules::new(2, 3));

        assert_eq!(snapshot.timestamp, 1000);
        assert_eq!(snapshot.bid_price, 100.04);
        assert_eq!(snapshot.bid_volume, 3.0);
        assert_eq!(snapshot.ask_price, 101.67);
        assert_eq!(snapshot.ask_volume, 1.0);
        assert!(!snapshot.is_empty());
    }

    #[test]
    fn test_one_sided_book_is_empty() {
        let bids = levels(&[(100.0, 1.0)]);
        let snapshot = aggregate(5, &bids, &[], 3, PrecisionRules::default());
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.ask_price, 0.0);
        assert_eq!(snapshot.bid_price, 100.0);
    }

    #[test]
    fn test_raw_book_deserializes_level_arrays() {
        let json = r#"{"timestamp": 42, "bids": [[100.0, 1.5]], "asks": [[101.0, 2.0]]}"#;
        let book: RawOrderBook = serde_json::from_str(json).unwrap();
        let snapshot = book.to_snapshot(DEFAULT_DEPTH_LIMIT, PrecisionRules::default());
        assert_eq!(snapshot.bid_volume, 1.5);
        assert_eq!(snapshot.ask_price, 101.0);
    }
}
