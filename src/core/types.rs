// Common types shared by the aggregation, synchronization and profitability stages

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fallback decimals used whenever an exchange reports unusable precision metadata
pub const DEFAULT_PRECISION: u32 = 8;

/// Precisions at or above this many decimals need the wide float representation
pub const WIDE_PRECISION_THRESHOLD: u32 = 7;

/// Decimal precision an exchange quotes prices and amounts with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrecisionRules {
    pub price: u32,
    pub amount: u32,
}

impl Default for PrecisionRules {
    fn default() -> Self {
        Self {
            price: DEFAULT_PRECISION,
            amount: DEFAULT_PRECISION,
        }
    }
}

impl PrecisionRules {
    pub fn new(price: u32, amount: u32) -> Self {
        Self { price, amount }
    }

    /// Resolve raw market metadata of the form `{ price = <int>, amount = <int> }`.
    ///
    /// Anything other than two non-negative integers yields the default for both
    /// fields; a half-valid entry is not trusted.
    pub fn from_metadata(raw: Option<&toml::Value>) -> Self {
        let table = match raw.and_then(|v| v.as_table()) {
            Some(table) => table,
            None => return Self::default(),
        };

        let field = |name: &str| {
            table
                .get(name)
                .and_then(|v| v.as_integer())
                .and_then(|n| u32::try_from(n).ok())
        };

        match (field("price"), field("amount")) {
            (Some(price), Some(amount)) => Self { price, amount },
            _ => Self::default(),
        }
    }

    pub fn price_width(&self) -> NumericWidth {
        NumericWidth::for_precision(self.price)
    }

    pub fn volume_width(&self) -> NumericWidth {
        NumericWidth::for_precision(self.amount)
    }
}

/// Storage width for a numeric column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NumericWidth {
    Narrow, // f32 is exact enough below 7 decimals
    Wide,
}

impl NumericWidth {
    pub fn for_precision(decimals: u32) -> Self {
        if decimals < WIDE_PRECISION_THRESHOLD {
            NumericWidth::Narrow
        } else {
            NumericWidth::Wide
        }
    }
}

/// Round to a fixed number of decimals
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals.min(15) as i32);
    (value * factor).round() / factor
}

/// Volume-weighted top-of-book sample for one exchange at one instant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Milliseconds since the epoch
    pub timestamp: i64,
    pub bid_price: f64,
    pub bid_volume: f64,
    pub ask_price: f64,
    pub ask_volume: f64,
    pub precision: PrecisionRules,
}

impl Snapshot {
    /// The "no liquidity" sentinel
    pub fn empty(timestamp: i64, precision: PrecisionRules) -> Self {
        Self {
            timestamp,
            bid_price: 0.0,
            bid_volume: 0.0,
            ask_price: 0.0,
            ask_volume: 0.0,
            precision,
        }
    }

    /// True when either side of the book carried no volume
    pub fn is_empty(&self) -> bool {
        self.bid_volume <= 0.0 || self.ask_volume <= 0.0
    }

    pub fn spread(&self) -> Option<f64> {
        if self.is_empty() {
            None
        } else {
            Some(self.ask_price - self.bid_price)
        }
    }
}

/// A traded instrument such as BTC/EUR
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Symbol {
    pub base: String,
    pub quote: String,
}

impl Symbol {
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            quote: quote.into(),
        }
    }

    /// Parse "BTC/EUR" or "BTC_EUR"
    pub fn parse(raw: &str) -> Option<Self> {
        let (base, quote) = raw.split_once('/').or_else(|| raw.split_once('_'))?;
        if base.is_empty() || quote.is_empty() || quote.contains(['/', '_']) {
            return None;
        }
        Some(Self::new(base, quote))
    }

    /// Filesystem-safe form, "BTC_EUR"
    pub fn file_stem(&self) -> String {
        format!("{}_{}", self.base, self.quote)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

/// Two snapshots from different exchanges taken close enough together to compare
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignedPair {
    pub snapshot_a: Snapshot,
    pub snapshot_b: Snapshot,
    /// Midpoint of the two source timestamps
    pub timestamp: i64,
}

impl AlignedPair {
    pub fn new(snapshot_a: Snapshot, snapshot_b: Snapshot) -> Self {
        let timestamp = snapshot_a.timestamp + (snapshot_b.timestamp - snapshot_a.timestamp) / 2;
        Self {
            snapshot_a,
            snapshot_b,
            timestamp,
        }
    }

    pub fn skew_ms(&self) -> i64 {
        (self.snapshot_a.timestamp - self.snapshot_b.timestamp).abs()
    }
}
