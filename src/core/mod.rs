// Core analytical pipeline: aggregation, alignment and profitability

pub mod aggregator;
pub mod cancel;
pub mod exchange;
pub mod profitability;
pub mod synchronizer;
pub mod types;

pub use aggregator::{aggregate, Level, RawOrderBook, DEFAULT_DEPTH_LIMIT};
pub use cancel::CancelToken;
pub use exchange::{Amount, ConversionTable, ExchangeProfile, ReferenceUnit};
pub use profitability::{Leg, ProfitabilityModel, ProfitabilityRecord};
pub use synchronizer::{synchronize, AlignedPairs, DEFAULT_TOLERANCE_MS};
pub use types::{AlignedPair, NumericWidth, PrecisionRules, Snapshot, Symbol};
