// Arbitrage Backtester Library
//
// Offline cross-exchange arbitrage analytics: snapshot aggregation, stream
// alignment, fee-aware profitability and cooldown-driven backtesting

pub mod backtesting;
pub mod config;
pub mod core;
pub mod db;          // SQLite report storage
pub mod error;       // Unified error handling
pub mod pipeline;
pub mod progress;
pub mod store;       // Snapshot and refined dataset files
pub mod validation;  // Pre-flight validation

// Re-export core types
pub use self::core::{
    aggregate, synchronize, AlignedPair, AlignedPairs, Amount, CancelToken, ConversionTable,
    ExchangeProfile, Level, PrecisionRules, ProfitabilityModel, ProfitabilityRecord, RawOrderBook,
    ReferenceUnit, Snapshot, Symbol,
};

// Re-export error types
pub use error::{ArbError, ArbResult};

// Re-export validation types
pub use validation::{PreFlightValidator, ValidationCheck, ValidationLevel, ValidationResult};

// Re-export configuration
pub use config::{Config, ConfigError, DataConfig, LoggingConfig, PipelineConfig, ReportFormat};

// Re-export database types
pub use db::{BacktestReport, Database};

// Re-export backtesting components
pub use backtesting::{
    normalize_to_day, BacktestConfig, BacktestResult, BacktestSimulator, ProfitSample, TradeDirection,
};

// Re-export pipeline components
pub use pipeline::{
    PipelineOutcome, PipelineRunner, PipelineSpec, PipelineStatus, ReportEntry, ReportSink, RunSummary,
    Stage,
};

// Re-export progress utilities
pub use progress::{PipelineProgress, Spinner};
