//! Unified error handling for the arbitrage backtester
//!
//! Only plumbing fails with an `ArbError`. Data conditions such as empty
//! books, missing withdrawal fees or zero elapsed time are ordinary values
//! in the core and never surface here.

use std::fmt;
use std::io;

/// Main error type for the arbitrage backtester
#[derive(Debug)]
pub enum ArbError {
    // Configuration errors
    ConfigNotFound(String),
    ConfigParse(String),
    ConfigValidation(String),

    // Data errors
    FileNotFound(String),
    FileRead(String),
    FileWrite(String),
    DataFormat(String),
    DataOrdering { source: String, index: usize, previous: i64, current: i64 },
    UnknownExchange(String),

    // Database errors
    DatabaseConnection(String),
    DatabaseQuery(String),

    // Pipeline errors
    Cancelled(String),
    WorkerPool(String),
    ReportChannelClosed,

    // General errors
    Internal(String),
}

impl ArbError {
    /// Get a user-friendly error message with helpful context
    pub fn user_message(&self) -> String {
        match self {
            ArbError::ConfigNotFound(path) => {
                format!(
                    "Configuration file not found: {}\n\n\
                    💡 Quick fix:\n\
                    1. Run: arb-bot init\n\
                    2. Edit config.toml with your exchange fees and conversion rates\n\
                    3. Try again",
                    path
                )
            }
            ArbError::ConfigValidation(msg) => {
                format!(
                    "Configuration validation error: {}\n\n\
                    💡 Check config.toml for:\n\
                    - Taker fees expressed as fractions (0.0026, not 0.26)\n\
                    - Positive tolerance and trade volume\n\
                    - A non-zero depth limit",
                    msg
                )
            }
            ArbError::UnknownExchange(id) => {
                format!(
                    "No exchange profile configured for '{}'\n\n\
                    💡 Add an [exchanges.{}] table with taker_fee to config.toml",
                    id, id
                )
            }
            ArbError::DataOrdering { source, index, .. } => {
                format!(
                    "{}\n\n\
                    💡 Snapshot files must be sorted by timestamp with no duplicates.\n\
                    Inspect row {} of {}",
                    self, index, source
                )
            }
            _ => self.to_string(),
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            ArbError::ConfigNotFound(_)
            | ArbError::ConfigParse(_)
            | ArbError::ConfigValidation(_) => "config",

            ArbError::FileNotFound(_)
            | ArbError::FileRead(_)
            | ArbError::FileWrite(_) => "io",

            ArbError::DataFormat(_)
            | ArbError::DataOrdering { .. }
            | ArbError::UnknownExchange(_) => "data",

            ArbError::DatabaseConnection(_) | ArbError::DatabaseQuery(_) => "database",

            ArbError::Cancelled(_)
            | ArbError::WorkerPool(_)
            | ArbError::ReportChannelClosed => "pipeline",

            ArbError::Internal(_) => "internal",
        }
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, ArbError::Cancelled(_))
    }
}

impl fmt::Display for ArbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArbError::ConfigNotFound(path) => {
                write!(f, "Configuration file not found: {}", path)
            }
            ArbError::ConfigParse(msg) => {
                write!(f, "Configuration parse error: {}", msg)
            }
            ArbError::ConfigValidation(msg) => {
                write!(f, "Configuration validation error: {}", msg)
            }

            ArbError::FileNotFound(path) => {
                write!(f, "File not found: {}", path)
            }
            ArbError::FileRead(msg) => {
                write!(f, "File read error: {}", msg)
            }
            ArbError::FileWrite(msg) => {
                write!(f, "File write error: {}", msg)
            }
            ArbError::DataFormat(msg) => {
                write!(f, "Malformed data: {}", msg)
            }
            ArbError::DataOrdering { source, index, previous, current } => {
                write!(
                    f,
                    "Timestamps not strictly increasing in {} at row {}: {} followed by {}",
                    source, index, previous, current
                )
            }
            ArbError::UnknownExchange(id) => {
                write!(f, "Unknown exchange: {}", id)
            }

            ArbError::DatabaseConnection(msg) => {
                write!(f, "Database connection error: {}", msg)
            }
            ArbError::DatabaseQuery(msg) => {
                write!(f, "Database query error: {}", msg)
            }

            ArbError::Cancelled(what) => {
                write!(f, "Cancelled: {}", what)
            }
            ArbError::WorkerPool(msg) => {
                write!(f, "Worker pool error: {}", msg)
            }
            ArbError::ReportChannelClosed => {
                write!(f, "Report writer is no longer accepting results")
            }

            ArbError::Internal(msg) => {
                write!(f, "Internal error: {}", msg)
            }
        }
    }
}

impl std::error::Error for ArbError {}

// Conversion implementations for common error types

impl From<io::Error> for ArbError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => ArbError::FileNotFound(err.to_string()),
            io::ErrorKind::PermissionDenied => ArbError::FileRead(err.to_string()),
            _ => ArbError::Internal(format!("IO error: {}", err)),
        }
    }
}

impl From<rusqlite::Error> for ArbError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(_, Some(msg)) => ArbError::DatabaseQuery(msg),
            rusqlite::Error::QueryReturnedNoRows => {
                ArbError::DatabaseQuery("Query returned no rows".to_string())
            }
            _ => ArbError::DatabaseQuery(err.to_string()),
        }
    }
}

impl From<polars::prelude::PolarsError> for ArbError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        use polars::prelude::PolarsError;
        match err {
            PolarsError::Io(io_err) => ArbError::from(io_err),
            PolarsError::ColumnNotFound(msg) => {
                ArbError::DataFormat(format!("missing column {}", msg))
            }
            other => ArbError::DataFormat(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ArbError {
    fn from(err: serde_json::Error) -> Self {
        ArbError::DataFormat(format!("JSON parse error: {}", err))
    }
}

impl From<toml::de::Error> for ArbError {
    fn from(err: toml::de::Error) -> Self {
        ArbError::ConfigParse(format!("TOML parse error: {}", err))
    }
}

impl From<crate::config::ConfigError> for ArbError {
    fn from(err: crate::config::ConfigError) -> Self {
        use crate::config::ConfigError;
        match err {
            ConfigError::FileNotFound(path) => ArbError::ConfigNotFound(path),
            ConfigError::FileRead(msg) => ArbError::FileRead(msg),
            ConfigError::FileWrite(msg) => ArbError::FileWrite(msg),
            ConfigError::Parse(msg) => ArbError::ConfigParse(msg),
            ConfigError::Serialize(msg) => ArbError::Internal(msg),
            ConfigError::Validation(msg) => ArbError::ConfigValidation(msg),
        }
    }
}

impl From<String> for ArbError {
    fn from(msg: String) -> Self {
        ArbError::Internal(msg)
    }
}

impl From<&str> for ArbError {
    fn from(msg: &str) -> Self {
        ArbError::Internal(msg.to_string())
    }
}

/// Result type alias using ArbError
pub type ArbResult<T> = Result<T, ArbError>;
