// Configuration management for the arbitrage backtester

use crate::backtesting::BacktestConfig;
use crate::core::exchange::{ConversionTable, ExchangeProfile};
use crate::core::{DEFAULT_DEPTH_LIMIT, DEFAULT_TOLERANCE_MS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Text,   // append-only "name":value lines
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_raw_dir")]
    pub raw_dir: PathBuf,
    #[serde(default = "default_refined_dir")]
    pub refined_dir: PathBuf,
    #[serde(default = "default_report_path")]
    pub report_path: PathBuf,
    #[serde(default = "default_report_format")]
    pub report_format: ReportFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_tolerance_ms")]
    pub tolerance_ms: i64,
    #[serde(default = "default_depth_limit")]
    pub depth_limit: usize,
    /// Base-currency cap applied to every evaluated trade
    #[serde(default)]
    pub volume_cap: Option<f64>,
    /// Upper bound on the worker pool; hardware concurrency when unset
    #[serde(default)]
    pub workers: Option<usize>,
    /// Consecutive empty books after which ingestion gives up on an instrument
    #[serde(default = "default_max_empty_books")]
    pub max_empty_books: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub backtest: BacktestConfig,
    #[serde(default)]
    pub conversion: ConversionTable,
    #[serde(default)]
    pub exchanges: BTreeMap<String, ExchangeProfile>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

// Default value functions
fn default_raw_dir() -> PathBuf { PathBuf::from("raw_data") }
fn default_refined_dir() -> PathBuf { PathBuf::from("refined_data") }
fn default_report_path() -> PathBuf { PathBuf::from("backtest_results.txt") }
fn default_report_format() -> ReportFormat { ReportFormat::Text }
fn default_tolerance_ms() -> i64 { DEFAULT_TOLERANCE_MS }
fn default_depth_limit() -> usize { DEFAULT_DEPTH_LIMIT }
fn default_max_empty_books() -> usize { 5 }
fn default_log_level() -> String { "info".to_string() }

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            raw_dir: default_raw_dir(),
            refined_dir: default_refined_dir(),
            report_path: default_report_path(),
            report_format: default_report_format(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tolerance_ms: default_tolerance_ms(),
            depth_limit: default_depth_limit(),
            volume_cap: None,
            workers: None,
            max_empty_books: default_max_empty_books(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level() }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data: DataConfig::default(),
            pipeline: PipelineConfig::default(),
            backtest: BacktestConfig::default(),
            conversion: ConversionTable::default(),
            exchanges: BTreeMap::new(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(e.to_string()))?;

        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(content)
            .map_err(|e| ConfigError::Parse(e.to_string()))?;

        // Profiles are keyed by table name; the id field is optional in the file
        for (id, profile) in config.exchanges.iter_mut() {
            if profile.id.is_empty() {
                profile.id = id.clone();
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;

        fs::write(path, content)
            .map_err(|e| ConfigError::FileWrite(e.to_string()))?;

        Ok(())
    }

    /// Load configuration or return an error pointing at `arb-bot init`
    pub fn load_or_error<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Err(ConfigError::FileNotFound(path_ref.display().to_string()));
        }

        Self::from_file(path_ref)
    }

    pub fn exchange(&self, id: &str) -> Option<&ExchangeProfile> {
        self.exchanges.get(id)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pipeline.tolerance_ms <= 0 {
            return Err(ConfigError::Validation("tolerance_ms must be positive".to_string()));
        }

        if self.pipeline.depth_limit == 0 {
            return Err(ConfigError::Validation("depth_limit must be greater than 0".to_string()));
        }

        if let Some(cap) = self.pipeline.volume_cap {
            if cap <= 0.0 {
                return Err(ConfigError::Validation("volume_cap must be positive".to_string()));
            }
        }

        if self.pipeline.workers == Some(0) {
            return Err(ConfigError::Validation("workers must be greater than 0".to_string()));
        }

        if self.backtest.max_trade_volume <= 0.0 {
            return Err(ConfigError::Validation("max_trade_volume must be positive".to_string()));
        }

        if self.backtest.min_profit_threshold < 0.0 {
            return Err(ConfigError::Validation(
                "min_profit_threshold must be non-negative".to_string(),
            ));
        }

        for (id, profile) in &self.exchanges {
            if !(0.0..1.0).contains(&profile.taker_fee) {
                return Err(ConfigError::Validation(format!(
                    "exchanges.{}.taker_fee must be a fraction in [0, 1)",
                    id
                )));
            }
            if let Some((currency, _)) = profile.withdrawal_fees.iter().find(|(_, fee)| **fee < 0.0) {
                return Err(ConfigError::Validation(format!(
                    "exchanges.{}.withdrawal_fees.{} must be non-negative",
                    id, currency
                )));
            }
        }

        let negative_rate = self
            .conversion
            .fiat_rates
            .iter()
            .chain(self.conversion.crypto_rates.iter())
            .find(|(_, rate)| **rate <= 0.0);
        if let Some((currency, _)) = negative_rate {
            return Err(ConfigError::Validation(format!(
                "conversion rate for {} must be positive",
                currency
            )));
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to read config file: {0}")]
    FileRead(String),

    #[error("Failed to write config file: {0}")]
    FileWrite(String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Failed to serialize config: {0}")]
    Serialize(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::exchange::ReferenceUnit;

    const SAMPLE: &str = r#"
[pipeline]
tolerance_ms = 30000

[backtest]
max_trade_volume = 500.0
cooldown_secs = 600
min_profit_threshold = 1.0
reporting_threshold = 5.0
unit = "crypto"

[conversion.fiat_rates]
BTC = 5000.0

[exchanges.kraken]
taker_fee = 0.0026

[exchanges.kraken.withdrawal_fees]
EUR = 0.09

[exchanges.kraken.precision."BTC/EUR"]
price = 1
amount = 8
"#;

    #[test]
    fn test_parse_sample() {
        let config = Config::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.pipeline.tolerance_ms, 30_000);
        assert_eq!(config.pipeline.depth_limit, 3);
        assert_eq!(config.backtest.unit, ReferenceUnit::Crypto);
        assert_eq!(config.backtest.cooldown_secs, 600);

        let kraken = config.exchange("kraken").unwrap();
        assert_eq!(kraken.id, "kraken");
        assert_eq!(kraken.withdrawal_fee("EUR"), Some(0.09));
        assert_eq!(config.conversion.fiat_rate("BTC"), Some(5000.0));
        assert_eq!(config.data.report_format, ReportFormat::Text);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.pipeline.tolerance_ms, DEFAULT_TOLERANCE_MS);
        assert_eq!(config.backtest.cooldown_secs, 5400);
        assert!(config.exchanges.is_empty());
    }

    #[test]
    fn test_taker_fee_bounds() {
        let config = Config::from_toml_str("[exchanges.kraken]\ntaker_fee = 0.26\n").unwrap();
        assert_eq!(config.exchange("kraken").unwrap().taker_fee, 0.26);

        let err = Config::from_toml_str("[exchanges.kraken]\ntaker_fee = 1.5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_rejects_bad_pipeline_values() {
        assert!(Config::from_toml_str("[pipeline]\ntolerance_ms = 0\n").is_err());
        assert!(Config::from_toml_str("[pipeline]\ndepth_limit = 0\n").is_err());
        assert!(Config::from_toml_str("[pipeline]\nworkers = 0\n").is_err());
        assert!(Config::from_toml_str("[backtest]\nmax_trade_volume = 0.0\n").is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load_or_error("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }
}
