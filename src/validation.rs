//! Pre-flight validation for pipeline runs
//!
//! Checks data directories, exchange profiles, conversion rates and the
//! report sink before any pipeline is scheduled.

use crate::config::{Config, ReportFormat};
use crate::core::exchange::ReferenceUnit;
use crate::db::Database;
use crate::store;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{error, info, warn};

/// Validation result with detailed findings
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub passed: bool,
    pub checks: Vec<ValidationCheck>,
}

#[derive(Debug, Clone)]
pub struct ValidationCheck {
    pub name: String,
    pub passed: bool,
    pub message: String,
    pub level: ValidationLevel,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationLevel {
    Critical, // Must pass for the run to proceed
    Warning,  // Affected pipelines fail or lose fields; others still run
    Info,
}

impl ValidationCheck {
    fn ok(name: &str, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            passed: true,
            message: message.into(),
            level: ValidationLevel::Info,
        }
    }

    fn failed(name: &str, message: impl Into<String>, level: ValidationLevel) -> Self {
        Self {
            name: name.to_string(),
            passed: false,
            message: message.into(),
            level,
        }
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationResult {
    pub fn new() -> Self {
        ValidationResult {
            passed: true,
            checks: Vec::new(),
        }
    }

    pub fn add_check(&mut self, check: ValidationCheck) {
        if !check.passed && check.level == ValidationLevel::Critical {
            self.passed = false;
        }
        self.checks.push(check);
    }

    pub fn critical_failures(&self) -> Vec<&ValidationCheck> {
        self.checks
            .iter()
            .filter(|c| !c.passed && c.level == ValidationLevel::Critical)
            .collect()
    }

    pub fn warnings(&self) -> Vec<&ValidationCheck> {
        self.checks
            .iter()
            .filter(|c| !c.passed && c.level == ValidationLevel::Warning)
            .collect()
    }

    pub fn display(&self) {
        info!("🔍 Pre-flight Validation");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        for check in &self.checks {
            let icon = if check.passed {
                "✅"
            } else {
                match check.level {
                    ValidationLevel::Critical => "❌",
                    ValidationLevel::Warning => "⚠️",
                    ValidationLevel::Info => "ℹ️",
                }
            };

            info!("{} {} - {}", icon, check.name, check.message);
        }

        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        if !self.passed {
            let failures = self.critical_failures();
            error!("❌ Validation failed: {} critical issue(s)", failures.len());
            for failure in failures {
                error!("   • {}: {}", failure.name, failure.message);
            }
        } else {
            let warnings = self.warnings();
            if !warnings.is_empty() {
                warn!("⚠️  {} warning(s) detected", warnings.len());
                for warning in warnings {
                    warn!("   • {}: {}", warning.name, warning.message);
                }
            }
            info!("✅ All critical checks passed");
        }
    }
}

/// Pre-flight validator for pipeline runs
pub struct PreFlightValidator<'a> {
    config: &'a Config,
}

impl<'a> PreFlightValidator<'a> {
    pub fn new(config: &'a Config) -> Self {
        PreFlightValidator { config }
    }

    /// Checks needed before refining raw series
    pub fn validate_for_refine(&self) -> ValidationResult {
        let mut result = ValidationResult::new();
        result.add_check(self.check_directory("Raw data", &self.config.data.raw_dir, ValidationLevel::Critical));

        let sources = store::discover_sources(&self.config.data.raw_dir).unwrap_or_default();
        let exchanges: BTreeSet<String> = sources.iter().map(|s| s.exchange.clone()).collect();
        let quotes: BTreeSet<String> = sources.iter().map(|s| s.symbol.quote.clone()).collect();

        result.add_check(self.check_exchange_profiles(&exchanges));
        result.add_check(self.check_conversion_rates(&quotes));
        result.add_check(self.check_withdrawal_fees(&exchanges, &quotes));
        result
    }

    /// Checks needed before backtesting refined datasets
    pub fn validate_for_backtest(&self) -> ValidationResult {
        let mut result = ValidationResult::new();
        result.add_check(self.check_directory(
            "Refined data",
            &self.config.data.refined_dir,
            ValidationLevel::Critical,
        ));
        result.add_check(self.check_report_sink());
        result
    }

    /// Everything a full run touches
    pub fn validate_all(&self) -> ValidationResult {
        let mut result = self.validate_for_refine();
        result.add_check(self.check_directory(
            "Refined data",
            &self.config.data.refined_dir,
            ValidationLevel::Warning,
        ));
        result.add_check(self.check_report_sink());
        result
    }

    // Individual check methods

    fn check_directory(&self, name: &str, path: &Path, level: ValidationLevel) -> ValidationCheck {
        if path.is_dir() {
            ValidationCheck::ok(name, path.display().to_string())
        } else {
            ValidationCheck::failed(name, format!("{} is not a directory", path.display()), level)
        }
    }

    fn check_exchange_profiles(&self, exchanges: &BTreeSet<String>) -> ValidationCheck {
        let missing: Vec<&str> = exchanges
            .iter()
            .filter(|id| self.config.exchange(id).is_none())
            .map(String::as_str)
            .collect();

        if exchanges.is_empty() {
            ValidationCheck::failed("Exchange Profiles", "No snapshot files found", ValidationLevel::Warning)
        } else if missing.is_empty() {
            ValidationCheck::ok("Exchange Profiles", format!("{} exchange(s) configured", exchanges.len()))
        } else {
            ValidationCheck::failed(
                "Exchange Profiles",
                format!("No profile for: {} (their pipelines will fail)", missing.join(", ")),
                ValidationLevel::Warning,
            )
        }
    }

    fn check_conversion_rates(&self, quotes: &BTreeSet<String>) -> ValidationCheck {
        let unit = self.config.backtest.unit;
        if unit == ReferenceUnit::Quote {
            return ValidationCheck::ok("Conversion Rates", "Backtesting in quote currency");
        }

        let missing: Vec<&str> = quotes
            .iter()
            .filter(|quote| self.config.conversion.rate(unit, quote).is_none())
            .map(String::as_str)
            .collect();

        if missing.is_empty() {
            ValidationCheck::ok("Conversion Rates", format!("{:?} rate for every quote currency", unit))
        } else {
            ValidationCheck::failed(
                "Conversion Rates",
                format!(
                    "No {:?} rate for: {} (their records cannot be backtested)",
                    unit,
                    missing.join(", ")
                ),
                ValidationLevel::Warning,
            )
        }
    }

    fn check_withdrawal_fees(&self, exchanges: &BTreeSet<String>, quotes: &BTreeSet<String>) -> ValidationCheck {
        let mut missing = Vec::new();
        for id in exchanges {
            if let Some(profile) = self.config.exchange(id) {
                for quote in quotes {
                    if profile.withdrawal_fee(quote).is_none() {
                        missing.push(format!("{}/{}", id, quote));
                    }
                }
            }
        }

        if missing.is_empty() {
            ValidationCheck::ok("Withdrawal Fees", "Net profit available for every pair")
        } else {
            ValidationCheck::failed(
                "Withdrawal Fees",
                format!("Net profit undefined for: {}", missing.join(", ")),
                ValidationLevel::Info,
            )
        }
    }

    fn check_report_sink(&self) -> ValidationCheck {
        let path = &self.config.data.report_path;
        match self.config.data.report_format {
            ReportFormat::Text => {
                let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
                match parent {
                    Some(dir) if !dir.is_dir() => ValidationCheck::failed(
                        "Report Sink",
                        format!("Directory {} does not exist", dir.display()),
                        ValidationLevel::Critical,
                    ),
                    _ => ValidationCheck::ok("Report Sink", format!("Appending to {}", path.display())),
                }
            }
            ReportFormat::Sqlite => match Database::open_with_schema(path).and_then(|db| db.health_check()) {
                Ok(true) => ValidationCheck::ok("Report Sink", format!("SQLite at {}", path.display())),
                Ok(false) => ValidationCheck::failed("Report Sink", "Health check failed", ValidationLevel::Critical),
                Err(e) => ValidationCheck::failed(
                    "Report Sink",
                    format!("Cannot open {}: {}", path.display(), e),
                    ValidationLevel::Critical,
                ),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::exchange::ExchangeProfile;
    use std::fs;
    use tempfile::TempDir;

    fn workspace() -> (TempDir, Config) {
        let dir = TempDir::new().unwrap();
        let raw = dir.path().join("raw");
        let refined = dir.path().join("refined");
        fs::create_dir_all(&raw).unwrap();
        fs::create_dir_all(&refined).unwrap();
        fs::write(raw.join("BTC_EUR_kraken.csv"), "timestamp\n").unwrap();
        fs::write(raw.join("BTC_EUR_bitstamp.csv"), "timestamp\n").unwrap();

        let mut config = Config::default();
        config.data.raw_dir = raw;
        config.data.refined_dir = refined;
        config.data.report_path = dir.path().join("results.txt");
        (dir, config)
    }

    #[test]
    fn test_missing_profiles_warn() {
        let (_dir, mut config) = workspace();
        config
            .exchanges
            .insert("kraken".to_string(), ExchangeProfile::new("kraken", 0.0026));

        let result = PreFlightValidator::new(&config).validate_all();
        assert!(result.passed);
        let warnings = result.warnings();
        assert!(warnings.iter().any(|c| c.name == "Exchange Profiles" && c.message.contains("bitstamp")));
    }

    #[test]
    fn test_missing_raw_dir_is_critical() {
        let (_dir, mut config) = workspace();
        config.data.raw_dir = "/no/such/raw".into();

        let result = PreFlightValidator::new(&config).validate_for_refine();
        assert!(!result.passed);
        assert_eq!(result.critical_failures().len(), 1);
    }

    #[test]
    fn test_sqlite_sink_check() {
        let (dir, mut config) = workspace();
        config.data.report_format = ReportFormat::Sqlite;
        config.data.report_path = dir.path().join("reports.db");

        let result = PreFlightValidator::new(&config).validate_for_backtest();
        assert!(result.passed);
    }

    #[test]
    fn test_text_sink_needs_existing_directory() {
        let (_dir, mut config) = workspace();
        config.data.report_path = "/no/such/dir/results.txt".into();

        let result = PreFlightValidator::new(&config).validate_for_backtest();
        assert!(!result.passed);
    }
}
