// Exchange fee profiles and the static currency conversion table

use crate::core::types::{PrecisionRules, Symbol};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Fee schedule and market metadata for one exchange. Loaded once per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeProfile {
    #[serde(default)]
    pub id: String,
    /// Fraction of the traded amount, e.g. 0.0026
    pub taker_fee: f64,
    /// Flat fee per currency for moving funds off the exchange
    #[serde(default)]
    pub withdrawal_fees: HashMap<String, f64>,
    /// Raw precision metadata keyed by symbol ("BTC/EUR")
    #[serde(default)]
    pub precision: HashMap<String, toml::Value>,
}

impl ExchangeProfile {
    pub fn new(id: impl Into<String>, taker_fee: f64) -> Self {
        Self {
            id: id.into(),
            taker_fee,
            withdrawal_fees: HashMap::new(),
            precision: HashMap::new(),
        }
    }

    pub fn with_withdrawal_fee(mut self, currency: impl Into<String>, fee: f64) -> Self {
        self.withdrawal_fees.insert(currency.into(), fee);
        self
    }

    /// `None` means the fee is unknown, which is not the same as free
    pub fn withdrawal_fee(&self, currency: &str) -> Option<f64> {
        self.withdrawal_fees.get(currency).copied()
    }

    pub fn precision_for(&self, symbol: &Symbol) -> PrecisionRules {
        PrecisionRules::from_metadata(self.precision.get(&symbol.to_string()))
    }
}

/// Reference units every profit figure is also expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceUnit {
    Quote,
    Fiat,
    Crypto,
}

impl Default for ReferenceUnit {
    fn default() -> Self {
        ReferenceUnit::Fiat
    }
}

/// Static rates fetched once at startup and never refreshed mid-run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionTable {
    #[serde(default = "default_fiat_currency")]
    pub fiat_currency: String,
    #[serde(default = "default_crypto_currency")]
    pub crypto_currency: String,
    /// Value of one unit of the currency in the fiat reference
    #[serde(default)]
    pub fiat_rates: HashMap<String, f64>,
    /// Value of one unit of the currency in the crypto reference
    #[serde(default)]
    pub crypto_rates: HashMap<String, f64>,
}

fn default_fiat_currency() -> String { "EUR".to_string() }
fn default_crypto_currency() -> String { "BTC".to_string() }

impl Default for ConversionTable {
    fn default() -> Self {
        Self {
            fiat_currency: default_fiat_currency(),
            crypto_currency: default_crypto_currency(),
            fiat_rates: HashMap::new(),
            crypto_rates: HashMap::new(),
        }
    }
}

impl ConversionTable {
    pub fn fiat_rate(&self, currency: &str) -> Option<f64> {
        if currency == self.fiat_currency {
            return Some(1.0);
        }
        self.fiat_rates.get(currency).copied()
    }

    pub fn crypto_rate(&self, currency: &str) -> Option<f64> {
        if currency == self.crypto_currency {
            return Some(1.0);
        }
        self.crypto_rates.get(currency).copied()
    }

    pub fn rate(&self, unit: ReferenceUnit, currency: &str) -> Option<f64> {
        match unit {
            ReferenceUnit::Quote => Some(1.0),
            ReferenceUnit::Fiat => self.fiat_rate(currency),
            ReferenceUnit::Crypto => self.crypto_rate(currency),
        }
    }

    /// Express an amount held in `currency` in all three units
    pub fn convert(&self, amount: f64, currency: &str) -> Amount {
        Amount {
            quote: amount,
            fiat: self.fiat_rate(currency).map(|r| amount * r),
            crypto: self.crypto_rate(currency).map(|r| amount * r),
        }
    }
}

/// A quote-currency amount with its reference-unit equivalents.
/// A reference value is `None` when no rate was available.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Amount {
    pub quote: f64,
    pub fiat: Option<f64>,
    pub crypto: Option<f64>,
}

impl Amount {
    pub fn in_unit(&self, unit: ReferenceUnit) -> Option<f64> {
        match unit {
            ReferenceUnit::Quote => Some(self.quote),
            ReferenceUnit::Fiat => self.fiat,
            ReferenceUnit::Crypto => self.crypto,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ConversionTable {
        let mut table = ConversionTable::default();
        table.fiat_rates.insert("BTC".to_string(), 5000.0);
        table.fiat_rates.insert("USDT".to_string(), 0.8);
        table.crypto_rates.insert("USDT".to_string(), 0.0002);
        table
    }

    #[test]
    fn test_reference_currency_converts_to_itself() {
        let table = table();
        assert_eq!(table.fiat_rate("EUR"), Some(1.0));
        assert_eq!(table.crypto_rate("BTC"), Some(1.0));
    }

    #[test]
    fn test_convert_amount() {
        let amount = table().convert(10.0, "USDT");
        assert_eq!(amount.quote, 10.0);
        assert_eq!(amount.fiat, Some(8.0));
        assert!((amount.crypto.unwrap() - 0.002).abs() < 1e-12);
        assert_eq!(amount.in_unit(ReferenceUnit::Quote), Some(10.0));
    }

    #[test]
    fn test_missing_rate_is_undefined() {
        let amount = table().convert(1.0, "LTC");
        assert_eq!(amount.fiat, None);
        assert_eq!(amount.crypto, None);
    }

    #[test]
    fn test_withdrawal_fee_lookup() {
        let profile = ExchangeProfile::new("kraken", 0.0026).with_withdrawal_fee("EUR", 0.09);
        assert_eq!(profile.withdrawal_fee("EUR"), Some(0.09));
        assert_eq!(profile.withdrawal_fee("USD"), None);
    }

    #[test]
    fn test_precision_lookup_falls_back() {
        let mut profile = ExchangeProfile::new("kraken", 0.0026);
        let raw: toml::Value = toml::from_str("price = 1\namount = 8").unwrap();
        profile.precision.insert("BTC/EUR".to_string(), raw);

        let btc = Symbol::new("BTC", "EUR");
        let eth = Symbol::new("ETH", "EUR");
        assert_eq!(profile.precision_for(&btc), PrecisionRules::new(1, 8));
        assert_eq!(profile.precision_for(&eth), PrecisionRules::default());
    }
}
