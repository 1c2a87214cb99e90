// Profitability Model
// Fee-aware arbitrage profit between two aligned top-of-book snapshots

use crate::core::exchange::{Amount, ConversionTable, ExchangeProfile};
use crate::core::types::{AlignedPair, Snapshot, Symbol};
use serde::{Deserialize, Serialize};

/// Profit of the better direction for one aligned pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitabilityRecord {
    pub timestamp: i64,
    pub buy_exchange: String,
    pub sell_exchange: String,
    /// Base-currency volume bought on one side and sold on the other
    pub trade_volume: f64,
    /// Quote spent on the buy leg
    pub max_initial_amount: Amount,
    pub gross_profit: Amount,
    /// Undefined when nothing was spent
    pub percent_gross_profit: Option<f64>,
    /// Undefined when the sell side has no withdrawal fee on record
    pub net_profit: Option<Amount>,
    pub percent_net_profit: Option<f64>,
}

impl ProfitabilityRecord {
    /// Net profit where known, gross otherwise
    pub fn realizable_profit(&self) -> Amount {
        self.net_profit.unwrap_or(self.gross_profit)
    }

    pub fn realizable_percent(&self) -> Option<f64> {
        if self.net_profit.is_some() {
            self.percent_net_profit
        } else {
            self.percent_gross_profit
        }
    }
}

/// One side of a trade: the snapshot seen there and the venue's fees
#[derive(Debug, Clone, Copy)]
pub struct Leg<'a> {
    pub snapshot: &'a Snapshot,
    pub profile: &'a ExchangeProfile,
}

impl<'a> Leg<'a> {
    pub fn new(snapshot: &'a Snapshot, profile: &'a ExchangeProfile) -> Self {
        Self { snapshot, profile }
    }
}

/// Pure evaluator; holds only read-only run-wide inputs
#[derive(Debug, Clone, Copy)]
pub struct ProfitabilityModel<'a> {
    conversion: &'a ConversionTable,
    volume_cap: Option<f64>,
}

impl<'a> ProfitabilityModel<'a> {
    pub fn new(conversion: &'a ConversionTable) -> Self {
        Self {
            conversion,
            volume_cap: None,
        }
    }

    /// Cap the base volume of any single evaluated trade
    pub fn with_volume_cap(mut self, cap: Option<f64>) -> Self {
        self.volume_cap = cap;
        self
    }

    pub fn trade_volume(&self, buy: &Snapshot, sell: &Snapshot) -> f64 {
        let volume = buy.ask_volume.min(sell.bid_volume).max(0.0);
        match self.volume_cap {
            Some(cap) => volume.min(cap),
            None => volume,
        }
    }

    /// Buy at `buy`'s ask, sell at `sell`'s bid, paying taker fees on both legs
    /// and, when known, the sell venue's withdrawal fee for the quote currency.
    pub fn evaluate_direction(
        &self,
        symbol: &Symbol,
        timestamp: i64,
        buy: Leg<'_>,
        sell: Leg<'_>,
    ) -> ProfitabilityRecord {
        let trade_volume = self.trade_volume(buy.snapshot, sell.snapshot);

        let initial_outlay = trade_volume * buy.snapshot.ask_price;
        let base_received = trade_volume * (1.0 - buy.profile.taker_fee);
        let quote_received = base_received * sell.snapshot.bid_price * (1.0 - sell.profile.taker_fee);

        let gross_profit = quote_received - initial_outlay;
        let net_profit = sell
            .profile
            .withdrawal_fee(&symbol.quote)
            .map(|fee| (quote_received - fee) - initial_outlay);

        let percent = |profit: f64| {
            if initial_outlay > 0.0 {
                Some(profit / initial_outlay * 100.0)
            } else {
                None
            }
        };

        ProfitabilityRecord {
            timestamp,
            buy_exchange: buy.profile.id.clone(),
            sell_exchange: sell.profile.id.clone(),
            trade_volume,
            max_initial_amount: self.conversion.convert(initial_outlay, &symbol.quote),
            gross_profit: self.conversion.convert(gross_profit, &symbol.quote),
            percent_gross_profit: percent(gross_profit),
            net_profit: net_profit.map(|p| self.conversion.convert(p, &symbol.quote)),
            percent_net_profit: net_profit.and_then(percent),
        }
    }

    /// Evaluate A→B and B→A and keep the one with strictly higher gross profit.
    /// Ties go to A→B.
    pub fn evaluate(
        &self,
        symbol: &Symbol,
        pair: &AlignedPair,
        profile_a: &ExchangeProfile,
        profile_b: &ExchangeProfile,
    ) -> ProfitabilityRecord {
        let leg_a = Leg::new(&pair.snapshot_a, profile_a);
        let leg_b = Leg::new(&pair.snapshot_b, profile_b);

        let a_to_b = self.evaluate_direction(symbol, pair.timestamp, leg_a, leg_b);
        let b_to_a = self.evaluate_direction(symbol, pair.timestamp, leg_b, leg_a);

        if b_to_a.gross_profit.quote > a_to_b.gross_profit.quote {
            b_to_a
        } else {
            a_to_b
        }
    }
}
