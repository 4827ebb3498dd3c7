//! Trade quotes produced by the routing engines

use alloy::primitives::Address;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use super::{Asset, CurrencyAmount};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RouterVersion {
    V2,
    V3,
}

impl fmt::Display for RouterVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouterVersion::V2 => f.write_str("V2"),
            RouterVersion::V3 => f.write_str("V3"),
        }
    }
}

/// Which side of the swap the user typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeType {
    ExactInput,
    ExactOutput,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    /// Token path, native legs replaced by the wrapped token.
    pub path: Vec<Address>,
    /// V3 pool fee per hop; empty for V2 routes.
    pub fees: Vec<u32>,
}

impl Route {
    pub fn hops(&self) -> usize {
        self.path.len().saturating_sub(1)
    }

    pub fn is_single_hop(&self) -> bool {
        self.hops() == 1
    }
}

/// Immutable quote. A new one is produced on every input change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub version: RouterVersion,
    pub trade_type: TradeType,
    pub input: CurrencyAmount,
    pub output: CurrencyAmount,
    pub route: Route,
    /// Output per unit of input, in human units.
    pub execution_price: Decimal,
    /// Fraction (0.01 = 1%) the trade moves the price against the trader.
    pub price_impact: Option<Decimal>,
}

impl Trade {
    pub fn input_asset(&self) -> &Asset {
        &self.input.asset
    }

    pub fn output_asset(&self) -> &Asset {
        &self.output.asset
    }

    /// Trades can be compared when they quote the same pair in the same
    /// direction.
    pub fn comparable_with(&self, other: &Trade) -> bool {
        self.trade_type == other.trade_type
            && self.input.asset.same_as(&other.input.asset)
            && self.output.asset.same_as(&other.output.asset)
    }
}

/// Per-engine quote status as seen by the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TradeState {
    /// No request yet, or the inputs are incomplete.
    Invalid,
    /// Pricing is in flight or failed transiently.
    Loading,
    NoRouteFound,
    Valid(Trade),
}

impl TradeState {
    pub fn trade(&self) -> Option<&Trade> {
        match self {
            TradeState::Valid(t) => Some(t),
            _ => None,
        }
    }
}

/// What the user asked to quote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRequest {
    pub input: Asset,
    pub output: Asset,
    pub amount: CurrencyAmount,
    pub trade_type: TradeType,
    pub single_hop_only: bool,
}

impl QuoteRequest {
    /// Builds a request from the typed field. `typed_on_input` selects which
    /// asset the typed amount belongs to.
    pub fn from_typed(
        input: Asset,
        output: Asset,
        typed: &str,
        typed_on_input: bool,
        single_hop_only: bool,
    ) -> Option<Self> {
        let (asset, trade_type) = if typed_on_input {
            (input.clone(), TradeType::ExactInput)
        } else {
            (output.clone(), TradeType::ExactOutput)
        };
        let amount = CurrencyAmount::parse(asset, typed)?;
        if amount.is_zero() {
            return None;
        }
        Some(Self {
            input,
            output,
            amount,
            trade_type,
            single_hop_only,
        })
    }
}
