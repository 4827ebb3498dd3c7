//! Token amounts and basis-point fractions

use alloy::primitives::U256;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use super::Asset;
use crate::utils::to_units;

pub const BPS_DENOMINATOR: u32 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyAmount {
    pub asset: Asset,
    /// Amount in the asset's smallest unit.
    pub raw: U256,
}

impl CurrencyAmount {
    pub fn new(asset: Asset, raw: U256) -> Self {
        Self { asset, raw }
    }

    /// Parses a user-typed decimal string ("1.5") into raw units. Digits past
    /// the asset's precision are truncated.
    pub fn parse(asset: Asset, typed: &str) -> Option<Self> {
        let value = Decimal::from_str(typed.trim()).ok()?;
        if value.is_sign_negative() {
            return None;
        }
        let decimals = asset.decimals() as u32;
        let truncated = value.trunc_with_scale(decimals);
        let mantissa = truncated.mantissa();
        if mantissa < 0 {
            return None;
        }
        let scale = truncated.scale();
        let factor = U256::from(10u64).checked_pow(U256::from(decimals.checked_sub(scale)?))?;
        let raw = U256::from(mantissa as u128).checked_mul(factor)?;
        Some(Self { asset, raw })
    }

    pub fn is_zero(&self) -> bool {
        self.raw.is_zero()
    }

    /// Human-readable amount, `None` if it does not fit a `Decimal`.
    pub fn to_decimal(&self) -> Option<Decimal> {
        to_units(self.raw, self.asset.decimals())
    }
}

impl fmt::Display for CurrencyAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_decimal() {
            Some(d) => write!(f, "{} {}", d.round_dp(6).normalize(), self.asset.symbol()),
            None => write!(f, "{} (raw) {}", self.raw, self.asset.symbol()),
        }
    }
}

/// Slippage tolerance expressed as `bps / 10_000`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlippageTolerance {
    pub bps: u32,
}

impl SlippageTolerance {
    pub const fn from_bps(bps: u32) -> Self {
        Self { bps }
    }

    pub fn as_fraction(&self) -> Decimal {
        Decimal::from(self.bps) / Decimal::from(BPS_DENOMINATOR)
    }

    pub fn as_percent(&self) -> Decimal {
        self.as_fraction() * dec!(100)
    }

    /// `amount / (1 + s)`: least output accepted on an exact-input trade.
    pub fn minimum_out(&self, amount: U256) -> U256 {
        amount * U256::from(BPS_DENOMINATOR) / U256::from(BPS_DENOMINATOR + self.bps)
    }

    /// `amount * (1 + s)`: most input spent on an exact-output trade.
    pub fn maximum_in(&self, amount: U256) -> U256 {
        amount * U256::from(BPS_DENOMINATOR + self.bps) / U256::from(BPS_DENOMINATOR)
    }
}

impl fmt::Display for SlippageTolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.as_percent().normalize())
    }
}
