//! Mathematical utility functions

use alloy::primitives::U256;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use std::str::FromStr;

/// `10^n`, or `None` once it leaves `Decimal` range (n > 28).
pub fn pow10(n: u32) -> Option<Decimal> {
    match n {
        0 => Some(dec!(1)),
        6 => Some(dec!(1_000_000)),
        18 => Some(dec!(1_000_000_000_000_000_000)),
        _ => (0..n).try_fold(Decimal::ONE, |acc, _| acc.checked_mul(Decimal::TEN)),
    }
}

/// `None` when the value exceeds `Decimal`'s 96-bit mantissa.
pub fn u256_to_decimal(value: U256) -> Option<Decimal> {
    Decimal::from_str(&value.to_string()).ok()
}

/// Truncates toward zero; negative inputs map to `None`.
pub fn decimal_to_u256(value: Decimal) -> Option<U256> {
    if value.is_sign_negative() {
        return None;
    }
    let integral = value.trunc();
    U256::from_str(&integral.normalize().to_string()).ok()
}

/// Lossy conversion for ratio math on values beyond `Decimal` range.
pub fn u256_to_f64(value: U256) -> f64 {
    value.to_string().parse().unwrap_or(f64::MAX)
}

/// Scales a raw amount into human units.
pub fn to_units(raw: U256, decimals: u8) -> Option<Decimal> {
    u256_to_decimal(raw)?.checked_div(pow10(decimals as u32)?)
}
