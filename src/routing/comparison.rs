//! Trade comparison between routing engines

use alloy::primitives::{U256, U512};
use tracing::warn;
use crate::types::{RouterVersion, Trade, TradeType, BPS_DENOMINATOR};

/// Whether `candidate` should replace `incumbent`.
///
/// The candidate must exist. It wins outright over a missing incumbent; otherwise
/// it must beat the incumbent by more than `threshold_bps`: strictly more output
/// on exact-input trades, strictly less input on exact-output trades.
pub fn is_trade_better(candidate: Option<&Trade>, incumbent: Option<&Trade>, threshold_bps: u32) -> bool {
    let Some(a) = candidate else {
        return false;
    };
    let Some(b) = incumbent else {
        return true;
    };

    if !a.comparable_with(b) {
        warn!(
            "⚠️ Comparing trades for different pairs: {}/{} vs {}/{}",
            a.input_asset(), a.output_asset(), b.input_asset(), b.output_asset()
        );
        return false;
    }

    let scaled = U512::from(BPS_DENOMINATOR + threshold_bps);
    let unit = U512::from(BPS_DENOMINATOR);
    let widen = |v: U256| U512::from(v);

    match a.trade_type {
        TradeType::ExactInput => widen(a.output.raw) * unit > widen(b.output.raw) * scaled,
        TradeType::ExactOutput => widen(a.input.raw) * scaled < widen(b.input.raw) * unit,
    }
}

/// Chooses between the two engines' trades. The preferred engine keeps the
/// trade unless the other one is better by the threshold.
pub fn select_trade(
    v2: Option<&Trade>,
    v3: Option<&Trade>,
    preferred: RouterVersion,
    threshold_bps: u32,
) -> Option<Trade> {
    let (preferred_trade, other) = match preferred {
        RouterVersion::V2 => (v2, v3),
        RouterVersion::V3 => (v3, v2),
    };

    if is_trade_better(other, preferred_trade, threshold_bps) {
        other.cloned()
    } else {
        preferred_trade.cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Asset, CurrencyAmount, Route, Token, USDC_MAINNET};
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    fn usdc() -> Asset {
        Asset::Token(Token {
            chain_id: 1,
            address: USDC_MAINNET,
            decimals: 6,
            symbol: "USDC".into(),
            name: "USD Coin".into(),
            permit: None,
        })
    }

    fn trade(version: RouterVersion, trade_type: TradeType, amount_in: u128, amount_out: u128) -> Trade {
        Trade {
            version,
            trade_type,
            input: CurrencyAmount::new(Asset::native(1), U256::from(amount_in)),
            output: CurrencyAmount::new(usdc(), U256::from(amount_out)),
            route: Route { path: Vec::new(), fees: Vec::new() },
            execution_price: Decimal::ZERO,
            price_impact: None,
        }
    }

    #[test]
    fn missing_trades() {
        let t = trade(RouterVersion::V2, TradeType::ExactInput, 1, 100);
        assert!(!is_trade_better(None, Some(&t), 0));
        assert!(is_trade_better(Some(&t), None, 0));
        assert!(!is_trade_better(None, None, 0));
    }

    #[test]
    fn threshold_requires_margin() {
        let incumbent = trade(RouterVersion::V3, TradeType::ExactInput, 1_000, 10_000);
        let slightly = trade(RouterVersion::V2, TradeType::ExactInput, 1_000, 10_040);
        let clearly = trade(RouterVersion::V2, TradeType::ExactInput, 1_000, 10_060);

        assert!(is_trade_better(Some(&slightly), Some(&incumbent), 0));
        assert!(!is_trade_better(Some(&slightly), Some(&incumbent), 50));
        assert!(is_trade_better(Some(&clearly), Some(&incumbent), 50));
    }

    #[test]
    fn exact_output_prefers_smaller_input() {
        let cheap = trade(RouterVersion::V2, TradeType::ExactOutput, 990, 10_000);
        let dear = trade(RouterVersion::V3, TradeType::ExactOutput, 1_000, 10_000);
        assert!(is_trade_better(Some(&cheap), Some(&dear), 0));
        assert!(!is_trade_better(Some(&dear), Some(&cheap), 0));
    }

    #[test]
    fn ties_keep_the_preferred_engine() {
        let v2 = trade(RouterVersion::V2, TradeType::ExactInput, 1_000, 10_000);
        let v3 = trade(RouterVersion::V3, TradeType::ExactInput, 1_000, 10_000);
        let picked = select_trade(Some(&v2), Some(&v3), RouterVersion::V3, 0).unwrap();
        assert_eq!(picked.version, RouterVersion::V3);

        let picked = select_trade(Some(&v2), None, RouterVersion::V3, 0).unwrap();
        assert_eq!(picked.version, RouterVersion::V2);
    }

    proptest! {
        #[test]
        fn never_better_both_ways(
            a_out in 1u128..u128::MAX,
            b_out in 1u128..u128::MAX,
            threshold in 0u32..1_000,
            exact_output in any::<bool>(),
        ) {
            let trade_type = if exact_output { TradeType::ExactOutput } else { TradeType::ExactInput };
            let a = trade(RouterVersion::V2, trade_type, a_out, a_out);
            let b = trade(RouterVersion::V3, trade_type, b_out, b_out);
            prop_assert!(!(is_trade_better(Some(&a), Some(&b), threshold) && is_trade_better(Some(&b), Some(&a), threshold)));
        }

        #[test]
        fn without_threshold_exactly_one_wins_unless_equal(
            a_out in 1u128..u128::MAX,
            b_out in 1u128..u128::MAX,
        ) {
            let a = trade(RouterVersion::V2, TradeType::ExactInput, 1, a_out);
            let b = trade(RouterVersion::V3, TradeType::ExactInput, 1, b_out);
            let ab = is_trade_better(Some(&a), Some(&b), 0);
            let ba = is_trade_better(Some(&b), Some(&a), 0);
            prop_assert_eq!(ab || ba, a_out != b_out);
        }
    }
}
