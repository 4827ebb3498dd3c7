//! Routing engine interface and shared trade construction

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use rust_decimal::prelude::*;
use crate::{
    errors::SwapResult,
    types::{CurrencyAmount, QuoteRequest, Route, RouterVersion, Trade, TradeType},
    utils::to_units,
};

/// A liquidity router able to quote trades.
///
/// `Ok(None)` means the engine has no route for the pair. An `Err` is a
/// pricing failure the resolver treats as transient.
#[async_trait]
pub trait RoutingEngine: Send + Sync {
    fn version(&self) -> RouterVersion;

    /// Contract that executes this engine's trades and needs the allowance.
    fn router(&self) -> Address;

    async fn quote(&self, request: &QuoteRequest) -> SwapResult<Option<Trade>>;
}

/// Assembles a [`Trade`] from raw amounts on both sides of `request`.
pub fn build_trade(
    request: &QuoteRequest,
    version: RouterVersion,
    route: Route,
    amount_in: U256,
    amount_out: U256,
    price_impact: Option<Decimal>,
) -> Trade {
    let input = CurrencyAmount::new(request.input.clone(), amount_in);
    let output = CurrencyAmount::new(request.output.clone(), amount_out);

    let execution_price = match (
        to_units(amount_in, request.input.decimals()),
        to_units(amount_out, request.output.decimals()),
    ) {
        (Some(i), Some(o)) => o.checked_div(i).unwrap_or(Decimal::ZERO),
        _ => Decimal::ZERO,
    };

    Trade {
        version,
        trade_type: request.trade_type,
        input,
        output,
        route,
        execution_price,
        price_impact,
    }
}

/// Picks the better of two raw quotes for the request's direction.
pub(crate) fn better_amount(trade_type: TradeType, current: U256, candidate: U256) -> bool {
    match trade_type {
        TradeType::ExactInput => candidate > current,
        TradeType::ExactOutput => candidate < current,
    }
}

/// Stands in for a router that is not deployed on the chain. Never routes.
pub struct UnavailableEngine(pub RouterVersion);

#[async_trait]
impl RoutingEngine for UnavailableEngine {
    fn version(&self) -> RouterVersion {
        self.0
    }

    fn router(&self) -> Address {
        Address::ZERO
    }

    async fn quote(&self, _request: &QuoteRequest) -> SwapResult<Option<Trade>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{token, usdc};
    use crate::types::Asset;
    use rust_decimal_macros::dec;

    fn request(trade_type: TradeType) -> QuoteRequest {
        let input = Asset::native(1);
        QuoteRequest {
            amount: CurrencyAmount::new(input.clone(), U256::from(10u64).pow(U256::from(18u64))),
            input,
            output: usdc(false),
            trade_type,
            single_hop_only: false,
        }
    }

    #[test]
    fn execution_price_is_in_human_units() {
        let trade = build_trade(
            &request(TradeType::ExactInput),
            RouterVersion::V2,
            Route { path: Vec::new(), fees: Vec::new() },
            U256::from(10u64).pow(U256::from(18u64)),
            U256::from(2_500_000_000u64),
            None,
        );
        assert_eq!(trade.execution_price, dec!(2500));
        assert_eq!(trade.trade_type, TradeType::ExactInput);
    }

    #[test]
    fn oversized_decimals_price_as_zero() {
        let mut request = request(TradeType::ExactInput);
        request.output = token(Address::repeat_byte(0x30), "WIDE", 30);
        let trade = build_trade(
            &request,
            RouterVersion::V2,
            Route { path: Vec::new(), fees: Vec::new() },
            U256::from(10u64).pow(U256::from(18u64)),
            U256::from(10u64).pow(U256::from(30u64)),
            None,
        );
        assert_eq!(trade.execution_price, Decimal::ZERO);
        assert_eq!(trade.output.to_decimal(), None);
        assert_eq!(trade.output.to_string(), format!("{} (raw) WIDE", U256::from(10u64).pow(U256::from(30u64))));
    }

    #[test]
    fn better_amount_depends_on_direction() {
        assert!(better_amount(TradeType::ExactInput, U256::from(10u64), U256::from(11u64)));
        assert!(better_amount(TradeType::ExactOutput, U256::from(10u64), U256::from(9u64)));
        assert!(!better_amount(TradeType::ExactOutput, U256::from(10u64), U256::from(10u64)));
    }

    #[tokio::test]
    async fn unavailable_engine_never_routes() {
        let engine = UnavailableEngine(RouterVersion::V3);
        assert_eq!(engine.quote(&request(TradeType::ExactOutput)).await.unwrap(), None);
    }
}
