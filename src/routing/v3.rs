//! Concentrated-liquidity quoting through the on-chain V3 Quoter

use alloy::{
    primitives::{aliases::{U160, U24}, Address, Bytes, U256},
    providers::Provider,
    rpc::types::eth::TransactionRequest,
    sol_types::SolCall,
};
use anyhow::Context;
use async_trait::async_trait;
use rust_decimal::prelude::*;
use std::sync::Arc;
use tracing::debug;
use crate::{
    errors::SwapResult,
    network::{
        contracts::{IQuoter, IUniswapV3Factory, IUniswapV3Pool},
        retry_with_backoff, RetryConfig,
    },
    routing::engine::{better_amount, build_trade, RoutingEngine},
    types::{QuoteRequest, Route, RouterVersion, Trade, TradeType, V3_FEE_TIERS},
    utils::u256_to_f64,
    ConcreteProvider,
};

const Q96: f64 = 79_228_162_514_264_337_593_543_950_336.0;

pub struct V3QuoterEngine {
    provider: Arc<ConcreteProvider>,
    router: Address,
    factory: Address,
    quoter: Address,
    retry: RetryConfig,
}

impl V3QuoterEngine {
    pub fn new(provider: Arc<ConcreteProvider>, router: Address, factory: Address, quoter: Address) -> Self {
        Self {
            provider,
            router,
            factory,
            quoter,
            retry: RetryConfig {
                max_attempts: 2,
                initial_delay_ms: 200,
                ..Default::default()
            },
        }
    }

    async fn eth_call(&self, to: Address, data: Vec<u8>) -> anyhow::Result<Bytes> {
        let tx = TransactionRequest::default().to(to).input(Bytes::from(data).into());
        self.provider.call(&tx).await
            .with_context(|| format!("eth_call to {} failed", to))
    }

    async fn pool(&self, a: Address, b: Address, fee: u32) -> SwapResult<Address> {
        let data = IUniswapV3Factory::getPoolCall {
            tokenA: a,
            tokenB: b,
            fee: U24::from(fee),
        }
        .abi_encode();

        retry_with_backoff(
            || {
                let data = data.clone();
                async move {
                    let raw = self.eth_call(self.factory, data).await?;
                    let decoded = IUniswapV3Factory::getPoolCall::abi_decode_returns(&raw, true)
                        .context("Failed to decode getPool")?;
                    Ok(decoded.pool)
                }
            },
            &self.retry,
            "V3 getPool",
        ).await
    }

    /// Quoter reverts when the pool lacks liquidity, so a failed call is "no quote".
    async fn quote_tier(&self, request: &QuoteRequest, token_in: Address, token_out: Address, fee: u32) -> Option<U256> {
        let data = match request.trade_type {
            TradeType::ExactInput => IQuoter::quoteExactInputSingleCall {
                tokenIn: token_in,
                tokenOut: token_out,
                fee: U24::from(fee),
                amountIn: request.amount.raw,
                sqrtPriceLimitX96: U160::ZERO,
            }
            .abi_encode(),
            TradeType::ExactOutput => IQuoter::quoteExactOutputSingleCall {
                tokenIn: token_in,
                tokenOut: token_out,
                fee: U24::from(fee),
                amountOut: request.amount.raw,
                sqrtPriceLimitX96: U160::ZERO,
            }
            .abi_encode(),
        };

        let raw = match self.eth_call(self.quoter, data).await {
            Ok(raw) => raw,
            Err(e) => {
                debug!(fee, "V3 quote reverted: {}", e);
                return None;
            }
        };

        match request.trade_type {
            TradeType::ExactInput => IQuoter::quoteExactInputSingleCall::abi_decode_returns(&raw, true)
                .ok()
                .map(|r| r.amountOut),
            TradeType::ExactOutput => IQuoter::quoteExactOutputSingleCall::abi_decode_returns(&raw, true)
                .ok()
                .map(|r| r.amountIn),
        }
    }

    async fn sqrt_price(&self, pool: Address) -> Option<U256> {
        let raw = self.eth_call(pool, IUniswapV3Pool::slot0Call {}.abi_encode()).await.ok()?;
        let slot0 = IUniswapV3Pool::slot0Call::abi_decode_returns(&raw, true).ok()?;
        Some(U256::from(slot0.sqrtPriceX96))
    }
}

/// Fraction of output lost against the pool's spot price.
pub fn impact_from_sqrt_price(
    sqrt_price_x96: U256,
    zero_for_one: bool,
    amount_in: U256,
    amount_out: U256,
) -> Option<Decimal> {
    let sqrt = u256_to_f64(sqrt_price_x96) / Q96;
    let price = sqrt * sqrt;
    if price <= 0.0 || !price.is_finite() {
        return None;
    }
    let mid = if zero_for_one { price } else { 1.0 / price };
    let quoted_out = u256_to_f64(amount_in) * mid;
    if quoted_out <= 0.0 {
        return None;
    }
    let impact = ((quoted_out - u256_to_f64(amount_out)) / quoted_out).max(0.0);
    Decimal::from_f64(impact).map(|d| d.round_dp(6))
}

#[async_trait]
impl RoutingEngine for V3QuoterEngine {
    fn version(&self) -> RouterVersion {
        RouterVersion::V3
    }

    fn router(&self) -> Address {
        self.router
    }

    async fn quote(&self, request: &QuoteRequest) -> SwapResult<Option<Trade>> {
        let (Some(token_in), Some(token_out)) = (request.input.wrapped_address(), request.output.wrapped_address()) else {
            return Ok(None);
        };
        if token_in == token_out {
            return Ok(None);
        }

        let mut best: Option<(u32, Address, U256)> = None;
        for &fee in V3_FEE_TIERS {
            let pool = self.pool(token_in, token_out, fee).await?;
            if pool == Address::ZERO {
                continue;
            }
            let Some(quoted) = self.quote_tier(request, token_in, token_out, fee).await else {
                continue;
            };
            let replace = match &best {
                None => true,
                Some((_, _, current)) => better_amount(request.trade_type, *current, quoted),
            };
            if replace {
                best = Some((fee, pool, quoted));
            }
        }

        let Some((fee, pool, quoted)) = best else {
            debug!(%token_in, %token_out, "No V3 pool quoted");
            return Ok(None);
        };

        let (amount_in, amount_out) = match request.trade_type {
            TradeType::ExactInput => (request.amount.raw, quoted),
            TradeType::ExactOutput => (quoted, request.amount.raw),
        };

        let impact = match self.sqrt_price(pool).await {
            Some(sqrt) => impact_from_sqrt_price(sqrt, token_in < token_out, amount_in, amount_out),
            None => None,
        };

        Ok(Some(build_trade(
            request,
            RouterVersion::V3,
            Route { path: vec![token_in, token_out], fees: vec![fee] },
            amount_in,
            amount_out,
            impact,
        )))
    }
}
