//! Constant-product quoting from on-chain V2 pair reserves

use alloy::{
    primitives::{Address, U256},
    providers::Provider,
    rpc::types::eth::TransactionRequest,
    sol_types::SolValue,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use rust_decimal::prelude::*;
use std::sync::Arc;
use tracing::debug;
use crate::{
    errors::{SwapError, SwapResult},
    network::{encode_call, retry_with_backoff, RetryConfig},
    routing::engine::{better_amount, build_trade, RoutingEngine},
    types::{wrapped_native, QuoteRequest, Route, RouterVersion, Trade, TradeType},
    utils::u256_to_f64,
    ConcreteProvider,
};

const FEE_NUMERATOR: u64 = 997;
const FEE_DENOMINATOR: u64 = 1000;

pub fn get_amount_out(amount_in: U256, reserve_in: U256, reserve_out: U256) -> Option<U256> {
    if amount_in.is_zero() || reserve_in.is_zero() || reserve_out.is_zero() {
        return None;
    }
    let amount_in_with_fee = amount_in * U256::from(FEE_NUMERATOR);
    let numerator = amount_in_with_fee * reserve_out;
    let denominator = reserve_in * U256::from(FEE_DENOMINATOR) + amount_in_with_fee;
    Some(numerator / denominator)
}

pub fn get_amount_in(amount_out: U256, reserve_in: U256, reserve_out: U256) -> Option<U256> {
    if amount_out.is_zero() || reserve_in.is_zero() || amount_out >= reserve_out {
        return None;
    }
    let numerator = reserve_in * amount_out * U256::from(FEE_DENOMINATOR);
    let denominator = (reserve_out - amount_out) * U256::from(FEE_NUMERATOR);
    Some(numerator / denominator + U256::from(1))
}

pub async fn get_pair_reserves(provider: &dyn Provider, pair: Address) -> Result<(U256, U256)> {
    let tx = TransactionRequest::default()
        .to(pair)
        .input(encode_call("getReserves()", Vec::new()).into());

    let result = provider.call(&tx).await
        .context("Failed to call getReserves")?;
    let decoded = <(U256, U256, U256)>::abi_decode(&result, true)
        .context("Failed to decode reserves")?;
    Ok((decoded.0, decoded.1))
}

pub async fn get_pair(provider: &dyn Provider, factory: Address, a: Address, b: Address) -> Result<Address> {
    let tx = TransactionRequest::default()
        .to(factory)
        .input(encode_call("getPair(address,address)", (a, b).abi_encode_params()).into());

    let result = provider.call(&tx).await
        .context("Failed to call getPair")?;
    Address::abi_decode(&result, true).context("Failed to decode pair address")
}

/// Reserves of one hop, oriented in the direction of travel.
#[derive(Debug, Clone, Copy)]
struct Hop {
    reserve_in: U256,
    reserve_out: U256,
}

pub struct V2ReserveEngine {
    provider: Arc<ConcreteProvider>,
    chain_id: u64,
    router: Address,
    factory: Address,
    retry: RetryConfig,
}

impl V2ReserveEngine {
    pub fn new(provider: Arc<ConcreteProvider>, chain_id: u64, router: Address, factory: Address) -> Self {
        Self {
            provider,
            chain_id,
            router,
            factory,
            retry: RetryConfig {
                max_attempts: 2,
                initial_delay_ms: 200,
                ..Default::default()
            },
        }
    }

    fn candidate_paths(&self, token_in: Address, token_out: Address, single_hop_only: bool) -> Vec<Vec<Address>> {
        let mut paths = vec![vec![token_in, token_out]];
        if single_hop_only {
            return paths;
        }
        if let Some(base) = wrapped_native(self.chain_id) {
            if base != token_in && base != token_out {
                paths.push(vec![token_in, base, token_out]);
            }
        }
        paths
    }

    /// `None` when some hop has no pair.
    async fn load_hops(&self, path: &[Address]) -> SwapResult<Option<Vec<Hop>>> {
        let mut hops = Vec::with_capacity(path.len() - 1);
        for window in path.windows(2) {
            let (a, b) = (window[0], window[1]);
            let provider = self.provider.as_ref();
            let pair = retry_with_backoff(
                || async { get_pair(provider, self.factory, a, b).await },
                &self.retry,
                "V2 getPair",
            ).await?;
            if pair == Address::ZERO {
                return Ok(None);
            }

            let (r0, r1) = retry_with_backoff(
                || async { get_pair_reserves(provider, pair).await },
                &self.retry,
                &format!("V2 reserves for {}", pair),
            ).await
            .map_err(|e| match e {
                SwapError::Network { .. } => e,
                _ => SwapError::Contract {
                    contract: pair,
                    message: "Failed to get reserves".to_string(),
                    source: anyhow::anyhow!("{}", e),
                },
            })?;

            // token0 is the lower address
            let hop = if a < b {
                Hop { reserve_in: r0, reserve_out: r1 }
            } else {
                Hop { reserve_in: r1, reserve_out: r0 }
            };
            hops.push(hop);
        }
        Ok(Some(hops))
    }

    /// Returns (amount_in, amount_out, price_impact) through `hops`.
    fn simulate(hops: &[Hop], trade_type: TradeType, amount: U256) -> Option<(U256, U256, Decimal)> {
        let (amount_in, amount_out) = match trade_type {
            TradeType::ExactInput => {
                let mut current = amount;
                for hop in hops {
                    current = get_amount_out(current, hop.reserve_in, hop.reserve_out)?;
                }
                (amount, current)
            }
            TradeType::ExactOutput => {
                let mut current = amount;
                for hop in hops.iter().rev() {
                    current = get_amount_in(current, hop.reserve_in, hop.reserve_out)?;
                }
                (current, amount)
            }
        };

        let mid_price: f64 = hops
            .iter()
            .map(|h| u256_to_f64(h.reserve_out) / u256_to_f64(h.reserve_in))
            .product();
        let quoted_out = u256_to_f64(amount_in) * mid_price;
        let impact = if quoted_out > 0.0 {
            ((quoted_out - u256_to_f64(amount_out)) / quoted_out).max(0.0)
        } else {
            0.0
        };

        Some((amount_in, amount_out, Decimal::from_f64(impact).unwrap_or_default().round_dp(6)))
    }
}

#[async_trait]
impl RoutingEngine for V2ReserveEngine {
    fn version(&self) -> RouterVersion {
        RouterVersion::V2
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

        let mut best: Option<(Vec<Address>, U256, U256, Decimal)> = None;
        for path in self.candidate_paths(token_in, token_out, request.single_hop_only) {
            let Some(hops) = self.load_hops(&path).await? else {
                debug!(?path, "No V2 pair along path");
                continue;
            };
            let Some((amount_in, amount_out, impact)) = Self::simulate(&hops, request.trade_type, request.amount.raw) else {
                continue;
            };

            let replace = match &best {
                None => true,
                Some((_, best_in, best_out, _)) => match request.trade_type {
                    TradeType::ExactInput => better_amount(request.trade_type, *best_out, amount_out),
                    TradeType::ExactOutput => better_amount(request.trade_type, *best_in, amount_in),
                },
            };
            if replace {
                best = Some((path, amount_in, amount_out, impact));
            }
        }

        Ok(best.map(|(path, amount_in, amount_out, impact)| {
            build_trade(
                request,
                RouterVersion::V2,
                Route { path, fees: Vec::new() },
                amount_in,
                amount_out,
                Some(impact),
            )
        }))
    }
}
