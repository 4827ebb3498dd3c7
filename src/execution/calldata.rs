//! Router calldata for V2 and V3 swaps

use alloy::{
    primitives::{Address, Bytes, U256},
    sol_types::SolCall,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;
use crate::{
    errors::{SwapError, SwapResult, WalletError},
    network::{
        contracts::{IUniswapV2Router, ISwapRouter},
        TransactionCall, WalletClient,
    },
    types::{PermitSignature, RouterVersion, SlippageTolerance, Trade, TradeType},
};

/// Caller-chosen parameters applied on top of a trade.
#[derive(Debug, Clone)]
pub struct SwapParameters {
    pub recipient: Address,
    pub slippage: SlippageTolerance,
    /// Unix seconds.
    pub deadline: u64,
    pub permit: Option<PermitSignature>,
}

/// (amount in, amount out) limits after slippage.
pub fn slippage_limits(trade: &Trade, slippage: SlippageTolerance) -> (U256, U256) {
    match trade.trade_type {
        TradeType::ExactInput => (trade.input.raw, slippage.minimum_out(trade.output.raw)),
        TradeType::ExactOutput => (slippage.maximum_in(trade.input.raw), trade.output.raw),
    }
}

pub fn swap_call(trade: &Trade, router: Address, params: &SwapParameters) -> SwapResult<TransactionCall> {
    if trade.route.path.len() < 2 {
        return Err(SwapError::Execution {
            message: "Trade has no route".to_string(),
        });
    }
    match trade.version {
        RouterVersion::V2 => Ok(v2_swap_call(trade, router, params)),
        RouterVersion::V3 => v3_swap_call(trade, router, params),
    }
}

fn v2_swap_call(trade: &Trade, router: Address, params: &SwapParameters) -> TransactionCall {
    let (amount_in, amount_out) = slippage_limits(trade, params.slippage);
    let path = trade.route.path.clone();
    let to = params.recipient;
    let deadline = U256::from(params.deadline);
    let native_in = trade.input.asset.is_native();
    let native_out = trade.output.asset.is_native();

    let (data, value) = match (trade.trade_type, native_in, native_out) {
        (TradeType::ExactInput, true, _) => (
            IUniswapV2Router::swapExactETHForTokensCall { amountOutMin: amount_out, path, to, deadline }.abi_encode(),
            amount_in,
        ),
        (TradeType::ExactOutput, true, _) => (
            IUniswapV2Router::swapETHForExactTokensCall { amountOut: amount_out, path, to, deadline }.abi_encode(),
            amount_in,
        ),
        (TradeType::ExactInput, false, true) => (
            IUniswapV2Router::swapExactTokensForETHCall { amountIn: amount_in, amountOutMin: amount_out, path, to, deadline }.abi_encode(),
            U256::ZERO,
        ),
        (TradeType::ExactOutput, false, true) => (
            IUniswapV2Router::swapTokensForExactETHCall { amountOut: amount_out, amountInMax: amount_in, path, to, deadline }.abi_encode(),
            U256::ZERO,
        ),
        (TradeType::ExactInput, false, false) => (
            IUniswapV2Router::swapExactTokensForTokensCall { amountIn: amount_in, amountOutMin: amount_out, path, to, deadline }.abi_encode(),
            U256::ZERO,
        ),
        (TradeType::ExactOutput, false, false) => (
            IUniswapV2Router::swapTokensForExactTokensCall { amountOut: amount_out, amountInMax: amount_in, path, to, deadline }.abi_encode(),
            U256::ZERO,
        ),
    };

    TransactionCall { to: router, data: data.into(), value }
}

/// Packed V3 path: `token (fee token)*`, reversed for exact output.
pub fn encode_v3_path(path: &[Address], fees: &[u32], exact_output: bool) -> SwapResult<Bytes> {
    if path.len() != fees.len() + 1 {
        return Err(SwapError::Execution {
            message: format!("V3 route has {} tokens but {} fees", path.len(), fees.len()),
        });
    }

    let mut tokens: Vec<Address> = path.to_vec();
    let mut tiers: Vec<u32> = fees.to_vec();
    if exact_output {
        tokens.reverse();
        tiers.reverse();
    }

    let mut encoded = Vec::with_capacity(20 + tiers.len() * 23);
    encoded.extend_from_slice(tokens[0].as_slice());
    for (fee, token) in tiers.iter().zip(tokens.iter().skip(1)) {
        encoded.extend_from_slice(&fee.to_be_bytes()[1..]);
        encoded.extend_from_slice(token.as_slice());
    }
    Ok(encoded.into())
}

fn v3_swap_call(trade: &Trade, router: Address, params: &SwapParameters) -> SwapResult<TransactionCall> {
    let (amount_in, amount_out) = slippage_limits(trade, params.slippage);
    let native_in = trade.input.asset.is_native();
    let native_out = trade.output.asset.is_native();
    let deadline = U256::from(params.deadline);
    // The router holds wrapped output until unwrapWETH9 forwards it.
    let swap_recipient = if native_out { Address::ZERO } else { params.recipient };

    let mut calls: Vec<Bytes> = Vec::new();

    if let Some(permit) = &params.permit {
        let call = if permit.allowed {
            ISwapRouter::selfPermitAllowedCall {
                token: permit.token,
                nonce: permit.nonce,
                expiry: U256::from(permit.deadline),
                v: permit.v(),
                r: permit.r(),
                s: permit.s(),
            }
            .abi_encode()
        } else {
            ISwapRouter::selfPermitCall {
                token: permit.token,
                value: permit.amount,
                deadline: U256::from(permit.deadline),
                v: permit.v(),
                r: permit.r(),
                s: permit.s(),
            }
            .abi_encode()
        };
        calls.push(call.into());
    }

    let swap = match trade.trade_type {
        TradeType::ExactInput => ISwapRouter::exactInputCall {
            params: ISwapRouter::ExactInputParams {
                path: encode_v3_path(&trade.route.path, &trade.route.fees, false)?,
                recipient: swap_recipient,
                deadline,
                amountIn: amount_in,
                amountOutMinimum: amount_out,
            },
        }
        .abi_encode(),
        TradeType::ExactOutput => ISwapRouter::exactOutputCall {
            params: ISwapRouter::ExactOutputParams {
                path: encode_v3_path(&trade.route.path, &trade.route.fees, true)?,
                recipient: swap_recipient,
                deadline,
                amountOut: amount_out,
                amountInMaximum: amount_in,
            },
        }
        .abi_encode(),
    };
    calls.push(swap.into());

    if native_out {
        calls.push(
            ISwapRouter::unwrapWETH9Call { amountMinimum: amount_out, recipient: params.recipient }
                .abi_encode()
                .into(),
        );
    }
    if native_in && trade.trade_type == TradeType::ExactOutput {
        calls.push(ISwapRouter::refundETHCall {}.abi_encode().into());
    }

    let value = if native_in { amount_in } else { U256::ZERO };
    let data = if calls.len() == 1 {
        calls.remove(0)
    } else {
        ISwapRouter::multicallCall { data: calls }.abi_encode().into()
    };

    Ok(TransactionCall { to: router, data, value })
}

/// Submits a prepared swap. Implemented by whatever holds the wallet.
#[async_trait]
pub trait SwapCallback: Send + Sync {
    async fn submit(&self, trade: &Trade, params: &SwapParameters) -> Result<alloy::primitives::B256, WalletError>;
}

/// Builds router calldata and sends it through the wallet.
pub struct RouterSwapCallback {
    wallet: Arc<dyn WalletClient>,
    v2_router: Option<Address>,
    v3_router: Option<Address>,
}

impl RouterSwapCallback {
    pub fn new(wallet: Arc<dyn WalletClient>, v2_router: Option<Address>, v3_router: Option<Address>) -> Self {
        Self { wallet, v2_router, v3_router }
    }
}

#[async_trait]
impl SwapCallback for RouterSwapCallback {
    async fn submit(&self, trade: &Trade, params: &SwapParameters) -> Result<alloy::primitives::B256, WalletError> {
        let router = match trade.version {
            RouterVersion::V2 => self.v2_router,
            RouterVersion::V3 => self.v3_router,
        }
        .ok_or_else(|| WalletError::Other(format!("No {} router on this chain", trade.version)))?;

        let call = swap_call(trade, router, params).map_err(|e| WalletError::Other(e.to_string()))?;
        debug!(%router, value = %call.value, "Prepared swap call");
        self.wallet.send_transaction(call).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::usdc;
    use crate::types::{Asset, CurrencyAmount, Route, USDC_MAINNET, WETH_MAINNET};
    use rust_decimal::Decimal;

    const RECIPIENT: Address = Address::repeat_byte(0x55);

    fn trade(version: RouterVersion, trade_type: TradeType, input: Asset, output: Asset) -> Trade {
        let (path, fees) = if input.is_native() {
            (vec![WETH_MAINNET, USDC_MAINNET], vec![3000])
        } else {
            (vec![USDC_MAINNET, WETH_MAINNET], vec![3000])
        };
        Trade {
            version,
            trade_type,
            input: CurrencyAmount::new(input, U256::from(10_000u64)),
            output: CurrencyAmount::new(output, U256::from(20_000u64)),
            route: Route { path, fees: if version == RouterVersion::V3 { fees } else { Vec::new() } },
            execution_price: Decimal::ZERO,
            price_impact: None,
        }
    }

    fn params() -> SwapParameters {
        SwapParameters {
            recipient: RECIPIENT,
            slippage: SlippageTolerance::from_bps(100),
            deadline: 1_700_000_000,
            permit: None,
        }
    }

    #[test]
    fn v2_native_input_sends_value_with_min_out() {
        let t = trade(RouterVersion::V2, TradeType::ExactInput, Asset::native(1), usdc(false));
        let call = swap_call(&t, Address::repeat_byte(1), &params()).unwrap();
        assert_eq!(call.value, U256::from(10_000u64));

        let decoded = IUniswapV2Router::swapExactETHForTokensCall::abi_decode(&call.data, true).unwrap();
        // 20000 / 1.01
        assert_eq!(decoded.amountOutMin, U256::from(19_801u64));
        assert_eq!(decoded.to, RECIPIENT);
    }

    #[test]
    fn v2_exact_output_to_native_caps_input() {
        let t = trade(RouterVersion::V2, TradeType::ExactOutput, usdc(false), Asset::native(1));
        let call = swap_call(&t, Address::repeat_byte(1), &params()).unwrap();
        assert_eq!(call.value, U256::ZERO);

        let decoded = IUniswapV2Router::swapTokensForExactETHCall::abi_decode(&call.data, true).unwrap();
        assert_eq!(decoded.amountInMax, U256::from(10_100u64));
        assert_eq!(decoded.amountOut, U256::from(20_000u64));
    }

    #[test]
    fn v3_path_packing() {
        let path = encode_v3_path(&[WETH_MAINNET, USDC_MAINNET], &[3000], false).unwrap();
        assert_eq!(path.len(), 43);
        assert_eq!(&path[20..23], &[0x00, 0x0b, 0xb8]);
        assert_eq!(&path[..20], WETH_MAINNET.as_slice());

        let reversed = encode_v3_path(&[WETH_MAINNET, USDC_MAINNET], &[3000], true).unwrap();
        assert_eq!(&reversed[..20], USDC_MAINNET.as_slice());
        assert!(encode_v3_path(&[WETH_MAINNET], &[3000], false).is_err());
    }

    #[test]
    fn v3_native_output_unwraps_in_multicall() {
        let t = trade(RouterVersion::V3, TradeType::ExactInput, usdc(false), Asset::native(1));
        let call = swap_call(&t, Address::repeat_byte(1), &params()).unwrap();

        let multicall = ISwapRouter::multicallCall::abi_decode(&call.data, true).unwrap();
        assert_eq!(multicall.data.len(), 2);
        let swap = ISwapRouter::exactInputCall::abi_decode(&multicall.data[0], true).unwrap();
        assert_eq!(swap.params.recipient, Address::ZERO);
        let unwrap = ISwapRouter::unwrapWETH9Call::abi_decode(&multicall.data[1], true).unwrap();
        assert_eq!(unwrap.recipient, RECIPIENT);
    }

    #[test]
    fn v3_permit_is_prepended() {
        let t = trade(RouterVersion::V3, TradeType::ExactInput, usdc(true), Asset::native(1));
        let mut signature = vec![0x22u8; 64];
        signature.push(28);
        let p = SwapParameters {
            permit: Some(PermitSignature {
                token: USDC_MAINNET,
                spender: Address::repeat_byte(1),
                owner: RECIPIENT,
                amount: U256::from(10_000u64),
                nonce: U256::ZERO,
                deadline: 1_700_000_000,
                allowed: false,
                signature: signature.into(),
            }),
            ..params()
        };

        let call = swap_call(&t, Address::repeat_byte(1), &p).unwrap();
        let multicall = ISwapRouter::multicallCall::abi_decode(&call.data, true).unwrap();
        assert_eq!(multicall.data.len(), 3);
        let permit = ISwapRouter::selfPermitCall::abi_decode(&multicall.data[0], true).unwrap();
        assert_eq!(permit.v, 28);
        assert_eq!(permit.value, U256::from(10_000u64));
    }
}
