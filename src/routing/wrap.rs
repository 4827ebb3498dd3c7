//! Native currency wrapping, which bypasses routing and approval

use alloy::{primitives::U256, sol_types::SolCall};
use crate::{
    errors::{SwapError, SwapResult},
    network::{contracts::IWETH9, TransactionCall},
    types::{wrapped_native, Asset, WrapType},
};

pub fn wrap_type(input: &Asset, output: &Asset) -> WrapType {
    if input.chain_id() != output.chain_id() {
        return WrapType::NotApplicable;
    }
    let Some(wrapped) = wrapped_native(input.chain_id()) else {
        return WrapType::NotApplicable;
    };

    match (input.is_native(), output.is_native()) {
        (true, false) if output.token_address() == Some(wrapped) => WrapType::Wrap,
        (false, true) if input.token_address() == Some(wrapped) => WrapType::Unwrap,
        _ => WrapType::NotApplicable,
    }
}

/// `deposit()` or `withdraw(amount)` on the wrapped-native contract.
pub fn wrap_call(kind: WrapType, chain_id: u64, amount: U256) -> SwapResult<TransactionCall> {
    let to = wrapped_native(chain_id).ok_or(SwapError::UnsupportedChain(chain_id))?;
    match kind {
        WrapType::Wrap => Ok(TransactionCall {
            to,
            data: IWETH9::depositCall {}.abi_encode().into(),
            value: amount,
        }),
        WrapType::Unwrap => Ok(TransactionCall {
            to,
            data: IWETH9::withdrawCall { wad: amount }.abi_encode().into(),
            value: U256::ZERO,
        }),
        WrapType::NotApplicable => Err(SwapError::Execution {
            message: "Pair is not a wrap of the native currency".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Token, USDC_MAINNET, WETH_MAINNET};

    fn token(address: alloy::primitives::Address, symbol: &str) -> Asset {
        Asset::Token(Token {
            chain_id: 1,
            address,
            decimals: 18,
            symbol: symbol.into(),
            name: symbol.into(),
            permit: None,
        })
    }

    #[test]
    fn detects_wrap_and_unwrap() {
        let eth = Asset::native(1);
        let weth = token(WETH_MAINNET, "WETH");
        let usdc = token(USDC_MAINNET, "USDC");

        assert_eq!(wrap_type(&eth, &weth), WrapType::Wrap);
        assert_eq!(wrap_type(&weth, &eth), WrapType::Unwrap);
        assert_eq!(wrap_type(&eth, &usdc), WrapType::NotApplicable);
        assert_eq!(wrap_type(&weth, &usdc), WrapType::NotApplicable);
    }

    #[test]
    fn wrap_sends_value_unwrap_does_not() {
        let amount = U256::from(5u64);
        let wrap = wrap_call(WrapType::Wrap, 1, amount).unwrap();
        assert_eq!(wrap.to, WETH_MAINNET);
        assert_eq!(wrap.value, amount);
        assert_eq!(&wrap.data[..], &IWETH9::depositCall::SELECTOR[..]);

        let unwrap = wrap_call(WrapType::Unwrap, 1, amount).unwrap();
        assert_eq!(unwrap.value, U256::ZERO);
        assert_eq!(&unwrap.data[..4], &IWETH9::withdrawCall::SELECTOR[..]);

        assert!(wrap_call(WrapType::NotApplicable, 1, amount).is_err());
    }
}
