//! Network addresses for routers, factories and wrapped-native tokens

use alloy::primitives::{Address, address};

// Wrapped native tokens
pub const WETH_MAINNET: Address = address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");
pub const WBNB_BSC: Address = address!("bb4CdB9CBd36B01bD1cBaEBF2De08d9173bc095c");
pub const WETH_BASE: Address = address!("4200000000000000000000000000000000000006");
pub const WETH_SEPOLIA: Address = address!("fFf9976782d46CC05630D1f6eBAb18b2324d6B14");

// Stablecoins used for fiat valuation
pub const USDC_MAINNET: Address = address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");
pub const USDC_BASE: Address = address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913");
pub const BUSD_BSC: Address = address!("e9e7CEA3DedcA5984780Bafc599bD69ADd087D56");

// Tokens with off-chain approvals
pub const DAI_MAINNET: Address = address!("6B175474E89094C44Da98b954EedeAC495271d0F");
pub const UNI_MAINNET: Address = address!("1f9840a85d5aF5bf1D1762F925BDADdC4201F984");

// Uniswap V2
pub const UNISWAP_V2_ROUTER: Address = address!("7a250d5630B4cF539739dF2C5dAcb4c659F2488D");
pub const UNISWAP_V2_FACTORY: Address = address!("5C69bEe701ef814a2B6a3EDD4B1652CB9cc5aA6f");
pub const PANCAKE_V2_ROUTER: Address = address!("10ED43C718714eb63d5aA57B78B54704E256024E");
pub const PANCAKE_V2_FACTORY: Address = address!("cA143Ce32Fe78f1f7019d7d551a6402fC5350c73");

// Uniswap V3
pub const UNISWAP_V3_SWAP_ROUTER: Address = address!("E592427A0AEce92De3Edee1F18E0157C05861564");
pub const UNISWAP_V3_FACTORY: Address = address!("1F98431c8aD98523631AE4a59f267346ea31F984");
pub const UNISWAP_V3_QUOTER: Address = address!("b27308f9F90D607463bb33eA1BeBb41C27CE5AB6");

/// Owners that mark a token contract as renounced.
pub const RENOUNCED_ADDRESSES: &[Address] = &[
    address!("000000000000000000000000000000000000dEaD"),
    Address::ZERO,
];

/// V3 fee tiers searched by the quoter, in hundredths of a bip.
pub const V3_FEE_TIERS: &[u32] = &[500, 3000, 10000];

pub fn wrapped_native(chain_id: u64) -> Option<Address> {
    match chain_id {
        1 => Some(WETH_MAINNET),
        56 => Some(WBNB_BSC),
        8453 => Some(WETH_BASE),
        11155111 => Some(WETH_SEPOLIA),
        _ => None,
    }
}

pub fn fiat_stablecoin(chain_id: u64) -> Option<(Address, u8)> {
    match chain_id {
        1 => Some((USDC_MAINNET, 6)),
        56 => Some((BUSD_BSC, 18)),
        8453 => Some((USDC_BASE, 6)),
        _ => None,
    }
}

/// V2-style (router, factory) for a chain.
pub fn v2_deployment(chain_id: u64) -> Option<(Address, Address)> {
    match chain_id {
        1 => Some((UNISWAP_V2_ROUTER, UNISWAP_V2_FACTORY)),
        56 => Some((PANCAKE_V2_ROUTER, PANCAKE_V2_FACTORY)),
        _ => None,
    }
}

/// V3 (swap router, factory, quoter) for a chain.
pub fn v3_deployment(chain_id: u64) -> Option<(Address, Address, Address)> {
    match chain_id {
        1 => Some((UNISWAP_V3_SWAP_ROUTER, UNISWAP_V3_FACTORY, UNISWAP_V3_QUOTER)),
        _ => None,
    }
}
