//! Tradable assets: the chain's native currency or an ERC-20 token

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use std::fmt;
use super::addresses::{wrapped_native, DAI_MAINNET, UNI_MAINNET, USDC_MAINNET};

/// How a token implements off-chain approvals, if at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermitKind {
    /// EIP-2612 `permit(owner, spender, value, deadline, v, r, s)`.
    Amount,
    /// DAI-style `permit(holder, spender, nonce, expiry, allowed, v, r, s)`.
    Allowed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitInfo {
    pub kind: PermitKind,
    /// EIP-712 domain version; most tokens use "1".
    pub version: String,
    /// EIP-712 domain name when it differs from the token name.
    pub name: Option<String>,
}

/// Permit support for tokens known to implement it.
pub fn known_permit(chain_id: u64, token: Address) -> Option<PermitInfo> {
    if chain_id != 1 {
        return None;
    }
    let (kind, version, name) = match token {
        t if t == USDC_MAINNET => (PermitKind::Amount, "2", None),
        t if t == DAI_MAINNET => (PermitKind::Allowed, "1", None),
        t if t == UNI_MAINNET => (PermitKind::Amount, "1", Some("Uniswap")),
        _ => return None,
    };
    Some(PermitInfo {
        kind,
        version: version.to_string(),
        name: name.map(str::to_string),
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub chain_id: u64,
    pub address: Address,
    pub decimals: u8,
    pub symbol: String,
    pub name: String,
    pub permit: Option<PermitInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub chain_id: u64,
    pub symbol: String,
    pub decimals: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Asset {
    Native(NativeCurrency),
    Token(Token),
}

impl Asset {
    pub fn native(chain_id: u64) -> Self {
        let symbol = match chain_id {
            56 | 97 => "BNB",
            137 => "MATIC",
            _ => "ETH",
        };
        Asset::Native(NativeCurrency {
            chain_id,
            symbol: symbol.to_string(),
            decimals: 18,
        })
    }

    pub fn is_native(&self) -> bool {
        matches!(self, Asset::Native(_))
    }

    pub fn chain_id(&self) -> u64 {
        match self {
            Asset::Native(n) => n.chain_id,
            Asset::Token(t) => t.chain_id,
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            Asset::Native(n) => &n.symbol,
            Asset::Token(t) => &t.symbol,
        }
    }

    pub fn decimals(&self) -> u8 {
        match self {
            Asset::Native(n) => n.decimals,
            Asset::Token(t) => t.decimals,
        }
    }

    /// ERC-20 address, `None` for the native currency.
    pub fn token_address(&self) -> Option<Address> {
        match self {
            Asset::Native(_) => None,
            Asset::Token(t) => Some(t.address),
        }
    }

    /// Address used on-chain by routers: the wrapped-native token stands in for
    /// the native currency.
    pub fn wrapped_address(&self) -> Option<Address> {
        match self {
            Asset::Native(n) => wrapped_native(n.chain_id),
            Asset::Token(t) => Some(t.address),
        }
    }

    pub fn as_token(&self) -> Option<&Token> {
        match self {
            Asset::Native(_) => None,
            Asset::Token(t) => Some(t),
        }
    }

    /// Same on-chain asset, treating native and its wrapped form as distinct.
    pub fn same_as(&self, other: &Asset) -> bool {
        match (self, other) {
            (Asset::Native(a), Asset::Native(b)) => a.chain_id == b.chain_id,
            (Asset::Token(a), Asset::Token(b)) => a.chain_id == b.chain_id && a.address == b.address,
            _ => false,
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
