//! Approval and permit states

use alloy::primitives::{Address, B256, Bytes, U256};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ApprovalState {
    Unknown,
    NotApproved,
    /// An approval transaction is outstanding. `optimistic` is set while the
    /// state comes from local submission rather than an observed pending tx.
    Pending { tx_hash: Option<B256>, optimistic: bool },
    Approved,
}

impl ApprovalState {
    /// Ordering used to keep transitions moving forward.
    pub fn rank(&self) -> u8 {
        match self {
            ApprovalState::Unknown => 0,
            ApprovalState::NotApproved => 1,
            ApprovalState::Pending { .. } => 2,
            ApprovalState::Approved => 3,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, ApprovalState::Pending { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PermitSignatureState {
    NotSigned,
    Signing,
    Signed,
}

/// Token/spender/owner an allowance is checked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ApprovalTarget {
    pub token: Address,
    pub spender: Address,
    pub owner: Address,
    /// Allowance needed for the current trade.
    pub amount: U256,
}

/// Signed permit, valid for one token/spender/amount until `deadline`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermitSignature {
    pub token: Address,
    pub spender: Address,
    pub owner: Address,
    /// Amount for EIP-2612 permits, `U256::MAX` for DAI-style.
    pub amount: U256,
    pub nonce: U256,
    pub deadline: u64,
    pub allowed: bool,
    /// 65-byte `r || s || v` signature.
    pub signature: Bytes,
}

impl PermitSignature {
    pub fn v(&self) -> u8 {
        let v = self.signature.last().copied().unwrap_or_default();
        if v < 27 { v + 27 } else { v }
    }

    pub fn r(&self) -> B256 {
        B256::from_slice(&self.signature[..32])
    }

    pub fn s(&self) -> B256 {
        B256::from_slice(&self.signature[32..64])
    }

    pub fn covers(&self, target: &ApprovalTarget, now: u64) -> bool {
        self.token == target.token
            && self.spender == target.spender
            && self.owner == target.owner
            && self.amount >= target.amount
            && self.deadline > now
    }
}

/// Outcome of `request_approval`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalOutcome {
    PermitSigned,
    Submitted { tx_hash: B256 },
    /// The user declined the permit signature; nothing else was attempted.
    Cancelled,
    /// No approval needed or possible in the current state.
    Skipped,
}
