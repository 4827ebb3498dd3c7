//! Swap attempt state

use alloy::primitives::B256;
use serde::Serialize;
use super::Trade;

/// Transient record of the current swap attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SwapState {
    pub trade_to_confirm: Option<Trade>,
    pub attempting_txn: bool,
    pub swap_error_message: Option<String>,
    pub tx_hash: Option<B256>,
    pub show_confirm: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SwapPhase {
    Idle,
    Confirming,
    Submitting,
    Success { tx_hash: B256 },
    Failed { message: String },
}

impl SwapState {
    pub fn phase(&self) -> SwapPhase {
        if self.attempting_txn {
            return SwapPhase::Submitting;
        }
        if let Some(tx_hash) = self.tx_hash {
            return SwapPhase::Success { tx_hash };
        }
        if let Some(message) = &self.swap_error_message {
            return SwapPhase::Failed { message: message.clone() };
        }
        if self.show_confirm && self.trade_to_confirm.is_some() {
            return SwapPhase::Confirming;
        }
        SwapPhase::Idle
    }
}

/// Result of `execute_swap`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecuteOutcome {
    /// No swap callback was available; nothing changed.
    NoCallback,
    /// The price-impact guard refused, or the user did not confirm.
    Vetoed,
    /// This attempt is already in flight or was already submitted.
    AlreadyAttempted,
    Submitted { tx_hash: B256 },
    Failed { message: String },
}

/// Whether an input/output pair is a plain wrap of the native currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WrapType {
    NotApplicable,
    Wrap,
    Unwrap,
}
