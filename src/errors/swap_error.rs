//! Custom error types for the swap coordinator

use alloy::primitives::Address;
use thiserror::Error;

/// EIP-1193 code returned by wallets when the user rejects a request.
pub const USER_REJECTED_CODE: i64 = 4001;

/// Failure reported by the wallet/provider collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("User rejected the request")]
    UserRejected,

    #[error("Provider error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("{0}")]
    Other(String),
}

impl WalletError {
    /// Builds a wallet error from a raw provider code, folding 4001 into
    /// [`WalletError::UserRejected`].
    pub fn from_code(code: i64, message: impl Into<String>) -> Self {
        if code == USER_REJECTED_CODE {
            WalletError::UserRejected
        } else {
            WalletError::Rpc { code, message: message.into() }
        }
    }

    pub fn is_user_rejection(&self) -> bool {
        matches!(self, WalletError::UserRejected)
    }

    /// Message shown to the user verbatim.
    pub fn display_message(&self) -> String {
        match self {
            WalletError::UserRejected => "Transaction rejected.".to_string(),
            WalletError::Rpc { message, .. } => message.clone(),
            WalletError::Other(message) => message.clone(),
        }
    }
}

#[derive(Error, Debug)]
pub enum SwapError {
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
        retry_count: u32,
    },

    #[error("Contract interaction failed: {contract} - {message}")]
    Contract {
        contract: Address,
        message: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Wallet request failed: {0}")]
    Wallet(#[from] WalletError),

    #[error("No route found for {input} -> {output}")]
    NoRoute { input: String, output: String },

    #[error("Tax lookup failed for {asset}: {reason}")]
    TaxLookup { asset: Address, reason: String },

    #[error("Chain {0} is not supported")]
    UnsupportedChain(u64),

    #[error("Swap failed: {message}")]
    Execution { message: String },

    #[error("Invalid approval request: {0}")]
    InvalidApproval(String),
}

impl SwapError {
    pub fn is_user_rejection(&self) -> bool {
        matches!(self, SwapError::Wallet(e) if e.is_user_rejection())
    }
}

pub type SwapResult<T> = Result<T, SwapError>;
