//! Error classification and recovery strategies

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::Level;
use super::SwapError;

/// Failure taxonomy every subsystem error resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    UserDeclined,
    Transient,
    ExecutionFailure,
    InvariantViolation,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::UserDeclined => "user_declined",
            ErrorClass::Transient => "transient",
            ErrorClass::ExecutionFailure => "execution_failure",
            ErrorClass::InvariantViolation => "invariant_violation",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Stop the attempt without surfacing anything.
    Cancel,
    /// Show an advisory state; the next input change retries.
    Advisory { message: String, log_level: Level },
    /// Show the message verbatim and let the user retry manually.
    Surface { message: String },
    /// Nothing to do.
    Ignore,
}

pub struct ErrorRecovery {
    pub error_counts: Arc<RwLock<HashMap<ErrorClass, u32>>>,
}

impl Default for ErrorRecovery {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorRecovery {
    pub fn new() -> Self {
        Self {
            error_counts: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn handle_error(&self, error: &SwapError) -> RecoveryAction {
        let class = Self::classify(error);
        *self.error_counts.write().await.entry(class).or_insert(0) += 1;

        match class {
            ErrorClass::UserDeclined => RecoveryAction::Cancel,
            ErrorClass::Transient => RecoveryAction::Advisory {
                message: error.to_string(),
                log_level: Level::WARN,
            },
            ErrorClass::ExecutionFailure => RecoveryAction::Surface {
                message: match error {
                    SwapError::Execution { message } => message.clone(),
                    SwapError::Wallet(e) => e.display_message(),
                    other => other.to_string(),
                },
            },
            ErrorClass::InvariantViolation => RecoveryAction::Ignore,
        }
    }

    pub fn classify(error: &SwapError) -> ErrorClass {
        match error {
            SwapError::Wallet(e) if e.is_user_rejection() => ErrorClass::UserDeclined,
            SwapError::Wallet(_) => ErrorClass::ExecutionFailure,
            SwapError::Network { .. }
            | SwapError::NoRoute { .. }
            | SwapError::TaxLookup { .. }
            | SwapError::UnsupportedChain(_) => ErrorClass::Transient,
            SwapError::Contract { .. } | SwapError::Execution { .. } => ErrorClass::ExecutionFailure,
            SwapError::InvalidApproval(_) => ErrorClass::InvariantViolation,
        }
    }

    pub async fn snapshot(&self) -> HashMap<ErrorClass, u32> {
        self.error_counts.read().await.clone()
    }
}
