//! Swap Coordinator - quote, approval and swap-execution coordination
//!
//! Resolves the better of a V2 and a V3 quote for the selected pair, keeps
//! the input token's allowance or permit in step with the trade, sets slippage
//! from token taxes, guards against price impact and submits the swap.

pub mod config;
pub mod types;
pub mod errors;
pub mod network;
pub mod routing;
pub mod approval;
pub mod slippage;
pub mod validation;
pub mod execution;
pub mod storage;
pub mod utils;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used items
pub use config::{Config, CONFIG};
pub use errors::{SwapError, SwapResult};
pub use session::{SessionParts, SwapSession};
pub use types::*;

// Type alias for our concrete provider
pub type ConcreteProvider = alloy::providers::RootProvider<alloy::transports::BoxTransport>;
