//! Swap submission: calldata, the executor state machine and analytics

pub mod analytics;
pub mod calldata;
pub mod executor;

pub use analytics::*;
pub use calldata::*;
pub use executor::*;
