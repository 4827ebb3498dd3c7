//! Slippage tolerance estimation

pub mod estimator;

pub use estimator::*;
