//! Pre-swap checks: price impact and token ownership

pub mod ownership;
pub mod price_impact;

pub use ownership::*;
pub use price_impact::*;
