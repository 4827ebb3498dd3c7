//! Quote routing across the V2 and V3 liquidity engines

pub mod comparison;
pub mod engine;
pub mod resolver;
pub mod v2;
pub mod v3;
pub mod wrap;

pub use comparison::*;
pub use engine::*;
pub use resolver::*;
pub use v2::V2ReserveEngine;
pub use v3::V3QuoterEngine;
pub use wrap::*;
