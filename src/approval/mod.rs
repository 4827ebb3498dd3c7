//! Token approval and permit flow

pub mod coordinator;
pub mod pending;
pub mod permit;

pub use coordinator::*;
pub use pending::*;
pub use permit::*;
