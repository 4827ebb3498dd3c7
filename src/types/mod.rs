//! Core data types and structures

pub mod addresses;
pub mod asset;
pub mod amount;
pub mod trade;
pub mod approval;
pub mod swap;
pub mod tax;

pub use addresses::*;
pub use asset::*;
pub use amount::*;
pub use trade::*;
pub use approval::*;
pub use swap::*;
pub use tax::*;
