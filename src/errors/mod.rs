//! Error handling and recovery classification

pub mod swap_error;
pub mod recovery;

pub use swap_error::*;
pub use recovery::*;
