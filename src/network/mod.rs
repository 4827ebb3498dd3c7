//! Network providers, wallet access and remote services

pub mod contracts;
pub mod providers;
pub mod retry;
pub mod tax_service;
pub mod wallet;

pub use providers::*;
pub use retry::*;
pub use tax_service::*;
pub use wallet::*;
