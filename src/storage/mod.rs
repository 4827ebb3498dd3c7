//! Data persistence and file operations

pub mod analytics;

pub use analytics::*;
