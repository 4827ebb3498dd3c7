//! Configuration management for the swap coordinator

pub mod settings;
pub mod preferences;

pub use settings::*;
pub use preferences::*;

use lazy_static::lazy_static;

lazy_static! {
    pub static ref CONFIG: Config = Config::load();
}
