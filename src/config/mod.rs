//! Configuration module
//!
//! Handles environment variables and library-wide constants.

mod constants;
mod settings;

pub use constants::*;
pub use settings::Config;
