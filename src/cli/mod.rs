//! CLI module - Command-line interface.
//!
//! Provides commands for:
//! - `ping` - Database connectivity check
//! - `demo` - Seed a sample table and page through it

pub mod args;

pub use args::{Cli, Commands, DemoArgs};
