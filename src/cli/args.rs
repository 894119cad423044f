//! CLI argument definitions.
//!
//! Uses clap derive macros for type-safe argument parsing.

use clap::{Parser, Subcommand};

/// Generic repository toolkit - inspect a database through the unit of work
#[derive(Parser, Debug)]
#[command(name = "generic-repository")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Database URL, overrides DATABASE_URL
    #[arg(short, long, global = true)]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check database connectivity
    Ping,

    /// Seed a sample table and print one page of it
    Demo(DemoArgs),
}

/// Arguments for the demo command
#[derive(Parser, Debug)]
pub struct DemoArgs {
    /// Number of notes to seed
    #[arg(long, default_value = "25")]
    pub seed: u32,

    /// Page to print (values below 1 become 1)
    #[arg(short, long, default_value = "1", allow_negative_numbers = true)]
    pub page: i64,

    /// Page size (values below 1 fall back to the default)
    #[arg(short = 's', long, default_value = "10", allow_negative_numbers = true)]
    pub page_size: i64,

    /// Only list notes whose title contains this text
    #[arg(long)]
    pub title_contains: Option<String>,

    /// Slice in memory instead of at the store
    #[arg(long)]
    pub in_ram: bool,
}
