//! # CLI Interface
//!
//! Defines the command-line argument structure for the `sharevault` binary
//! using `clap` derive. Supports three subcommands: `demo`, `run`, and
//! `version`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Sharevault distribution harness.
///
/// Drives the in-memory distribution engine: fund a shared vault, move
/// shares between holders, and watch pro-rata entitlements settle.
#[derive(Parser, Debug)]
#[command(
    name = "sharevault",
    about = "Pro-rata shared-vault distribution harness",
    version,
    propagate_version = true
)]
pub struct SharevaultCli {
    /// Default log level when RUST_LOG is not set.
    #[arg(long, global = true, env = "SHAREVAULT_LOG", default_value = "info")]
    pub log_level: String,

    /// Log output format: "pretty" or "json".
    #[arg(long, global = true, env = "SHAREVAULT_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the sharevault binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the built-in demonstration: a three-holder vault through two
    /// funding cycles with share transfers in between.
    Demo,
    /// Execute a scenario script (JSON) against a fresh vault.
    Run(RunArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the scenario script.
    ///
    /// The script declares the initial cap table and a sequence of fund,
    /// withdraw, and transfer steps; see `demos/scenario.json`.
    pub script: PathBuf,
}
