// Copyright (c) 2026 Sharevault Contributors. MIT License.
// See LICENSE for details.

//! # Sharevault Harness
//!
//! Entry point for the `sharevault` binary. Parses CLI arguments,
//! initializes logging, and dispatches to one of three subcommands:
//!
//! - `demo`    — run the built-in three-holder demonstration
//! - `run`     — execute a JSON scenario script
//! - `version` — print build version information

mod cli;
mod logging;
mod script;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;

use parking_lot::RwLock;
use sharevault::{demo_token, Asset, ShareBook, ShareRegistry, Treasury, Vault};

use cli::{Commands, SharevaultCli};
use logging::LogFormat;

fn main() -> Result<()> {
    let cli = SharevaultCli::parse();
    logging::init_logging(&cli.log_level, LogFormat::from_str_lossy(&cli.log_format));

    match cli.command {
        Commands::Demo => run_demo(),
        Commands::Run(args) => run_script(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Executes a scenario script and prints each step's outcome.
fn run_script(args: cli::RunArgs) -> Result<()> {
    let text = std::fs::read_to_string(&args.script)
        .with_context(|| format!("failed to read {}", args.script.display()))?;
    let scenario = script::Scenario::from_json(&text)?;
    let outcomes = script::execute(&scenario)?;

    for (index, outcome) in outcomes.iter().enumerate() {
        match outcome {
            script::Outcome::Funded {
                asset,
                amount,
                cumulative,
            } => {
                println!(
                    "{:>3}. fund      {amount:>8} {asset}  (all-time {cumulative})",
                    index + 1
                );
            }
            script::Outcome::Withdrawn {
                holder,
                asset,
                amount,
            } => {
                println!(
                    "{:>3}. withdraw  {amount:>8} {asset}  -> {holder}",
                    index + 1
                );
            }
            script::Outcome::SharesMoved { from, to, amount } => {
                println!(
                    "{:>3}. shares    {amount:>8}  {from} -> {to}",
                    index + 1
                );
            }
        }
    }

    Ok(())
}

/// Runs the built-in demonstration: Alice 20, Bob 30, Carol 50 through two
/// funding cycles, with a mid-cycle share transfer from Carol to Alice.
fn run_demo() -> Result<()> {
    let book = Arc::new(RwLock::new(
        ShareBook::with_holders(&[("alice", 20), ("bob", 30), ("carol", 50)])
            .context("seeding cap table")?,
    ));
    let mut vault = Vault::new(Arc::clone(&book));
    let mut treasury = Treasury::new();
    let token = demo_token();

    println!("sharevault demo: 100 shares across alice (20), bob (30), carol (50)");
    println!();

    // Cycle 1: the vault receives 100 of each asset.
    for asset in [Asset::Native, token] {
        treasury.fund(asset, 100);
        vault.deposit(asset, 100)?;
    }
    println!("cycle 1: vault funded with 100 native and 100 {token}");
    print_withdrawables(&vault, &["alice", "bob", "carol"], &[Asset::Native, token])?;

    // Alice and Bob take their cut; Carol waits.
    for holder in ["alice", "bob"] {
        for asset in [Asset::Native, token] {
            let paid = vault.withdraw(holder, asset, &mut treasury)?;
            println!("  {holder} withdrew {paid} {asset}");
        }
    }

    // Carol sends 30 of her 50 shares to Alice before withdrawing. Her
    // unwithdrawn entitlement travels pro-rata with the shares.
    println!();
    println!("carol sends 30 shares to alice (settling first)");
    vault.on_share_transfer("carol", "alice", 30)?;
    book.write().transfer("carol", "alice", 30)?;
    print_withdrawables(&vault, &["alice", "bob", "carol"], &[Asset::Native, token])?;

    for holder in ["alice", "carol"] {
        for asset in [Asset::Native, token] {
            let paid = vault.withdraw(holder, asset, &mut treasury)?;
            println!("  {holder} withdrew {paid} {asset}");
        }
    }

    // Cycle 2: fresh funding follows the post-transfer split of
    // alice 50, bob 30, carol 20.
    println!();
    println!("cycle 2: vault funded again with 100 of each asset");
    for asset in [Asset::Native, token] {
        treasury.fund(asset, 100);
        vault.deposit(asset, 100)?;
    }
    print_withdrawables(&vault, &["alice", "bob", "carol"], &[Asset::Native, token])?;

    let mut paid_out = 0;
    for holder in ["alice", "bob", "carol"] {
        for asset in [Asset::Native, token] {
            paid_out += vault.withdraw(holder, asset, &mut treasury)?;
        }
    }

    println!();
    println!(
        "done: {} native paid in total, {} still held",
        treasury.total_paid(Asset::Native),
        treasury.held(Asset::Native)
    );
    tracing::debug!(cycle2_paid = paid_out, "demo complete");
    Ok(())
}

/// Prints a small entitlement table for the given holders and assets.
fn print_withdrawables(
    vault: &Vault<Arc<RwLock<ShareBook>>>,
    holders: &[&str],
    assets: &[Asset],
) -> Result<()> {
    println!("  {:<8} {:>8} {:>12}", "holder", "shares", "withdrawable");
    for holder in holders {
        let shares = vault.registry().shares_of(holder);
        let mut cells = Vec::with_capacity(assets.len());
        for &asset in assets {
            cells.push(format!("{} {asset}", vault.withdrawable(holder, asset)?));
        }
        println!("  {:<8} {:>8} {:>12}", holder, shares, cells.join(", "));
    }
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("sharevault {}", env!("CARGO_PKG_VERSION"));
}
