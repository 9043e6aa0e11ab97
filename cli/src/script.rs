//! # Scenario Scripts
//!
//! A scenario script is a JSON document describing an initial cap table and
//! a sequence of vault operations. The `run` subcommand executes one against
//! a fresh vault and in-memory treasury, reporting each step's outcome.
//!
//! ```json
//! {
//!   "holders": [
//!     { "address": "alice", "shares": 20 },
//!     { "address": "bob", "shares": 30 },
//!     { "address": "carol", "shares": 50 }
//!   ],
//!   "steps": [
//!     { "op": "fund", "asset": "native", "amount": 100 },
//!     { "op": "withdraw", "holder": "alice", "asset": "native" },
//!     { "op": "transfer_shares", "from": "carol", "to": "alice", "amount": 30 }
//!   ]
//! }
//! ```
//!
//! Asset keys use the engine's string form: `native`, `token:<64 hex>`, or
//! the shorthand `demo` for the built-in demonstration token.

use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::RwLock;
use serde::Deserialize;

use sharevault::{demo_token, Asset, ShareBook, ShareRegistry, Treasury, Vault};

// ---------------------------------------------------------------------------
// Script format
// ---------------------------------------------------------------------------

/// A complete scenario: cap table plus ordered steps.
#[derive(Debug, Deserialize)]
pub struct Scenario {
    /// Initial share holders.
    pub holders: Vec<Holder>,
    /// Operations to execute in order.
    pub steps: Vec<Step>,
}

/// One entry in the initial cap table.
#[derive(Debug, Deserialize)]
pub struct Holder {
    /// Holder address.
    pub address: String,
    /// Shares issued at setup.
    pub shares: u64,
}

/// One scripted vault operation.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// The vault receives `amount` of `asset`.
    Fund { asset: String, amount: u64 },
    /// `holder` withdraws their full entitlement of `asset`.
    Withdraw { holder: String, asset: String },
    /// `from` sends `amount` shares to `to`, settling both sides first.
    TransferShares {
        from: String,
        to: String,
        amount: u64,
    },
}

/// Outcome of one executed step, in script order.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Funding recorded; `cumulative` is the new all-time total.
    Funded {
        asset: Asset,
        amount: u64,
        cumulative: u64,
    },
    /// Withdrawal settled; `amount` may be zero.
    Withdrawn {
        holder: String,
        asset: Asset,
        amount: u64,
    },
    /// Shares moved after settlement.
    SharesMoved {
        from: String,
        to: String,
        amount: u64,
    },
}

impl Scenario {
    /// Parses a scenario from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("invalid scenario script")
    }
}

fn parse_asset(key: &str) -> Result<Asset> {
    if key == "demo" {
        return Ok(demo_token());
    }
    Asset::from_key(key).with_context(|| format!("bad asset key {key:?}"))
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// Executes a scenario against a fresh vault and treasury, returning the
/// per-step outcomes. Execution stops at the first failing step.
pub fn execute(scenario: &Scenario) -> Result<Vec<Outcome>> {
    let mut book = ShareBook::new();
    for holder in &scenario.holders {
        book.issue(&holder.address, holder.shares)
            .with_context(|| format!("issuing shares to {}", holder.address))?;
    }
    let book = Arc::new(RwLock::new(book));
    let mut vault = Vault::new(Arc::clone(&book));
    let mut treasury = Treasury::new();

    tracing::info!(
        holders = scenario.holders.len(),
        total_shares = book.total_shares(),
        "scenario started"
    );

    let mut outcomes = Vec::with_capacity(scenario.steps.len());
    for (index, step) in scenario.steps.iter().enumerate() {
        let outcome = execute_step(step, &mut vault, &book, &mut treasury)
            .with_context(|| format!("step {} failed", index + 1))?;
        outcomes.push(outcome);
    }

    Ok(outcomes)
}

fn execute_step(
    step: &Step,
    vault: &mut Vault<Arc<RwLock<ShareBook>>>,
    book: &Arc<RwLock<ShareBook>>,
    treasury: &mut Treasury,
) -> Result<Outcome> {
    match step {
        Step::Fund { asset, amount } => {
            let asset = parse_asset(asset)?;
            treasury.fund(asset, *amount);
            vault.deposit(asset, *amount)?;
            Ok(Outcome::Funded {
                asset,
                amount: *amount,
                cumulative: vault.ledger().cumulative_received(asset),
            })
        }
        Step::Withdraw { holder, asset } => {
            let asset = parse_asset(asset)?;
            let amount = vault.withdraw(holder, asset, treasury)?;
            Ok(Outcome::Withdrawn {
                holder: holder.clone(),
                asset,
                amount,
            })
        }
        Step::TransferShares { from, to, amount } => {
            // Check the balance before settling so a doomed transfer
            // leaves no trace in the engine.
            let available = book.shares_of(from);
            if available < *amount {
                anyhow::bail!(
                    "{from} holds {available} shares, cannot transfer {amount}"
                );
            }
            vault.on_share_transfer(from, to, *amount)?;
            book.write().transfer(from, to, *amount)?;
            Ok(Outcome::SharesMoved {
                from: from.clone(),
                to: to.clone(),
                amount: *amount,
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
