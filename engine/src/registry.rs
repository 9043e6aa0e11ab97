//! # Share Registry Interface
//!
//! Shares are the transferable instrument that defines each co-owner's
//! fraction of the vault. The registry holding them is **external state**:
//! the engine only ever reads it (`shares_of`, `total_shares`) and reacts
//! to its pre-mutation transfer notifications. It never writes share
//! balances -- that keeps ownership between the two subsystems acyclic.
//!
//! [`ShareBook`] is the in-memory implementation used by the test suite and
//! the CLI harness. Production deployments implement [`ShareRegistry`] over
//! whatever actually holds the share token.
//!
//! ## Settle-then-mutate
//!
//! The one protocol obligation a registry carries: before committing any
//! balance change for a transfer, it must invoke the vault's
//! `on_share_transfer(from, to, amount)`. Settling both parties first is
//! what keeps past entitlement from being diluted or inflated by the
//! transfer (see [`crate::vault`]).

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// ShareRegistry trait
// ---------------------------------------------------------------------------

/// Read-only view of share balances, consistent within one engine call.
///
/// Fractions are never cached by the engine; both methods are read at the
/// instant a fraction is needed.
pub trait ShareRegistry {
    /// The holder's current share balance. Zero for unknown holders.
    fn shares_of(&self, holder: &str) -> u64;

    /// Total shares outstanding across all holders.
    fn total_shares(&self) -> u64;
}

impl<R: ShareRegistry + ?Sized> ShareRegistry for &R {
    fn shares_of(&self, holder: &str) -> u64 {
        (**self).shares_of(holder)
    }

    fn total_shares(&self) -> u64 {
        (**self).total_shares()
    }
}

/// Shared-ownership registry, the shape the harness and tests use:
/// the share book lives behind an `Arc<RwLock<_>>` owned by the process,
/// and the vault holds a clone of the handle.
impl ShareRegistry for Arc<RwLock<ShareBook>> {
    fn shares_of(&self, holder: &str) -> u64 {
        self.read().shares_of(holder)
    }

    fn total_shares(&self) -> u64 {
        self.read().total_shares()
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur while mutating a [`ShareBook`].
#[derive(Debug, Error)]
pub enum ShareBookError {
    /// Attempted to transfer more shares than the sender holds.
    #[error("insufficient shares: {holder} holds {available}, requested {requested}")]
    InsufficientShares {
        /// The sending holder.
        holder: String,
        /// Shares currently held.
        available: u64,
        /// Shares requested for transfer.
        requested: u64,
    },

    /// Issuing shares would overflow the total supply.
    #[error("share supply overflow: total {total}, issuing {amount}")]
    SupplyOverflow {
        /// Total shares before the failed issuance.
        total: u64,
        /// The amount that caused the overflow.
        amount: u64,
    },
}

// ---------------------------------------------------------------------------
// ShareBook
// ---------------------------------------------------------------------------

/// In-memory share ledger for tests and the CLI harness.
///
/// Issuance exists so scenarios can set up a cap table; the distribution
/// engine itself never mints, burns, or moves shares.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ShareBook {
    /// Share balances indexed by holder address.
    balances: HashMap<String, u64>,
    /// Total shares outstanding. Invariant: equals the sum of `balances`.
    total: u64,
}

impl ShareBook {
    /// Creates an empty share book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a share book pre-seeded with a cap table.
    pub fn with_holders(holders: &[(&str, u64)]) -> Result<Self, ShareBookError> {
        let mut book = Self::new();
        for &(holder, shares) in holders {
            book.issue(holder, shares)?;
        }
        Ok(book)
    }

    /// Issues `amount` new shares to `holder`, growing the total supply.
    ///
    /// Harness-side setup only; a zero amount is a no-op.
    pub fn issue(&mut self, holder: &str, amount: u64) -> Result<u64, ShareBookError> {
        if amount == 0 {
            return Ok(self.shares_of(holder));
        }

        let new_total = self
            .total
            .checked_add(amount)
            .ok_or(ShareBookError::SupplyOverflow {
                total: self.total,
                amount,
            })?;

        let balance = self.balances.entry(holder.to_string()).or_insert(0);
        // Cannot overflow: the per-holder balance is bounded by the total.
        *balance += amount;
        self.total = new_total;
        Ok(*balance)
    }

    /// Moves `amount` shares from `from` to `to`. Total supply is unchanged.
    ///
    /// Callers must have invoked the vault's `on_share_transfer` first --
    /// this method is the "mutate" half of the settle-then-mutate protocol
    /// and performs no settlement of its own.
    ///
    /// # Errors
    ///
    /// Returns [`ShareBookError::InsufficientShares`] if `from` holds fewer
    /// than `amount` shares; nothing moves.
    pub fn transfer(&mut self, from: &str, to: &str, amount: u64) -> Result<(), ShareBookError> {
        let available = self.shares_of(from);
        if available < amount {
            return Err(ShareBookError::InsufficientShares {
                holder: from.to_string(),
                available,
                requested: amount,
            });
        }
        if amount == 0 {
            return Ok(());
        }

        // `available >= amount > 0` guarantees the sender entry exists.
        *self.balances.entry(from.to_string()).or_insert(0) -= amount;
        *self.balances.entry(to.to_string()).or_insert(0) += amount;
        Ok(())
    }

    /// All holders with a nonzero balance, as `(holder, shares)` pairs.
    pub fn holders(&self) -> Vec<(String, u64)> {
        self.balances
            .iter()
            .filter(|(_, &shares)| shares > 0)
            .map(|(holder, &shares)| (holder.clone(), shares))
            .collect()
    }
}

impl ShareRegistry for ShareBook {
    fn shares_of(&self, holder: &str) -> u64 {
        self.balances.get(holder).copied().unwrap_or(0)
    }

    fn total_shares(&self) -> u64 {
        self.total
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_book_is_empty() {
        let book = ShareBook::new();
        assert_eq!(book.total_shares(), 0);
        assert_eq!(book.shares_of("alice"), 0);
        assert!(book.holders().is_empty());
    }

    #[test]
    fn issue_grows_balance_and_supply() {
        let mut book = ShareBook::new();
        assert_eq!(book.issue("alice", 20).unwrap(), 20);
        assert_eq!(book.issue("alice", 10).unwrap(), 30);
        assert_eq!(book.shares_of("alice"), 30);
        assert_eq!(book.total_shares(), 30);
    }

    #[test]
    fn with_holders_seeds_cap_table() {
        let book =
            ShareBook::with_holders(&[("alice", 20), ("bob", 30), ("carol", 50)]).unwrap();
        assert_eq!(book.total_shares(), 100);
        assert_eq!(book.shares_of("carol"), 50);
    }

    #[test]
    fn issue_overflow_rejected() {
        let mut book = ShareBook::new();
        book.issue("alice", u64::MAX).unwrap();
        assert!(matches!(
            book.issue("bob", 1),
            Err(ShareBookError::SupplyOverflow { .. })
        ));
        assert_eq!(book.total_shares(), u64::MAX);
    }

    #[test]
    fn transfer_moves_shares_supply_constant() {
        let mut book = ShareBook::with_holders(&[("alice", 20), ("bob", 30)]).unwrap();

        book.transfer("alice", "bob", 10).unwrap();
        assert_eq!(book.shares_of("alice"), 10);
        assert_eq!(book.shares_of("bob"), 40);
        assert_eq!(book.total_shares(), 50);
    }

    #[test]
    fn transfer_to_new_holder_creates_entry() {
        let mut book = ShareBook::with_holders(&[("alice", 20)]).unwrap();
        book.transfer("alice", "dave", 5).unwrap();
        assert_eq!(book.shares_of("dave"), 5);
    }

    #[test]
    fn transfer_insufficient_rejected() {
        let mut book = ShareBook::with_holders(&[("alice", 20)]).unwrap();
        let result = book.transfer("alice", "bob", 21);
        assert!(matches!(
            result,
            Err(ShareBookError::InsufficientShares {
                available: 20,
                requested: 21,
                ..
            })
        ));
        assert_eq!(book.shares_of("alice"), 20);
    }

    #[test]
    fn registry_through_shared_handle() {
        let book = Arc::new(RwLock::new(
            ShareBook::with_holders(&[("alice", 20), ("bob", 80)]).unwrap(),
        ));

        // Read through the handle the way the vault does.
        assert_eq!(book.total_shares(), 100);
        assert_eq!(book.shares_of("alice"), 20);

        book.write().transfer("alice", "bob", 20).unwrap();
        assert_eq!(book.shares_of("alice"), 0);
        assert_eq!(book.shares_of("bob"), 100);
    }

    #[test]
    fn share_book_serialization_roundtrip() {
        let book = ShareBook::with_holders(&[("alice", 20), ("bob", 30)]).unwrap();
        let json = serde_json::to_string(&book).expect("serialize");
        let recovered: ShareBook = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(recovered.total_shares(), 50);
        assert_eq!(recovered.shares_of("bob"), 30);
    }
}
