//! # Asset Transfer Primitive
//!
//! Moving value out of vault custody is not the engine's job. The engine
//! decides *how much* each holder is owed; an [`AssetTransfer`]
//! implementation actually moves it. The seam matters for atomicity: the
//! primitive may fail (insufficient custody balance, recipient rejects a
//! native-currency payout), and the vault facade must then roll back the
//! settlement it just recorded.
//!
//! [`Treasury`] is the in-memory implementation used by the test suite and
//! the CLI harness: it tracks what the vault physically holds and what has
//! been paid to whom, which is exactly what the conservation checks need.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::asset::Asset;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure modes of the external payout primitive.
///
/// These are recoverable by the *caller* of `withdraw` (retry later, fix
/// the recipient), never by the engine: the engine's only obligation is to
/// abort the withdrawal atomically.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The vault does not physically hold enough of the asset.
    #[error("insufficient vault balance for {asset}: held {held}, requested {requested}")]
    InsufficientVaultBalance {
        /// The asset being paid out.
        asset: Asset,
        /// Amount currently in vault custody.
        held: u64,
        /// Amount the payout requested.
        requested: u64,
    },

    /// The recipient rejected the payout.
    #[error("recipient {recipient} rejected payout: {reason}")]
    Rejected {
        /// The holder that was being paid.
        recipient: String,
        /// Why the transfer bounced.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// AssetTransfer trait
// ---------------------------------------------------------------------------

/// The "move units of asset A from the vault to account X" primitive.
///
/// Implementations must be all-or-nothing: on `Err`, no value has moved.
pub trait AssetTransfer {
    /// Sends `amount` of `asset` from vault custody to `to`.
    fn send(&mut self, asset: Asset, to: &str, amount: u64) -> Result<(), TransferError>;
}

// ---------------------------------------------------------------------------
// Treasury
// ---------------------------------------------------------------------------

/// In-memory custody ledger: what the vault holds, and what it has paid.
///
/// `fund` mirrors the external deposit path (call it alongside the vault's
/// `deposit` so custody and accounting agree); `send` debits custody and
/// records the payout per holder.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Treasury {
    /// Amount of each asset currently in vault custody.
    #[serde(with = "crate::asset::asset_map")]
    held: HashMap<Asset, u64>,

    /// Cumulative payouts, per asset then per holder.
    #[serde(with = "crate::asset::asset_map")]
    paid: HashMap<Asset, HashMap<String, u64>>,
}

impl Treasury {
    /// Creates an empty treasury.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `amount` of `asset` to custody.
    ///
    /// Custody is bounded by the ledger's cumulative total, which is
    /// overflow-guarded upstream, so saturation here is unreachable in a
    /// consistent harness.
    pub fn fund(&mut self, asset: Asset, amount: u64) {
        let held = self.held.entry(asset).or_insert(0);
        *held = held.saturating_add(amount);
    }

    /// Amount of `asset` currently in custody.
    pub fn held(&self, asset: Asset) -> u64 {
        self.held.get(&asset).copied().unwrap_or(0)
    }

    /// Cumulative amount of `asset` ever paid to `holder`.
    pub fn paid_to(&self, asset: Asset, holder: &str) -> u64 {
        self.paid
            .get(&asset)
            .and_then(|m| m.get(holder))
            .copied()
            .unwrap_or(0)
    }

    /// Cumulative amount of `asset` ever paid out, across all holders.
    pub fn total_paid(&self, asset: Asset) -> u64 {
        self.paid
            .get(&asset)
            .map(|m| m.values().sum())
            .unwrap_or(0)
    }
}

impl AssetTransfer for Treasury {
    fn send(&mut self, asset: Asset, to: &str, amount: u64) -> Result<(), TransferError> {
        let held = self.held.get(&asset).copied().unwrap_or(0);
        if held < amount {
            return Err(TransferError::InsufficientVaultBalance {
                asset,
                held,
                requested: amount,
            });
        }

        self.held.insert(asset, held - amount);
        *self
            .paid
            .entry(asset)
            .or_default()
            .entry(to.to_string())
            .or_insert(0) += amount;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
