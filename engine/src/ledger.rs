//! # Asset Ledger
//!
//! Tracks, per asset, the total amount of value the vault has **ever**
//! received. The cumulative total is monotone: it only moves on funding
//! events, and only upward. Holder entitlements are computed against this
//! total elsewhere ([`crate::engine`]) -- the ledger itself knows nothing
//! about shares or holders.
//!
//! A zero-amount funding event is a successful no-op, not an error, so
//! idempotent external deposit paths can call in blindly. Overflow of the
//! running total is a fatal configuration error: letting it wrap would
//! silently corrupt every holder's entitlement at once.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::asset::Asset;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur while recording funding.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The cumulative-received total would exceed `u64::MAX`.
    ///
    /// This is a configuration-level failure: the vault has been funded
    /// with unrealistically large amounts for the chosen unit. The call
    /// aborts with no state change.
    #[error("cumulative total overflow for {asset}: current {current}, funding {amount}")]
    CumulativeOverflow {
        /// The asset whose total would overflow.
        asset: Asset,
        /// The cumulative total before the failed funding event.
        current: u64,
        /// The amount that caused the overflow.
        amount: u64,
    },
}

// ---------------------------------------------------------------------------
// FundingTotal
// ---------------------------------------------------------------------------

/// Per-asset funding history.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FundingTotal {
    /// Total amount of this asset ever received, across all funding events.
    /// Never decreases.
    pub cumulative_received: u64,

    /// Number of non-zero funding events recorded for this asset.
    pub funding_events: u64,

    /// Timestamp of the most recent funding event.
    pub last_funded_at: DateTime<Utc>,
}

impl FundingTotal {
    fn new(amount: u64) -> Self {
        Self {
            cumulative_received: amount,
            funding_events: 1,
            last_funded_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// AssetLedger
// ---------------------------------------------------------------------------

/// The complete funding record of a vault: one [`FundingTotal`] per asset
/// the vault has ever received.
///
/// Entries are created lazily on the first non-zero funding event. An asset
/// with no entry has a cumulative total of zero.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AssetLedger {
    /// Funding totals indexed by asset.
    #[serde(with = "crate::asset::asset_map")]
    totals: HashMap<Asset, FundingTotal>,
}

impl AssetLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self {
            totals: HashMap::new(),
        }
    }

    /// Records a funding event: `cumulative_received(asset) += amount`.
    ///
    /// Returns the new cumulative total. A zero `amount` returns the
    /// current total without creating an entry or counting an event.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::CumulativeOverflow`] if the total would
    /// exceed `u64::MAX`; the ledger is left untouched.
    pub fn record_funding(&mut self, asset: Asset, amount: u64) -> Result<u64, LedgerError> {
        if amount == 0 {
            return Ok(self.cumulative_received(asset));
        }

        match self.totals.get_mut(&asset) {
            Some(total) => {
                let new_total = total
                    .cumulative_received
                    .checked_add(amount)
                    .ok_or(LedgerError::CumulativeOverflow {
                        asset,
                        current: total.cumulative_received,
                        amount,
                    })?;
                total.cumulative_received = new_total;
                total.funding_events += 1;
                total.last_funded_at = Utc::now();
                Ok(new_total)
            }
            None => {
                self.totals.insert(asset, FundingTotal::new(amount));
                Ok(amount)
            }
        }
    }

    /// Returns the cumulative total ever received for an asset.
    /// Zero for an asset that has never been funded.
    pub fn cumulative_received(&self, asset: Asset) -> u64 {
        self.totals
            .get(&asset)
            .map(|t| t.cumulative_received)
            .unwrap_or(0)
    }

    /// Returns the full funding record for an asset, if any exists.
    pub fn funding_total(&self, asset: Asset) -> Option<&FundingTotal> {
        self.totals.get(&asset)
    }

    /// Iterates over every asset the vault has ever received.
    ///
    /// Transfer settlement walks this set: an asset with no funding history
    /// has nothing to settle.
    pub fn tracked_assets(&self) -> impl Iterator<Item = Asset> + '_ {
        self.totals.keys().copied()
    }

    /// Number of distinct assets ever funded.
    pub fn asset_count(&self) -> usize {
        self.totals.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
