//! # Vault Facade
//!
//! Thin orchestration over the [`AssetLedger`](crate::ledger::AssetLedger)
//! and the [`DistributionEngine`](crate::engine::DistributionEngine). The
//! four entry points -- `deposit`, `withdrawable`, `withdraw`,
//! `on_share_transfer` -- are the entire public surface collaborators need.
//!
//! ## Execution model
//!
//! Calls are serialized and atomic: each entry point either completes
//! fully or fails with all state exactly as before. There is no partial
//! mutation to observe and no internal retry -- errors surface
//! synchronously to whoever triggered them.
//!
//! ## Checkpoint-before-payout
//!
//! `withdraw` records the settlement (checkpoint advanced, accrued bucket
//! emptied) *before* invoking the external transfer primitive. A
//! re-entrant call arriving through that primitive sees already-settled
//! state and is a harmless zero-withdrawal. If the primitive fails, the
//! recorded settlement is rolled back from a snapshot, so no value leaks
//! in either direction.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::asset::Asset;
use crate::engine::{DistributionEngine, EngineError};
use crate::ledger::{AssetLedger, LedgerError};
use crate::registry::ShareRegistry;
use crate::transfer::{AssetTransfer, TransferError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors surfaced by the vault's entry points.
#[derive(Debug, Error)]
pub enum VaultError {
    /// Funding bookkeeping failed (cumulative-total overflow).
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Entitlement computation failed (zero share supply, overflow).
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The external payout primitive rejected the transfer. The withdraw
    /// call has been rolled back; checkpoint and accrued state are exactly
    /// as before the call.
    #[error("payout failed: {0}")]
    Transfer(#[from] TransferError),
}

// ---------------------------------------------------------------------------
// Vault
// ---------------------------------------------------------------------------

/// A shared vault: pooled deposits, pro-rata withdrawal rights.
///
/// Generic over the share registry so tests can hand it a plain
/// [`ShareBook`](crate::registry::ShareBook) while the harness shares one
/// behind `Arc<parking_lot::RwLock<_>>`. The registry is read-only from
/// the vault's side; share balances are mutated externally, after
/// [`on_share_transfer`](Self::on_share_transfer) has run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Vault<R> {
    registry: R,
    ledger: AssetLedger,
    engine: DistributionEngine,
}

impl<R: ShareRegistry> Vault<R> {
    /// Creates a vault over an externally owned share registry.
    pub fn new(registry: R) -> Self {
        Self {
            registry,
            ledger: AssetLedger::new(),
            engine: DistributionEngine::new(),
        }
    }

    /// Read access to the share registry handle.
    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Read access to the funding ledger.
    pub fn ledger(&self) -> &AssetLedger {
        &self.ledger
    }

    /// Records a funding event for `asset` and returns the new cumulative
    /// total. Zero amounts are accepted as no-ops so idempotent deposit
    /// paths can call in blindly.
    ///
    /// # Errors
    ///
    /// [`VaultError::Ledger`] on cumulative-total overflow (fatal
    /// configuration error; no state change).
    pub fn deposit(&mut self, asset: Asset, amount: u64) -> Result<u64, VaultError> {
        let total = self.ledger.record_funding(asset, amount)?;
        if amount > 0 {
            debug!(%asset, amount, cumulative = total, "funding recorded");
        }
        Ok(total)
    }

    /// The amount `holder` could withdraw of `asset` right now, at the
    /// holder's current share fraction.
    pub fn withdrawable(&self, holder: &str, asset: Asset) -> Result<u64, VaultError> {
        let cumulative = self.ledger.cumulative_received(asset);
        Ok(self
            .engine
            .withdrawable(&self.registry, cumulative, holder, asset)?)
    }

    /// Pays out `holder`'s full withdrawable amount of `asset` through
    /// `sink` and returns the amount paid.
    ///
    /// A zero withdrawable amount returns `Ok(0)` with no side effects --
    /// "cannot withdraw now" is a successful no-op, so calling twice in a
    /// row without an intervening funding event is harmless.
    ///
    /// # Errors
    ///
    /// [`VaultError::Transfer`] if the payout primitive rejects the
    /// transfer; the settlement is rolled back and the call leaves no
    /// trace. [`VaultError::Engine`] on configuration errors.
    pub fn withdraw(
        &mut self,
        holder: &str,
        asset: Asset,
        sink: &mut dyn AssetTransfer,
    ) -> Result<u64, VaultError> {
        let cumulative = self.ledger.cumulative_received(asset);
        let amount = self
            .engine
            .withdrawable(&self.registry, cumulative, holder, asset)?;
        if amount == 0 {
            debug!(holder, %asset, "nothing to withdraw");
            return Ok(0);
        }

        // Effects before interactions: settle first, pay second.
        let snapshot = self.engine.snapshot(holder, asset);
        self.engine.mark_paid(holder, asset, cumulative);

        if let Err(e) = sink.send(asset, holder, amount) {
            self.engine.restore(holder, asset, snapshot);
            warn!(holder, %asset, amount, error = %e, "payout bounced; settlement rolled back");
            return Err(e.into());
        }

        info!(holder, %asset, amount, "payout settled");
        Ok(amount)
    }

    /// Forced settlement for a share transfer of `transferred` shares from
    /// `from` to `to`.
    ///
    /// The registry must invoke this strictly *before* committing the
    /// balance mutation. Both parties' pending entitlements are realized
    /// at their pre-transfer fractions for every asset the vault has ever
    /// received, and the sender's accrued-unclaimed bucket travels
    /// pro-rata with the transferred shares. No value is paid out.
    pub fn on_share_transfer(
        &mut self,
        from: &str,
        to: &str,
        transferred: u64,
    ) -> Result<(), VaultError> {
        let assets: Vec<(Asset, u64)> = self
            .ledger
            .tracked_assets()
            .map(|asset| (asset, self.ledger.cumulative_received(asset)))
            .collect();

        self.engine
            .settle_transfer(&self.registry, &assets, from, to, transferred)?;

        debug!(from, to, transferred, assets = assets.len(), "transfer settled");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
