//! # Distribution Engine
//!
//! The bookkeeping that makes a shared vault safe to co-own. For each
//! (holder, asset) pair the engine keeps a [`Position`]:
//!
//! - `checkpoint` -- the asset's cumulative-received total at the moment
//!   this holder's entitlement was last fully reconciled, and
//! - `accrued` -- entitlement realized by a forced settlement but not yet
//!   paid out.
//!
//! A holder's withdrawable amount is then
//!
//! ```text
//! accrued + shares_of(holder) * (cumulative - checkpoint) / total_shares
//! ```
//!
//! evaluated with the holder's *current* fraction, read from the registry
//! at the instant of use. Using the current fraction is the central design
//! choice: it means no historical snapshot per funding event is needed,
//! provided every share transfer first settles both parties (converting
//! "unrealized entitlement at the old fraction" into `accrued` before the
//! fraction changes).
//!
//! ## Rounding
//!
//! All division is integer floor division with a `u128` intermediate, so
//! no precision is lost before the final divide. The remainder is
//! forfeited to no one: total under-distribution per asset per settlement
//! round is strictly less than `total_shares` units, and a holder balance
//! can never round negative or above its exact entitlement.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::asset::Asset;
use crate::registry::ShareRegistry;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur while computing or settling entitlements.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The registry reports zero total shares where a fraction is needed.
    ///
    /// Should be unreachable for a correctly initialized vault (mint/burn
    /// policy is out of scope and the supply is assumed constant), but a
    /// division by zero here would be a silent entitlement corruption, so
    /// it is guarded as a fatal configuration error.
    #[error("total shares is zero; vault share supply was never initialized")]
    ZeroTotalShares,

    /// A holder's entitlement arithmetic overflowed `u64`.
    ///
    /// Only reachable if the registry reports a holder owning more shares
    /// than the total, or accrued totals near `u64::MAX` -- both indicate
    /// a misconfigured collaborator, not a recoverable condition.
    #[error("entitlement overflow for {holder} on {asset}")]
    EntitlementOverflow {
        /// The holder whose entitlement overflowed.
        holder: String,
        /// The asset being computed.
        asset: Asset,
    },
}

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// Settlement state for one (holder, asset) pair.
///
/// Created lazily on first interaction; a missing position reads as
/// `checkpoint = 0, accrued = 0`, which is exactly the state of a holder
/// who has never interacted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Cumulative-received total at the last full reconciliation.
    /// Invariant: never exceeds the asset's current cumulative total.
    pub checkpoint: u64,

    /// Entitlement realized by settlement but not yet paid out.
    pub accrued: u64,
}

// ---------------------------------------------------------------------------
// DistributionEngine
// ---------------------------------------------------------------------------

/// Per-(asset, holder) settlement checkpoints and accrued-unclaimed
/// buckets. Pure accounting: the engine never touches share balances or
/// moves value; it only decides amounts.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DistributionEngine {
    /// Positions indexed by asset, then by holder address.
    #[serde(with = "crate::asset::asset_map")]
    positions: HashMap<Asset, HashMap<String, Position>>,
}

/// Floor of `shares * delta / total` with a `u128` intermediate.
fn pro_rata(
    shares: u64,
    delta: u64,
    total: u64,
    holder: &str,
    asset: Asset,
) -> Result<u64, EngineError> {
    if total == 0 {
        return Err(EngineError::ZeroTotalShares);
    }
    let scaled = (shares as u128) * (delta as u128) / (total as u128);
    u64::try_from(scaled).map_err(|_| EngineError::EntitlementOverflow {
        holder: holder.to_string(),
        asset,
    })
}

impl DistributionEngine {
    /// Creates an engine with no recorded positions.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current position for a (holder, asset) pair.
    pub fn position(&self, holder: &str, asset: Asset) -> Position {
        self.positions
            .get(&asset)
            .and_then(|m| m.get(holder))
            .copied()
            .unwrap_or_default()
    }

    fn set_position(&mut self, holder: &str, asset: Asset, position: Position) {
        self.positions
            .entry(asset)
            .or_default()
            .insert(holder.to_string(), position);
    }

    /// Entitlement accrued since the holder's checkpoint, at the holder's
    /// current fraction. Excludes the already-realized `accrued` bucket.
    fn pending<R: ShareRegistry>(
        &self,
        registry: &R,
        cumulative: u64,
        holder: &str,
        asset: Asset,
    ) -> Result<u64, EngineError> {
        let position = self.position(holder, asset);
        // checkpoint <= cumulative by construction; saturate so a stale
        // snapshot can never mint value.
        let delta = cumulative.saturating_sub(position.checkpoint);
        pro_rata(
            registry.shares_of(holder),
            delta,
            registry.total_shares(),
            holder,
            asset,
        )
    }

    /// The amount the holder could withdraw right now:
    /// `accrued + fraction * (cumulative - checkpoint)`.
    pub fn withdrawable<R: ShareRegistry>(
        &self,
        registry: &R,
        cumulative: u64,
        holder: &str,
        asset: Asset,
    ) -> Result<u64, EngineError> {
        let pending = self.pending(registry, cumulative, holder, asset)?;
        self.position(holder, asset)
            .accrued
            .checked_add(pending)
            .ok_or_else(|| EngineError::EntitlementOverflow {
                holder: holder.to_string(),
                asset,
            })
    }

    /// Realizes the holder's pending entitlement into the accrued bucket
    /// and advances the checkpoint. Withdrawable amount is unchanged by
    /// settlement; only its composition shifts. Returns the newly realized
    /// amount. Idempotent until the next funding event.
    pub fn settle<R: ShareRegistry>(
        &mut self,
        registry: &R,
        cumulative: u64,
        holder: &str,
        asset: Asset,
    ) -> Result<u64, EngineError> {
        let pending = self.pending(registry, cumulative, holder, asset)?;
        let position = self.position(holder, asset);
        let accrued = position.accrued.checked_add(pending).ok_or_else(|| {
            EngineError::EntitlementOverflow {
                holder: holder.to_string(),
                asset,
            }
        })?;
        self.set_position(
            holder,
            asset,
            Position {
                checkpoint: cumulative,
                accrued,
            },
        );
        Ok(pending)
    }

    /// Forced settlement for a share transfer, strictly before the
    /// registry mutates balances.
    ///
    /// For every `(asset, cumulative)` pair given:
    /// 1. settle `from` at its old (pre-transfer) fraction,
    /// 2. settle `to` so pre-ownership value can never reach it,
    /// 3. carry `accrued(from) * transferred / shares_of(from)` (floor)
    ///    from the sender's accrued bucket to the receiver's -- the
    ///    entitlement attaches to share history and travels with the
    ///    shares.
    ///
    /// All updates are staged first and applied only if every asset
    /// settles cleanly, so the call is atomic.
    pub fn settle_transfer<R: ShareRegistry>(
        &mut self,
        registry: &R,
        assets: &[(Asset, u64)],
        from: &str,
        to: &str,
        transferred: u64,
    ) -> Result<(), EngineError> {
        if from == to {
            // Degenerate self-transfer: settling once per asset is the
            // whole effect; nothing can be carried.
            for &(asset, cumulative) in assets {
                self.settle(registry, cumulative, from, asset)?;
            }
            return Ok(());
        }

        let sender_shares = registry.shares_of(from);

        let mut staged = Vec::with_capacity(assets.len());
        for &(asset, cumulative) in assets {
            let from_pending = self.pending(registry, cumulative, from, asset)?;
            let to_pending = self.pending(registry, cumulative, to, asset)?;

            let overflow = |holder: &str| EngineError::EntitlementOverflow {
                holder: holder.to_string(),
                asset,
            };

            let from_settled = self
                .position(from, asset)
                .accrued
                .checked_add(from_pending)
                .ok_or_else(|| overflow(from))?;
            let to_settled = self
                .position(to, asset)
                .accrued
                .checked_add(to_pending)
                .ok_or_else(|| overflow(to))?;

            let carried = if sender_shares == 0 {
                0
            } else {
                let slice =
                    (from_settled as u128) * (transferred as u128) / (sender_shares as u128);
                // A transfer larger than the sender's balance will be
                // rejected by the registry; clamp so even a misordered
                // caller cannot drive the sender's bucket negative.
                slice.min(from_settled as u128) as u64
            };

            let to_accrued = to_settled.checked_add(carried).ok_or_else(|| overflow(to))?;
            staged.push((
                asset,
                Position {
                    checkpoint: cumulative,
                    accrued: from_settled - carried,
                },
                Position {
                    checkpoint: cumulative,
                    accrued: to_accrued,
                },
            ));
        }

        for (asset, from_position, to_position) in staged {
            self.set_position(from, asset, from_position);
            self.set_position(to, asset, to_position);
        }
        Ok(())
    }

    /// Records a completed payout: checkpoint jumps to the current
    /// cumulative total and the accrued bucket empties, making the
    /// holder's withdrawable amount zero until the next funding event.
    ///
    /// The facade calls this *before* invoking the external transfer
    /// primitive (effects before interactions); a re-entrant call observes
    /// the already-settled position and can no longer double-withdraw.
    pub fn mark_paid(&mut self, holder: &str, asset: Asset, cumulative: u64) {
        self.set_position(
            holder,
            asset,
            Position {
                checkpoint: cumulative,
                accrued: 0,
            },
        );
    }

    /// Captures a position so it can be restored if the payout bounces.
    pub fn snapshot(&self, holder: &str, asset: Asset) -> Position {
        self.position(holder, asset)
    }

    /// Restores a position captured by [`snapshot`](Self::snapshot).
    pub fn restore(&mut self, holder: &str, asset: Asset, snapshot: Position) {
        self.set_position(holder, asset, snapshot);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ShareBook;

    fn catalogue_book() -> ShareBook {
        ShareBook::with_holders(&[("alice", 20), ("bob", 30), ("carol", 50)]).unwrap()
    }

    #[test]
    fn untouched_holder_has_zero_position() {
        let engine = DistributionEngine::new();
        let position = engine.position("alice", Asset::Native);
        assert_eq!(position, Position::default());
    }

    #[test]
    fn withdrawable_is_pro_rata() {
        let engine = DistributionEngine::new();
        let book = catalogue_book();

        let alice = engine
            .withdrawable(&book, 100, "alice", Asset::Native)
            .unwrap();
        let bob = engine
            .withdrawable(&book, 100, "bob", Asset::Native)
            .unwrap();
        let carol = engine
            .withdrawable(&book, 100, "carol", Asset::Native)
            .unwrap();

        assert_eq!((alice, bob, carol), (20, 30, 50));
    }

    #[test]
    fn stranger_is_owed_nothing() {
        let engine = DistributionEngine::new();
        let book = catalogue_book();
        assert_eq!(
            engine
                .withdrawable(&book, 100, "mallory", Asset::Native)
                .unwrap(),
            0
        );
    }

    #[test]
    fn zero_total_shares_is_guarded() {
        let engine = DistributionEngine::new();
        let book = ShareBook::new();
        let result = engine.withdrawable(&book, 100, "alice", Asset::Native);
        assert!(matches!(result, Err(EngineError::ZeroTotalShares)));
    }

    #[test]
    fn rounding_floors_and_is_bounded() {
        let engine = DistributionEngine::new();
        let book = ShareBook::with_holders(&[("a", 1), ("b", 1), ("c", 1)]).unwrap();

        let each = engine.withdrawable(&book, 100, "a", Asset::Native).unwrap();
        assert_eq!(each, 33);

        // Under-distribution across one settlement round < total_shares.
        assert!(100 - 3 * each < book.total_shares());
    }

    #[test]
    fn large_values_use_wide_intermediate() {
        let engine = DistributionEngine::new();
        let book = ShareBook::with_holders(&[("whale", u64::MAX / 2), ("rest", u64::MAX / 2)])
            .unwrap();

        // shares * delta overflows u64 but not u128.
        let amount = engine
            .withdrawable(&book, u64::MAX / 3, "whale", Asset::Native)
            .unwrap();
        assert_eq!(amount, u64::MAX / 3 / 2);
    }

    #[test]
    fn settle_preserves_withdrawable() {
        let mut engine = DistributionEngine::new();
        let book = catalogue_book();

        let before = engine
            .withdrawable(&book, 100, "bob", Asset::Native)
            .unwrap();
        let realized = engine.settle(&book, 100, "bob", Asset::Native).unwrap();
        let after = engine
            .withdrawable(&book, 100, "bob", Asset::Native)
            .unwrap();

        assert_eq!(realized, 30);
        assert_eq!(before, after);
        assert_eq!(engine.position("bob", Asset::Native).checkpoint, 100);
        assert_eq!(engine.position("bob", Asset::Native).accrued, 30);
    }

    #[test]
    fn settle_is_idempotent_between_fundings() {
        let mut engine = DistributionEngine::new();
        let book = catalogue_book();

        engine.settle(&book, 100, "bob", Asset::Native).unwrap();
        let second = engine.settle(&book, 100, "bob", Asset::Native).unwrap();
        assert_eq!(second, 0);
        assert_eq!(engine.position("bob", Asset::Native).accrued, 30);
    }

    #[test]
    fn mark_paid_zeroes_entitlement() {
        let mut engine = DistributionEngine::new();
        let book = catalogue_book();

        engine.settle(&book, 100, "carol", Asset::Native).unwrap();
        engine.mark_paid("carol", Asset::Native, 100);

        assert_eq!(
            engine
                .withdrawable(&book, 100, "carol", Asset::Native)
                .unwrap(),
            0
        );
    }

    #[test]
    fn snapshot_restore_roundtrip() {
        let mut engine = DistributionEngine::new();
        let book = catalogue_book();

        engine.settle(&book, 100, "carol", Asset::Native).unwrap();
        let saved = engine.snapshot("carol", Asset::Native);

        engine.mark_paid("carol", Asset::Native, 100);
        engine.restore("carol", Asset::Native, saved);

        assert_eq!(engine.position("carol", Asset::Native), saved);
        assert_eq!(
            engine
                .withdrawable(&book, 100, "carol", Asset::Native)
                .unwrap(),
            50
        );
    }

    #[test]
    fn transfer_settlement_carries_pro_rata_slice() {
        // Carol (50 of 100 shares, nothing settled) sends 30 shares to
        // Alice (checkpoint already at 100). Carol keeps 20/50 of her
        // pending 50; Alice receives 30/50 of it.
        let mut engine = DistributionEngine::new();
        let book =
            ShareBook::with_holders(&[("alice", 10), ("bob", 40), ("carol", 50)]).unwrap();
        engine.mark_paid("alice", Asset::Native, 100);

        engine
            .settle_transfer(&book, &[(Asset::Native, 100)], "carol", "alice", 30)
            .unwrap();

        assert_eq!(engine.position("carol", Asset::Native).accrued, 20);
        assert_eq!(engine.position("alice", Asset::Native).accrued, 30);
        assert_eq!(engine.position("carol", Asset::Native).checkpoint, 100);
        assert_eq!(engine.position("alice", Asset::Native).checkpoint, 100);
    }

    #[test]
    fn transfer_from_zero_share_holder_carries_nothing() {
        let mut engine = DistributionEngine::new();
        let book = catalogue_book();

        engine
            .settle_transfer(&book, &[(Asset::Native, 100)], "mallory", "alice", 10)
            .unwrap();

        assert_eq!(engine.position("mallory", Asset::Native).accrued, 0);
        // Alice was still settled at her own fraction.
        assert_eq!(engine.position("alice", Asset::Native).accrued, 20);
    }

    #[test]
    fn self_transfer_does_not_double_count() {
        let mut engine = DistributionEngine::new();
        let book = catalogue_book();

        engine
            .settle_transfer(&book, &[(Asset::Native, 100)], "bob", "bob", 10)
            .unwrap();

        assert_eq!(engine.position("bob", Asset::Native).accrued, 30);
        assert_eq!(
            engine
                .withdrawable(&book, 100, "bob", Asset::Native)
                .unwrap(),
            30
        );
    }

    #[test]
    fn engine_serialization_roundtrip() {
        let mut engine = DistributionEngine::new();
        let book = catalogue_book();
        engine.settle(&book, 100, "bob", Asset::Native).unwrap();

        let json = serde_json::to_string(&engine).expect("serialize");
        let recovered: DistributionEngine = serde_json::from_str(&json).expect("deserialize");

        assert_eq!(recovered.position("bob", Asset::Native).accrued, 30);
    }
}
