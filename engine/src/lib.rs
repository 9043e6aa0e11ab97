// Copyright (c) 2026 Sharevault Contributors. MIT License.

//! # Sharevault — Distribution Accounting Engine
//!
//! A shared vault pools deposits of a native currency and fungible tokens
//! and lets its co-owners -- holders of transferable "shares" -- withdraw
//! their pro-rata portion of everything the vault has ever received. The
//! hard part is not moving the money; it's the bookkeeping that stays
//! correct across repeated funding cycles, partial withdrawals, and share
//! transfers at arbitrary points in between. That bookkeeping is this
//! crate.
//!
//! ## Architecture
//!
//! ```text
//! asset.rs    — Asset model: native currency + content-addressed tokens
//! ledger.rs   — Asset Ledger: monotone cumulative funding totals
//! registry.rs — Share Registry interface + in-memory ShareBook
//! transfer.rs — Asset Transfer primitive + in-memory Treasury
//! engine.rs   — Distribution Engine: checkpoints, accrual, settlement
//! vault.rs    — Vault Facade: deposit / withdrawable / withdraw /
//!               on_share_transfer
//! ```
//!
//! ## Design Principles
//!
//! 1. **All amounts are `u64` in smallest units.** Intermediate products
//!    widen to `u128`; division is floor division; nothing floats.
//! 2. **Current fraction, not historical.** Entitlement for un-settled
//!    value always scales with the fraction held *right now*; share
//!    transfers are made safe by forced settlement of both parties before
//!    the fraction changes, not by per-cycle snapshots.
//! 3. **Effects before interactions.** Settlement state is written before
//!    any external transfer call, and rolled back from a snapshot if that
//!    call fails. Re-entrancy through the payout path is a harmless
//!    zero-withdrawal.
//! 4. **External collaborators stay external.** Share balances and asset
//!    custody are owned by the registry and the transfer primitive; the
//!    engine reads the one and instructs the other, nothing more.

pub mod asset;
pub mod engine;
pub mod ledger;
pub mod registry;
pub mod transfer;
pub mod vault;

pub use asset::{demo_token, Asset, TokenId};
pub use engine::{DistributionEngine, EngineError, Position};
pub use ledger::{AssetLedger, LedgerError};
pub use registry::{ShareBook, ShareBookError, ShareRegistry};
pub use transfer::{AssetTransfer, TransferError, Treasury};
pub use vault::{Vault, VaultError};
