//! # Node Core
//!
//! Per-node state layered over [`poset::Poset`]: head tracking, the
//! transaction and block-signature pools, and the operations the gossip
//! driver and commit loop call each tick (`AddSelfEvent`, `EventDiff`,
//! `Sync`, `KnownEvents`, `ToWire`, `FastForward`).
//!
//! Pool shape is grounded in a mempool's two-phase-commit pattern
//! (drain/restore in place of propose/rollback); everything else is new
//! glue between `poset` and the sync/transport layer.

mod core;
mod pools;
mod wire;

pub use core::{Core, DEFAULT_POOL_CAPACITY};
pub use pools::{BlockSignaturePool, PoolFull, TransactionPool};
pub use wire::{event_to_wire, wire_to_event};
