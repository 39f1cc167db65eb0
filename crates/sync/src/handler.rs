//! # Server-side request handling
//!
//! [`SyncHandler`] is the seam between this crate's transport and
//! `node-core`'s `Core`: `sync` never depends on `node-core` directly (the
//! `node` binary implements this trait over its running `Core` instead),
//! so the wire format and the consensus engine can change independently.

use shared_types::{Block, BlockSignature, Frame, WireEvent};
use std::collections::BTreeMap;

/// Everything the listener needs from the local node to answer a peer's
/// call. Implemented once, over `Arc<Core>`, by the `node` binary.
pub trait SyncHandler: Send + Sync {
    /// This node's participant id, echoed in every response as `from_id`.
    fn self_id(&self) -> u64;

    /// This node's `KnownEvents` snapshot.
    fn known_events(&self) -> Result<BTreeMap<u64, u64>, String>;

    /// The wire events the caller is missing, given its `known` map,
    /// topologically ordered.
    fn event_diff(&self, known: &BTreeMap<u64, u64>) -> Result<Vec<WireEvent>, String>;

    /// Inserts pushed events. Returns `false` (not an error) if any event
    /// failed to insert — a forked or malformed push from a peer is
    /// logged and reported, not treated as a transport failure.
    fn insert_events(&self, events: Vec<WireEvent>) -> bool;

    /// The latest decided block and its frame, for a caller who asked to
    /// fast-forward. `None` if nothing has been decided yet.
    fn fast_forward_snapshot(&self) -> Option<(Block, Frame)>;

    /// Signatures this node has observed for blocks in `[from_index,
    /// to_index]`, inclusive.
    fn block_signatures(&self, from_index: u64, to_index: u64) -> Vec<(u64, BlockSignature)>;
}
