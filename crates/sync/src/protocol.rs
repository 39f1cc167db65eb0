//! # RPC message shapes
//!
//! One request/response pair per gossip exchange. Each connection carries
//! exactly one call: the listener reads a single [`RpcRequest`], dispatches
//! it, writes a single [`RpcResponse`], and closes.

use serde::{Deserialize, Serialize};
use shared_types::{Block, BlockSignature, Frame, WireEvent};
use std::collections::BTreeMap;

/// A call made to a peer's sync listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RpcRequest {
    /// Exchange known-event watermarks and fetch the diff.
    Sync {
        /// Caller's `KnownEvents` snapshot, by participant id.
        known: BTreeMap<u64, u64>,
    },
    /// Push events the responder is missing.
    EagerSync {
        /// Events in topological order.
        events: Vec<WireEvent>,
    },
    /// Ask for a bootstrap snapshot.
    FastForward,
    /// Bulk fetch of block signatures for a historical range.
    RequestBlockSignatures {
        /// First block index, inclusive.
        from_index: u64,
        /// Last block index, inclusive.
        to_index: u64,
    },
}

/// The responder's reply to an [`RpcRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RpcResponse {
    /// Reply to [`RpcRequest::Sync`].
    Sync {
        /// Responder's participant id.
        from_id: u64,
        /// Diffed events, topologically ordered. Empty if `sync_limit`.
        events: Vec<WireEvent>,
        /// Responder's own `KnownEvents` snapshot, for the caller to
        /// compute the return diff (`EagerSync`).
        known: BTreeMap<u64, u64>,
        /// True if the diff exceeded the responder's configured limit;
        /// the caller must fast-forward instead of inserting `events`
        /// (which is empty in this case).
        sync_limit: bool,
    },
    /// Reply to [`RpcRequest::EagerSync`].
    EagerSync {
        /// Responder's participant id.
        from_id: u64,
        /// False if any pushed event failed to insert.
        success: bool,
    },
    /// Reply to [`RpcRequest::FastForward`].
    FastForward {
        /// Responder's participant id.
        from_id: u64,
        /// Latest decided block.
        block: Block,
        /// Frame snapshot for `block.round_received`.
        frame: Frame,
    },
    /// Reply to [`RpcRequest::RequestBlockSignatures`].
    BlockSignatures {
        /// Responder's participant id.
        from_id: u64,
        /// Signatures for the requested range, one entry per
        /// `(block_index, signature)` pair observed by the responder.
        signatures: Vec<(u64, BlockSignature)>,
    },
    /// The request could not be serviced (unknown creator referenced in
    /// a pushed event, store failure, etc).
    Error {
        /// Human-readable cause, logged by the caller.
        message: String,
    },
}
