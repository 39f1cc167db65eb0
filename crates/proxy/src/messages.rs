//! # Proxy message shapes
//!
//! Three downstream message types (node → application) and two upstream
//! (application → node). Downstream calls that expect a reply carry a
//! `uid` the application echoes back in its [`UpstreamMessage::Answer`].

use shared_types::{Block, Transaction};

/// Sent from the node to the application.
#[derive(Debug, Clone)]
pub enum DownstreamMessage {
    /// A block reached consensus; the application should apply it and
    /// answer with its resulting state hash (32 bytes).
    CommitBlock {
        /// Correlates the eventual [`UpstreamMessage::Answer`].
        uid: u64,
        /// The committed block, transactions in consensus order.
        block: Block,
    },
    /// Requests a snapshot of application state as of `block_index`, for
    /// answering another node's historical query.
    GetSnapshot {
        /// Correlates the eventual [`UpstreamMessage::Answer`].
        uid: u64,
        /// Block index the snapshot should reflect.
        block_index: u64,
    },
    /// Asks the application to replace its state with a previously taken
    /// snapshot, used when this node fast-forwards to a peer's frame.
    RestoreSnapshot {
        /// Correlates the eventual [`UpstreamMessage::Answer`].
        uid: u64,
        /// Opaque snapshot bytes, as previously returned by `GetSnapshot`.
        snapshot: Vec<u8>,
    },
}

/// Sent from the application to the node.
#[derive(Debug, Clone)]
pub enum UpstreamMessage {
    /// A new transaction for inclusion in a future self-event.
    SubmitTransaction(Transaction),
    /// The application's reply to a downstream call, by `uid`.
    Answer {
        /// The `uid` of the downstream message being answered.
        uid: u64,
        /// Opaque reply payload (a state hash, a snapshot, or empty for
        /// an acknowledgement).
        payload: Vec<u8>,
    },
}
