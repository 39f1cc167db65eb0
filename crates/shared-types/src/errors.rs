//! # Error Types
//!
//! Error enums shared by `store`, `poset`, `sync`, and `node`. Kept
//! together here (rather than one enum per crate) so `node`'s top-level
//! error can wrap each variant with `#[from]` without an import cycle.

use thiserror::Error;

/// Errors from the Store port.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Requested entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Setting an existing hash with a different body.
    #[error("event body mismatch for existing hash")]
    EventMismatch,

    /// Hash did not match on read-back, or signature invalid on read-back.
    /// Fatal per the error-handling policy: the node stops.
    #[error("store corruption: {0}")]
    Corruption(String),

    /// Underlying backend failure (RocksDB, I/O).
    #[error("backend error: {0}")]
    Backend(String),
}

/// Errors from Poset insertion and consensus processing.
#[derive(Debug, Error)]
pub enum PosetError {
    /// Self-parent hash not found in the store.
    #[error("self-parent missing: {0:?}")]
    SelfParentMissing(crate::Hash),

    /// Other-parent hash not found in the store.
    #[error("other-parent missing: {0:?}")]
    OtherParentMissing(crate::Hash),

    /// Signature did not verify against the claimed creator.
    #[error("invalid signature")]
    InvalidSignature,

    /// Creator's index did not equal `lastIndexFromCreator + 1`.
    #[error("index gap: creator at {last}, event claims {got}")]
    IndexGap {
        /// Last known index for this creator.
        last: u64,
        /// Index the event claims.
        got: u64,
    },

    /// Creator is not a member of the participant set.
    #[error("unknown creator")]
    UnknownCreator,

    /// Two events by the same creator share a self-parent or have
    /// non-monotonic indices. Recorded, not fatal.
    #[error("fork detected for creator")]
    Fork,

    /// Propagated store failure during insertion.
    #[error("store error during insertion: {0}")]
    Store(#[from] StoreError),
}

/// Errors from the sync/RPC transport.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The call did not complete within the configured timeout.
    #[error("rpc timed out")]
    Timeout,

    /// Transport-level I/O failure (connect, read, write).
    #[error("transport error: {0}")]
    Transport(String),

    /// Peer returned a response Sync could not decode.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Inserting a synced event failed with something other than a
    /// recoverable ordering issue (peer sent events this node cannot
    /// resolve in one round).
    #[error("sync insertion failed: {0}")]
    Insertion(#[from] PosetError),

    /// No known address for peer.
    #[error("unknown peer")]
    UnknownPeer,
}

/// Top-level node errors, the union of everything the state machine can
/// observe. Only `Integrity` variants should ever stop the node per the
/// error-handling policy; everything else is logged and the loop
/// continues.
#[derive(Debug, Error)]
pub enum NodeError {
    /// Transient network error during a gossip tick. Non-fatal.
    #[error("network error (transient): {0}")]
    Network(#[from] SyncError),

    /// Event validation failure. Non-fatal, the event is simply rejected.
    #[error("validation error: {0}")]
    Validation(#[from] PosetError),

    /// Fatal integrity failure: corruption, signature-library failure.
    /// The node stops and surfaces this to the operator.
    #[error("integrity failure, stopping: {0}")]
    Integrity(#[from] StoreError),

    /// Configuration file present but malformed.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Key file or peers file could not be loaded.
    #[error("startup I/O error: {0}")]
    Startup(String),
}
