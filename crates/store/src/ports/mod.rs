//! # Store Port
//!
//! The narrow interface the rest of the engine depends on. Two adapters
//! implement it: [`crate::adapters::memory::InMemoryStore`] (bounded LRU
//! cache over events, unbounded maps for rounds/blocks — used for tests
//! and as the read cache layered over the persistent backend) and
//! [`crate::adapters::rocksdb::RocksDbStore`] (the production backend).

use shared_types::{Block, Event, Frame, Hash, RoundInfo};
pub use shared_types::StoreError;

/// Persistence and cache for events, rounds, blocks, and frames.
///
/// All operations are keyed by immutable identifiers. `set_event` on an
/// already-stored hash is a no-op if the body matches, and
/// `StoreError::EventMismatch` if it doesn't (an attempt to overwrite an
/// immutable event is always a bug upstream, never a legitimate retry).
pub trait Store: Send + Sync {
    /// Fetches an event by hash.
    fn get_event(&self, hash: &Hash) -> Result<Event, StoreError>;

    /// Appends an event. No-op if already present with an identical body.
    fn set_event(&self, event: Event) -> Result<(), StoreError>;

    /// Ascending-by-index events from `creator`, skipping indices less
    /// than `skip_index`.
    fn participant_events(&self, creator: &[u8; 32], skip_index: u64) -> Result<Vec<Hash>, StoreError>;

    /// Resolves `(creator_id, index)` to an event hash. Used to turn a
    /// wire event's parent references back into hashes on receipt.
    fn event_hash_at(&self, creator_id: u64, index: u64) -> Result<Hash, StoreError>;

    /// The hash of `creator`'s most recent event, and whether it is a
    /// root (index 0).
    fn last_event_from(&self, creator_id: u64) -> Result<(Hash, bool), StoreError>;

    /// Snapshot of `participant id -> last known index`.
    fn known_events(&self) -> Result<std::collections::BTreeMap<u64, u64>, StoreError>;

    /// Fetches round bookkeeping (witnesses, fame).
    fn get_round(&self, round: u64) -> Result<RoundInfo, StoreError>;

    /// Persists round bookkeeping.
    fn set_round(&self, round: u64, info: RoundInfo) -> Result<(), StoreError>;

    /// Fetches a committed block by index.
    fn get_block(&self, index: u64) -> Result<Block, StoreError>;

    /// Persists a block. Indices must be assigned monotonically by the
    /// caller (Poset); the store does not renumber.
    fn set_block(&self, block: Block) -> Result<(), StoreError>;

    /// The index of the most recently stored block, if any.
    fn last_block_index(&self) -> Result<Option<u64>, StoreError>;

    /// Fetches a frame snapshot for a round.
    fn get_frame(&self, round: u64) -> Result<Frame, StoreError>;

    /// Persists a frame snapshot.
    fn set_frame(&self, frame: Frame) -> Result<(), StoreError>;

    /// Atomically replaces store state with the roots of `frame`; events
    /// prior to the frame are discarded. Used by fast-forward.
    fn reset(&self, frame: Frame) -> Result<(), StoreError>;

    /// Witness hashes for a round, in assignment order.
    fn round_witnesses(&self, round: u64) -> Result<Vec<Hash>, StoreError> {
        Ok(self.get_round(round)?.witnesses)
    }

    /// Every event assigned round `r` as its structural round, witness
    /// or not, in assignment order.
    fn round_events(&self, round: u64) -> Result<Vec<Hash>, StoreError> {
        Ok(self.get_round(round)?.events)
    }

    /// Every event that has reached consensus, concatenated across
    /// rounds in final total order. Bounded by the highest committed
    /// block's `roundReceived`; empty until the first block commits.
    fn consensus_events(&self) -> Result<Vec<Hash>, StoreError> {
        let mut result = Vec::new();
        if let Some(last_index) = self.last_block_index()? {
            let last_round = self.get_block(last_index)?.round_received;
            for round in 0..=last_round {
                result.extend(self.get_round(round)?.received);
            }
        }
        Ok(result)
    }

    /// True if the store has no events yet (fresh node, needs bootstrap
    /// via fast-forward or a full from-genesis sync).
    fn need_bootstrap(&self) -> Result<bool, StoreError>;

    /// Filesystem path backing this store, if any. `None` for the
    /// in-memory adapter, which has nothing to point at.
    fn store_path(&self) -> Option<String>;

    /// Flushes and releases backend resources. A no-op for the
    /// in-memory adapter.
    fn close(&self) -> Result<(), StoreError>;
}
