//! # Key Layout
//!
//! The persistent backend is key-prefixed by entity kind. All writes for
//! a single logical operation (e.g. persisting an event plus its round
//! update) go through one atomic batch; see
//! [`crate::adapters::rocksdb::RocksDbStore`].

use shared_types::Hash;

const EVENT: &[u8] = b"event/";
const ROUND: &[u8] = b"round/";
const BLOCK: &[u8] = b"block/";
const FRAME: &[u8] = b"frame/";
const PARTICIPANT: &[u8] = b"participant/";
const LAST_EVENT: &[u8] = b"last-event/";
const KNOWN: &[u8] = b"known/";

/// Key for an event, keyed by its hash.
pub fn event(hash: &Hash) -> Vec<u8> {
    prefixed(EVENT, hash)
}

/// Key for round bookkeeping.
pub fn round(index: u64) -> Vec<u8> {
    prefixed_u64(ROUND, index)
}

/// Key for a committed block.
pub fn block(index: u64) -> Vec<u8> {
    prefixed_u64(BLOCK, index)
}

/// Key for a frame snapshot.
pub fn frame(round: u64) -> Vec<u8> {
    prefixed_u64(FRAME, round)
}

/// Key for a participant record.
pub fn participant(id: u64) -> Vec<u8> {
    prefixed_u64(PARTICIPANT, id)
}

/// Key for the derived "last event hash from creator" index.
pub fn last_event(creator_id: u64) -> Vec<u8> {
    prefixed_u64(LAST_EVENT, creator_id)
}

/// Key for the derived "last known index from creator" index.
pub fn known(creator_id: u64) -> Vec<u8> {
    prefixed_u64(KNOWN, creator_id)
}

/// Prefix used to `prefix_scan` all events (`ParticipantEvents`,
/// `EventHashAt`, `NeedBootstrap`).
pub fn event_prefix() -> &'static [u8] {
    EVENT
}

/// Prefix used to `prefix_scan` all known-index entries.
pub fn known_prefix() -> &'static [u8] {
    KNOWN
}

fn prefixed(prefix: &[u8], suffix: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + suffix.len());
    key.extend_from_slice(prefix);
    key.extend_from_slice(suffix);
    key
}

fn prefixed_u64(prefix: &[u8], value: u64) -> Vec<u8> {
    prefixed(prefix, &value.to_be_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_distinct_across_kinds_for_the_same_numeric_suffix() {
        assert_ne!(round(1), block(1));
        assert_ne!(block(1), frame(1));
        assert_ne!(last_event(1), known(1));
    }

    #[test]
    fn numeric_keys_sort_big_endian_for_range_scans() {
        assert!(round(1) < round(2));
        assert!(round(9) < round(10));
    }
}
