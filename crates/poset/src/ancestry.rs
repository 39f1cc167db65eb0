//! # Ancestor Reachability
//!
//! `sees`/`strongly_sees` over the event DAG, implemented the way
//! `fork_choice::LMDGhostStore` walks ancestors to find a head: rather
//! than re-walking parent chains on every query, each event carries a
//! small memoized index (`creator_id -> highest index of that creator
//! reachable from this event`), built incrementally as the union of its
//! parents' indices. `strongly_sees` results are memoized per `(e, w)`
//! pair as the data model requires.

use shared_types::Hash;
use std::collections::{BTreeMap, HashMap};

/// Per-event ancestor index: for each creator id, the highest event
/// index of that creator reachable from this event (inclusive of the
/// event itself, if it is that creator's).
pub type AncestorIndex = BTreeMap<u64, u64>;

/// Builds an event's ancestor index from its parents' indices plus
/// itself.
pub fn build_index(
    self_creator_id: u64,
    self_index: u64,
    self_parent_index: Option<&AncestorIndex>,
    other_parent_index: Option<&AncestorIndex>,
) -> AncestorIndex {
    let mut merged = AncestorIndex::new();
    if let Some(idx) = self_parent_index {
        for (&creator, &i) in idx {
            merged.entry(creator).and_modify(|m| *m = (*m).max(i)).or_insert(i);
        }
    }
    if let Some(idx) = other_parent_index {
        for (&creator, &i) in idx {
            merged.entry(creator).and_modify(|m| *m = (*m).max(i)).or_insert(i);
        }
    }
    merged
        .entry(self_creator_id)
        .and_modify(|m| *m = (*m).max(self_index))
        .or_insert(self_index);
    merged
}

/// `x` sees `w` iff `w` is `x` itself or an ancestor of `x`: `x`'s
/// ancestor index has an entry for `w`'s creator at an index `>= w`'s.
pub fn sees(x_index: &AncestorIndex, w_creator_id: u64, w_index: u64) -> bool {
    x_index.get(&w_creator_id).is_some_and(|&i| i >= w_index)
}

/// Memoization cache for `strongly_sees(e, w)` results, keyed by the
/// pair of hashes.
#[derive(Default)]
pub struct StronglySeeCache {
    cache: HashMap<(Hash, Hash), bool>,
}

impl StronglySeeCache {
    /// New empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a memoized result.
    pub fn get(&self, e: Hash, w: Hash) -> Option<bool> {
        self.cache.get(&(e, w)).copied()
    }

    /// Stores a result.
    pub fn put(&mut self, e: Hash, w: Hash, result: bool) {
        self.cache.insert((e, w), result);
    }

    /// Drops every memoized pair. Used on reset/fast-forward.
    pub fn clear(&mut self) {
        self.cache.clear();
    }
}
