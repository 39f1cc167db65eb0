//! # Peer Selector
//!
//! Stateless-per-call gossip-partner choice, called once per gossip tick.
//! Scoring is a pure function of its inputs; only the final round-robin
//! tiebreak carries state, held as a single rotating cursor on
//! [`PeerSelector`] rather than threaded through the scoring itself.
//!
//! Grounded in the pure scoring-closure sort pattern used for XOR-distance
//! peer ranking, adapted here from network distance to two recency/
//! information-gain criteria.

use shared_types::{Hash, Participant};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Picks one gossip partner per call: least-recently-synced first, then
/// the peer whose witnesses are least represented in the local flag
/// table, then a rotating round-robin cursor for anything still tied.
#[derive(Debug, Default)]
pub struct PeerSelector {
    round_robin_cursor: AtomicUsize,
}

impl PeerSelector {
    /// Builds a selector with its round-robin cursor at zero.
    pub fn new() -> Self {
        Self {
            round_robin_cursor: AtomicUsize::new(0),
        }
    }

    /// Selects the next gossip partner from `candidates` (participants
    /// other than self), or `None` if `candidates` is empty.
    ///
    /// `last_synced` maps participant id to the timestamp of the last
    /// completed sync; a participant absent from the map has never been
    /// synced with and sorts first. `local_flag_table` is the flag table
    /// of this node's current head: a participant whose id is already a
    /// key there has a witness this node has already absorbed, so it is
    /// scored as more represented (lower priority) than one that is
    /// absent.
    pub fn select(
        &self,
        candidates: &[Participant],
        last_synced: &BTreeMap<u64, u64>,
        local_flag_table: &BTreeMap<u64, Hash>,
    ) -> Option<Participant> {
        if candidates.is_empty() {
            return None;
        }

        let oldest_sync = candidates
            .iter()
            .map(|p| last_synced.get(&p.id).copied().unwrap_or(0))
            .min()
            .expect("candidates is non-empty");
        let least_recently_synced: Vec<&Participant> = candidates
            .iter()
            .filter(|p| last_synced.get(&p.id).copied().unwrap_or(0) == oldest_sync)
            .collect();

        let best_representation = least_recently_synced
            .iter()
            .map(|p| representation_score(local_flag_table, p.id))
            .min()
            .expect("least_recently_synced is non-empty");
        let tied: Vec<&Participant> = least_recently_synced
            .into_iter()
            .filter(|p| representation_score(local_flag_table, p.id) == best_representation)
            .collect();

        if tied.len() == 1 {
            return Some(tied[0].clone());
        }

        let mut tied_ids: Vec<u64> = tied.iter().map(|p| p.id).collect();
        tied_ids.sort_unstable();
        let cursor = self.round_robin_cursor.fetch_add(1, Ordering::Relaxed);
        let chosen_id = tied_ids[cursor % tied_ids.len()];
        tied.into_iter().find(|p| p.id == chosen_id).cloned()
    }
}

/// 0 if `peer_id` is absent from the flag table (under-represented, so
/// preferred), 1 if a witness from it is already recorded there.
fn representation_score(flag_table: &BTreeMap<u64, Hash>, peer_id: u64) -> u8 {
    if flag_table.contains_key(&peer_id) {
        1
    } else {
        0
    }
}
