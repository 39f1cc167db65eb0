//! # Poset
//!
//! The consensus core tying together insertion, ancestry, fame election,
//! round-received, and block assembly. Grounded on `fork_choice`'s
//! `LMDGhostStore`: a `children`-style adjacency cache kept in memory,
//! ancestor walks memoized per query, and an explicit
//! `invalidate_cache`-style reset on fast-forward.

use crate::ancestry::{self, AncestorIndex, StronglySeeCache};
use crate::ordering::{median_timestamp, whiten_signatures, OrderKey};
use crate::voting::{compute_vote, DEFAULT_COIN_ROUND_PERIOD};
use shared_crypto::signatures::{Ed25519PublicKey, Ed25519Signature};
use shared_types::{Block, Event, FameVote, Frame, Hash, ParticipantSet, PosetError, RoundInfo};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use store::Store;
use tokio::sync::mpsc;

/// Tunables for a [`Poset`] instance.
#[derive(Debug, Clone)]
pub struct PosetConfig {
    /// Coin-round period `c`. Fixed at 10 by default; see `DESIGN.md`
    /// for why this is a protocol constant rather than a per-node knob.
    pub coin_round_period: u64,
    /// Bounded capacity of the commit channel.
    pub commit_channel_capacity: usize,
}

impl Default for PosetConfig {
    fn default() -> Self {
        Self {
            coin_round_period: DEFAULT_COIN_ROUND_PERIOD,
            commit_channel_capacity: 256,
        }
    }
}

/// In-memory decorations for one event. Poset exclusively owns this;
/// `Store` only ever sees the raw [`Event`].
#[derive(Debug, Clone)]
struct Decoration {
    creator_id: u64,
    index: u64,
    timestamp: u64,
    signature: [u8; 64],
    round: u64,
    is_witness: bool,
    famous: FameVote,
    round_received: Option<u64>,
    consensus_timestamp: Option<u64>,
    topological_index: u64,
    flag_table: BTreeMap<u64, Hash>,
}

/// Outcome of inserting an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Inserted cleanly and contributes to consensus counts.
    Inserted(Hash),
    /// Inserted, but this creator now has two events from the same
    /// self-parent (or a non-monotonic index): stored and propagated,
    /// but muted from witness/consensus counting per the fork policy.
    Forked(Hash),
}

/// The DAG/virtual-voting consensus core.
pub struct Poset {
    store: Arc<dyn Store>,
    participants: ParticipantSet,
    config: PosetConfig,
    commit_tx: mpsc::Sender<Block>,

    decorations: parking_lot::Mutex<HashMap<Hash, Decoration>>,
    ancestor_index: parking_lot::Mutex<HashMap<Hash, AncestorIndex>>,
    events_by_creator_index: parking_lot::Mutex<HashMap<(u64, u64), Hash>>,
    strongly_see_cache: parking_lot::Mutex<StronglySeeCache>,
    votes: parking_lot::Mutex<HashMap<(Hash, Hash), bool>>,
    self_parent_children: parking_lot::Mutex<HashMap<(u64, Option<Hash>), Hash>>,
    muted_creators: parking_lot::Mutex<HashSet<u64>>,
    topo_counter: parking_lot::Mutex<u64>,
    max_assigned_round: parking_lot::Mutex<u64>,
    round_cursor: parking_lot::Mutex<u64>,
    pending_round_received: parking_lot::Mutex<Vec<Hash>>,
    last_block_index: parking_lot::Mutex<Option<u64>>,
}

impl Poset {
    /// Builds a fresh Poset over an empty store. `commit_tx` is the
    /// engine's single output boundary: Poset never calls back into
    /// Core.
    pub fn new(
        store: Arc<dyn Store>,
        participants: ParticipantSet,
        config: PosetConfig,
    ) -> (Self, mpsc::Receiver<Block>) {
        let (commit_tx, commit_rx) = mpsc::channel(config.commit_channel_capacity);
        let poset = Self {
            store,
            participants,
            config,
            commit_tx,
            decorations: parking_lot::Mutex::new(HashMap::new()),
            ancestor_index: parking_lot::Mutex::new(HashMap::new()),
            events_by_creator_index: parking_lot::Mutex::new(HashMap::new()),
            strongly_see_cache: parking_lot::Mutex::new(StronglySeeCache::new()),
            votes: parking_lot::Mutex::new(HashMap::new()),
            self_parent_children: parking_lot::Mutex::new(HashMap::new()),
            muted_creators: parking_lot::Mutex::new(HashSet::new()),
            topo_counter: parking_lot::Mutex::new(0),
            max_assigned_round: parking_lot::Mutex::new(0),
            round_cursor: parking_lot::Mutex::new(0),
            pending_round_received: parking_lot::Mutex::new(Vec::new()),
            last_block_index: parking_lot::Mutex::new(None),
        };
        (poset, commit_rx)
    }

    /// Rebuilds a Poset's in-memory caches by replaying every event
    /// already durably persisted in `store`, parents before children.
    ///
    /// `Poset::new` always starts from empty `decorations`/ancestor
    /// caches; that's fine for a brand-new participant, but a node
    /// resuming against its own prior datadir needs those caches
    /// repopulated before it can extend its own head, or the very next
    /// self-event fails with `SelfParentMissing`. Replaying is safe to
    /// redo on every restart: round/witness/fame assignment is a pure
    /// function of DAG structure, and any block reassembled along the
    /// way is written to a block index the store already holds that
    /// value for, then handed to this call's own fresh `commit_rx`.
    pub fn rebuild(
        store: Arc<dyn Store>,
        participants: ParticipantSet,
        config: PosetConfig,
    ) -> Result<(Self, mpsc::Receiver<Block>), PosetError> {
        let (poset, commit_rx) = Self::new(store.clone(), participants.clone(), config);

        let mut pending = Vec::new();
        for participant in participants.iter() {
            for hash in store
                .participant_events(&participant.public_key, 0)
                .map_err(PosetError::Store)?
            {
                pending.push(store.get_event(&hash).map_err(PosetError::Store)?);
            }
        }

        while !pending.is_empty() {
            let mut progressed = false;
            let mut still_pending = Vec::new();
            for event in pending {
                let ready = {
                    let decorations = poset.decorations.lock();
                    event.body.self_parent.map_or(true, |sp| decorations.contains_key(&sp))
                        && event.body.other_parent.map_or(true, |op| decorations.contains_key(&op))
                };
                if ready {
                    poset.insert_event(event)?;
                    progressed = true;
                } else {
                    still_pending.push(event);
                }
            }
            if !progressed {
                let stuck = still_pending.remove(0);
                return Err(stuck.body.self_parent.map_or(
                    PosetError::OtherParentMissing(stuck.body.other_parent.unwrap_or([0u8; 32])),
                    PosetError::SelfParentMissing,
                ));
            }
            pending = still_pending;
        }

        Ok((poset, commit_rx))
    }

    /// Inserts a signed event, driving round assignment, witness/fame
    /// decisions, and block assembly. Atomic on the hard-failure paths
    /// (`SelfParentMissing`/`OtherParentMissing`/`InvalidSignature`/
    /// `IndexGap`): on those, no cache or store mutation persists.
    pub fn insert_event(&self, event: Event) -> Result<InsertOutcome, PosetError> {
        let hash = event.hash();
        if self.decorations.lock().contains_key(&hash) {
            return Ok(InsertOutcome::Inserted(hash));
        }

        let creator_id = shared_types::Participant::derive_id(&event.body.creator);
        if self.participants.get_by_key(&event.body.creator).is_none() {
            return Err(PosetError::UnknownCreator);
        }

        self.verify_signature(&event, &hash)?;

        let self_parent_dec = match event.body.self_parent {
            Some(sp) => {
                self.store
                    .get_event(&sp)
                    .map_err(|_| PosetError::SelfParentMissing(sp))?;
                Some(
                    self.decorations
                        .lock()
                        .get(&sp)
                        .cloned()
                        .ok_or(PosetError::SelfParentMissing(sp))?,
                )
            }
            None => None,
        };
        let other_parent_dec = match event.body.other_parent {
            Some(op) => {
                self.store
                    .get_event(&op)
                    .map_err(|_| PosetError::OtherParentMissing(op))?;
                Some(
                    self.decorations
                        .lock()
                        .get(&op)
                        .cloned()
                        .ok_or(PosetError::OtherParentMissing(op))?,
                )
            }
            None => None,
        };

        let expected_index = self_parent_dec.as_ref().map_or(0, |d| d.index + 1);
        let is_fork = self.fork_conflict(creator_id, event.body.self_parent, hash);
        if event.body.index != expected_index && !is_fork {
            return Err(PosetError::IndexGap {
                last: self_parent_dec.as_ref().map_or(0, |d| d.index),
                got: event.body.index,
            });
        }

        // From here on we only take the soft (non-fatal) Fork path, so
        // every subsequent step is allowed to persist.
        let topo_index = {
            let mut counter = self.topo_counter.lock();
            let idx = *counter;
            *counter += 1;
            idx
        };

        let (round, is_witness, flag_table, ancestor_idx) = if is_fork {
            // Forked events are stored and propagated but excluded from
            // consensus counts: never witnesses, never strongly-seen.
            let round = self_parent_dec.as_ref().map_or(0, |d| d.round);
            (round, false, BTreeMap::new(), AncestorIndex::new())
        } else {
            self.assign_round_and_witness(&event, creator_id, self_parent_dec.as_ref(), other_parent_dec.as_ref(), hash)
        };

        self.store
            .set_event(event.clone())
            .map_err(PosetError::Store)?;

        {
            let mut decorations = self.decorations.lock();
            decorations.insert(
                hash,
                Decoration {
                    creator_id,
                    index: event.body.index,
                    timestamp: event.body.timestamp,
                    signature: event.signature,
                    round,
                    is_witness,
                    famous: if is_witness { FameVote::Undecided } else { FameVote::No },
                    round_received: None,
                    consensus_timestamp: None,
                    topological_index: topo_index,
                    flag_table: flag_table.clone(),
                },
            );
        }
        self.ancestor_index.lock().insert(hash, ancestor_idx);
        self.events_by_creator_index
            .lock()
            .insert((creator_id, event.body.index), hash);
        self.self_parent_children
            .lock()
            .entry((creator_id, event.body.self_parent))
            .or_insert(hash);

        if is_fork {
            self.muted_creators.lock().insert(creator_id);
        } else {
            self.register_round_membership(round, hash, is_witness);
            self.pending_round_received.lock().push(hash);
            {
                let mut max_round = self.max_assigned_round.lock();
                *max_round = (*max_round).max(round);
            }

            self.decide_fame()?;
            self.process_decided_rounds()?;
        }

        if is_fork {
            Ok(InsertOutcome::Forked(hash))
        } else {
            Ok(InsertOutcome::Inserted(hash))
        }
    }

    fn verify_signature(&self, event: &Event, hash: &Hash) -> Result<(), PosetError> {
        let public_key =
            Ed25519PublicKey::from_bytes(event.body.creator).map_err(|_| PosetError::InvalidSignature)?;
        let signature = Ed25519Signature::from_bytes(event.signature);
        public_key
            .verify(hash, &signature)
            .map_err(|_| PosetError::InvalidSignature)
    }

    /// True if a different event already claims this `(creator, self_parent)`
    /// slot. Read-only: the conflicting slot is only recorded once the event
    /// is known to persist, keeping insertion atomic on the hard-fail paths.
    fn fork_conflict(&self, creator_id: u64, self_parent: Option<Hash>, hash: Hash) -> bool {
        self.self_parent_children
            .lock()
            .get(&(creator_id, self_parent))
            .is_some_and(|&existing| existing != hash)
    }

    fn assign_round_and_witness(
        &self,
        event: &Event,
        creator_id: u64,
        self_parent_dec: Option<&Decoration>,
        other_parent_dec: Option<&Decoration>,
        hash: Hash,
    ) -> (u64, bool, BTreeMap<u64, Hash>, AncestorIndex) {
        let self_parent_ancestors = event
            .body
            .self_parent
            .and_then(|sp| self.ancestor_index.lock().get(&sp).cloned());
        let other_parent_ancestors = event
            .body
            .other_parent
            .and_then(|op| self.ancestor_index.lock().get(&op).cloned());

        let ancestor_idx = ancestry::build_index(
            creator_id,
            event.body.index,
            self_parent_ancestors.as_ref(),
            other_parent_ancestors.as_ref(),
        );

        let (round, is_witness) = match self_parent_dec {
            None => (0u64, true), // root event: always a witness
            Some(sp_dec) => {
                let max_parent_round = other_parent_dec.map_or(sp_dec.round, |op| op.round.max(sp_dec.round));
                let round_witnesses = self
                    .store
                    .get_round(max_parent_round)
                    .map(|info| info.witnesses)
                    .unwrap_or_default();

                let seen_count = round_witnesses
                    .iter()
                    .filter(|&&w| self.strongly_sees_with_index(&ancestor_idx, hash, w))
                    .count();

                let round = if !round_witnesses.is_empty() && seen_count >= self.participants.super_majority() {
                    max_parent_round + 1
                } else {
                    max_parent_round
                };
                let is_witness = round > sp_dec.round;
                (round, is_witness)
            }
        };

        let self_parent_flags = event
            .body
            .self_parent
            .and_then(|sp| self.decorations.lock().get(&sp).map(|d| d.flag_table.clone()));
        let other_parent_flags = event
            .body
            .other_parent
            .and_then(|op| self.decorations.lock().get(&op).map(|d| d.flag_table.clone()));

        let mut flag_table = self.merge_flag_tables(self_parent_flags, other_parent_flags);
        if is_witness {
            flag_table.insert(creator_id, hash);
        }

        (round, is_witness, flag_table, ancestor_idx)
    }

    /// Merges two parents' flag tables, keeping per creator whichever
    /// witness has the higher round (the more informative, closer-to-
    /// the-frontier ancestor). An explicit, documented choice where the
    /// data model only specifies "union ... overlaid with self".
    fn merge_flag_tables(
        &self,
        a: Option<BTreeMap<u64, Hash>>,
        b: Option<BTreeMap<u64, Hash>>,
    ) -> BTreeMap<u64, Hash> {
        let mut merged = a.unwrap_or_default();
        if let Some(b) = b {
            let decorations = self.decorations.lock();
            for (creator, hash) in b {
                match merged.get(&creator) {
                    Some(existing) => {
                        let existing_round = decorations.get(existing).map_or(0, |d| d.round);
                        let candidate_round = decorations.get(&hash).map_or(0, |d| d.round);
                        if candidate_round > existing_round {
                            merged.insert(creator, hash);
                        }
                    }
                    None => {
                        merged.insert(creator, hash);
                    }
                }
            }
        }
        merged
    }

    /// Records `hash` as assigned to `round` (`RoundEvents`), and, if a
    /// witness, also as one of its fame candidates (`RoundWitnesses`).
    fn register_round_membership(&self, round: u64, hash: Hash, is_witness: bool) {
        let mut info = self.store.get_round(round).unwrap_or_default();
        let mut changed = false;
        if !info.events.contains(&hash) {
            info.events.push(hash);
            changed = true;
        }
        if is_witness && !info.witnesses.contains(&hash) {
            info.witnesses.push(hash);
            info.fame.insert(hash, FameVote::Undecided);
            changed = true;
        }
        if changed {
            let _ = self.store.set_round(round, info);
        }
    }

    /// `e` strongly sees `w` iff a supermajority of creators have an
    /// ancestor reachable from `e` that itself reaches `w`. Memoized per
    /// `(e, w)`.
    fn strongly_sees(&self, e: Hash, w: Hash) -> bool {
        if let Some(cached) = self.strongly_see_cache.lock().get(e, w) {
            return cached;
        }
        let idx = self.ancestor_index.lock().get(&e).cloned().unwrap_or_default();
        let result = self.strongly_sees_with_index(&idx, e, w);
        self.strongly_see_cache.lock().put(e, w, result);
        result
    }

    fn strongly_sees_with_index(&self, e_index: &AncestorIndex, e: Hash, w: Hash) -> bool {
        if e == w {
            return true;
        }
        let w_dec = match self.decorations.lock().get(&w).cloned() {
            Some(d) => d,
            None => return false,
        };
        if self.muted_creators.lock().contains(&w_dec.creator_id) {
            return false;
        }

        let events_by_index = self.events_by_creator_index.lock();
        let ancestor_index_map = self.ancestor_index.lock();
        let muted = self.muted_creators.lock();

        let mut seeing_creators = 0usize;
        for (&creator, &reach_index) in e_index.iter() {
            if muted.contains(&creator) {
                continue;
            }
            let Some(&latest_hash) = events_by_index.get(&(creator, reach_index)) else {
                continue;
            };
            let latest_ancestors = ancestor_index_map.get(&latest_hash);
            let reaches_w = match latest_ancestors {
                Some(idx) => ancestry::sees(idx, w_dec.creator_id, w_dec.index),
                None => latest_hash == w,
            };
            if reaches_w {
                seeing_creators += 1;
            }
        }
        seeing_creators >= self.participants.super_majority()
    }

    /// Processes undecided witnesses in ascending round order, per the
    /// virtual-voting algorithm. Halts (liveness-waits) when there are
    /// not yet enough later witnesses; this is not an error.
    fn decide_fame(&self) -> Result<(), PosetError> {
        let max_round = *self.max_assigned_round.lock();
        let mut round = 0u64;
        loop {
            if round >= max_round {
                break;
            }
            let mut info = self.store.get_round(round).map_err(PosetError::Store)?;
            if info.witnesses.is_empty() || info.is_decided() {
                round += 1;
                continue;
            }

            let mut changed = false;
            for &w in info.witnesses.clone().iter() {
                if !matches!(info.fame.get(&w), Some(FameVote::Undecided) | None) {
                    continue;
                }
                if let Some(decided) = self.elect_fame_for_witness(round, w, max_round) {
                    info.fame.insert(w, if decided { FameVote::Yes } else { FameVote::No });
                    if let Some(dec) = self.decorations.lock().get_mut(&w) {
                        dec.famous = if decided { FameVote::Yes } else { FameVote::No };
                    }
                    changed = true;
                }
            }
            if changed {
                self.store.set_round(round, info).map_err(PosetError::Store)?;
            }
            round += 1;
        }
        Ok(())
    }

    fn elect_fame_for_witness(&self, w_round: u64, w: Hash, max_round: u64) -> Option<bool> {
        let coin_period = self.config.coin_round_period;
        let mut d = 1u64;
        loop {
            let y_round = w_round + d;
            if y_round > max_round {
                return None; // not enough later witnesses yet; liveness wait.
            }
            let y_witnesses = self
                .store
                .get_round(y_round)
                .map(|info| info.witnesses)
                .unwrap_or_default();
            if y_witnesses.is_empty() {
                d += 1;
                continue;
            }

            for &y in &y_witnesses {
                if self.votes.lock().contains_key(&(w, y)) {
                    continue;
                }
                let y_dec = self.decorations.lock().get(&y).cloned();
                let Some(y_dec) = y_dec else { continue };

                let (vote, decided_by_supermajority) = if d == 1 {
                    let y_sees_w = self.sees_ancestor(y, w);
                    compute_vote(1, y_sees_w, &[], &y_dec.signature, coin_period)
                } else {
                    let prev_round_witnesses = self
                        .store
                        .get_round(y_round - 1)
                        .map(|info| info.witnesses)
                        .unwrap_or_default();
                    let strongly_seen_votes: Vec<bool> = prev_round_witnesses
                        .iter()
                        .filter(|&&pw| self.strongly_sees(y, pw))
                        .filter_map(|pw| self.votes.lock().get(&(w, *pw)).copied())
                        .collect();
                    compute_vote(d, false, &strongly_seen_votes, &y_dec.signature, coin_period)
                };

                self.votes.lock().insert((w, y), vote);

                if decided_by_supermajority && d % coin_period != 0 {
                    return Some(vote);
                }
            }
            d += 1;
        }
    }

    /// Direct ancestor-reachability check used for the `d == 1` vote
    /// (plain "does `y` see `w`", not strongly-see).
    fn sees_ancestor(&self, y: Hash, w: Hash) -> bool {
        let y_index = self.ancestor_index.lock().get(&y).cloned().unwrap_or_default();
        let w_dec = self.decorations.lock().get(&w).cloned();
        match w_dec {
            Some(w_dec) => ancestry::sees(&y_index, w_dec.creator_id, w_dec.index),
            None => false,
        }
    }

    /// Walks `witness`'s self-parent chain backward to find the earliest
    /// self-ancestor (inclusive) that still has `(x_creator, x_index)` as
    /// an ancestor, and returns its timestamp. This is the event whose
    /// creation "first reached" `x`, used for consensus-timestamp median.
    fn first_self_ancestor_timestamp(&self, witness: Hash, x_creator: u64, x_index: u64) -> Option<u64> {
        let w_dec = self.decorations.lock().get(&witness).cloned()?;
        let creator = w_dec.creator_id;
        let mut idx = w_dec.index;
        loop {
            if idx == 0 {
                break;
            }
            let candidate = self.events_by_creator_index.lock().get(&(creator, idx - 1)).copied();
            let Some(candidate) = candidate else { break };
            let reaches = self
                .ancestor_index
                .lock()
                .get(&candidate)
                .is_some_and(|idx_map| ancestry::sees(idx_map, x_creator, x_index));
            if reaches {
                idx -= 1;
            } else {
                break;
            }
        }
        self.events_by_creator_index
            .lock()
            .get(&(creator, idx))
            .and_then(|h| self.decorations.lock().get(h).map(|d| d.timestamp))
    }

    /// Assigns `roundReceived` to outstanding events once their round
    /// becomes decided, and assembles blocks for each newly-finalized
    /// `roundReceived` bucket.
    fn process_decided_rounds(&self) -> Result<(), PosetError> {
        loop {
            let round = *self.round_cursor.lock();
            let info = self.store.get_round(round).map_err(PosetError::Store)?;
            if !info.is_decided() {
                break;
            }

            let famous_witnesses: Vec<Hash> = info
                .witnesses
                .iter()
                .filter(|w| matches!(info.fame.get(*w), Some(FameVote::Yes)))
                .copied()
                .collect();

            let mut received_this_round = Vec::new();
            {
                let mut pending = self.pending_round_received.lock();
                pending.retain(|&x| {
                    let all_see = famous_witnesses.iter().all(|&w| self.sees_ancestor(w, x));
                    if all_see && !famous_witnesses.is_empty() {
                        received_this_round.push(x);
                        false
                    } else {
                        true
                    }
                });
            }

            if !received_this_round.is_empty() {
                self.assign_round_received_and_assemble(round, received_this_round, &famous_witnesses)?;
            }

            *self.round_cursor.lock() += 1;
        }
        Ok(())
    }

    fn assign_round_received_and_assemble(
        &self,
        round_received: u64,
        events: Vec<Hash>,
        famous_witnesses: &[Hash],
    ) -> Result<(), PosetError> {
        let witness_signatures: Vec<[u8; 64]> = famous_witnesses
            .iter()
            .filter_map(|w| self.decorations.lock().get(w).map(|d| d.signature))
            .collect();
        let whitened = whiten_signatures(&witness_signatures);

        let mut keyed: Vec<(OrderKey, Hash)> = Vec::new();
        for hash in events {
            let x_dec = self.decorations.lock().get(&hash).cloned();
            let timestamps: Vec<u64> = famous_witnesses
                .iter()
                .filter_map(|w| {
                    let x_dec = x_dec.as_ref()?;
                    if !self.sees_ancestor(*w, hash) {
                        return None;
                    }
                    self.first_self_ancestor_timestamp(*w, x_dec.creator_id, x_dec.index)
                })
                .collect();
            let consensus_timestamp = if timestamps.is_empty() {
                self.decorations.lock().get(&hash).map_or(0, |d| d.timestamp)
            } else {
                median_timestamp(timestamps)
            };

            let signature = {
                let mut decorations = self.decorations.lock();
                let dec = decorations.get_mut(&hash).expect("decorated event");
                dec.round_received = Some(round_received);
                dec.consensus_timestamp = Some(consensus_timestamp);
                dec.signature
            };
            let key = OrderKey::new(consensus_timestamp, &signature, &whitened, hash);
            keyed.push((key, hash));
        }
        keyed.sort_by(|a, b| a.0.cmp(&b.0));

        {
            let mut info = self.store.get_round(round_received).map_err(PosetError::Store)?;
            info.received = keyed.iter().map(|(_, h)| *h).collect();
            self.store.set_round(round_received, info).map_err(PosetError::Store)?;
        }

        let mut transactions = Vec::new();
        for (_, hash) in &keyed {
            if let Ok(event) = self.store.get_event(hash) {
                transactions.extend(event.body.transactions);
            }
        }

        let next_index = self.last_block_index.lock().map_or(0, |i| i + 1);
        let frame = self.snapshot_frame(round_received)?;
        let frame_hash = blake3::hash(&bincode::serialize(&frame).expect("frame serializable"));

        let block = Block {
            index: next_index,
            round_received,
            state_hash: None,
            frame_hash: *frame_hash.as_bytes(),
            transactions,
            signatures: Vec::new(),
        };
        self.store.set_frame(frame).map_err(PosetError::Store)?;
        self.store.set_block(block.clone()).map_err(PosetError::Store)?;
        *self.last_block_index.lock() = Some(next_index);

        // insert_event is a synchronous call, so we can't await the
        // bounded channel here; the block is already durably persisted
        // and indexed by `index`, so a full channel only delays the
        // consumer's notification, it never loses the block.
        let _ = self.commit_tx.try_send(block);
        Ok(())
    }

    fn snapshot_frame(&self, round: u64) -> Result<Frame, PosetError> {
        let mut roots = BTreeMap::new();
        let mut events = Vec::new();
        let info = self.store.get_round(round).map_err(PosetError::Store)?;
        for &witness in &info.witnesses {
            if let Some(dec) = self.decorations.lock().get(&witness).cloned() {
                roots.insert(dec.creator_id, witness);
            }
            if let Ok(event) = self.store.get_event(&witness) {
                events.push(event);
            }
        }
        Ok(Frame { round, roots, events })
    }

    /// Atomically replaces Poset state with the roots of `frame`: clears
    /// every in-memory cache, reseeds the store, and marks the round
    /// after the frame as the first consensus round going forward.
    ///
    /// `latest_block`, if given, is persisted immediately after the
    /// store's own block map is wiped by the reset, so `lastBlockIndex`
    /// reflects the fast-forwarded chain rather than reverting to
    /// `None`. Block index continuity (`i`, then `i+1`, ...) for
    /// anything decided afterward depends on this.
    pub fn reset(&self, frame: Frame, latest_block: Option<Block>) -> Result<(), PosetError> {
        self.store.reset(frame.clone()).map_err(PosetError::Store)?;
        if let Some(block) = latest_block {
            self.store.set_block(block).map_err(PosetError::Store)?;
        }

        self.decorations.lock().clear();
        self.ancestor_index.lock().clear();
        self.events_by_creator_index.lock().clear();
        self.strongly_see_cache.lock().clear();
        self.votes.lock().clear();
        self.self_parent_children.lock().clear();
        self.muted_creators.lock().clear();
        self.pending_round_received.lock().clear();

        for event in &frame.events {
            let hash = event.hash();
            let creator_id = shared_types::Participant::derive_id(&event.body.creator);
            self.events_by_creator_index.lock().insert((creator_id, event.body.index), hash);
            self.ancestor_index.lock().insert(hash, ancestry::build_index(creator_id, event.body.index, None, None));
            self.decorations.lock().insert(
                hash,
                Decoration {
                    creator_id,
                    index: event.body.index,
                    timestamp: event.body.timestamp,
                    signature: event.signature,
                    round: frame.round,
                    is_witness: true,
                    famous: FameVote::Yes,
                    round_received: Some(frame.round),
                    consensus_timestamp: None,
                    topological_index: 0,
                    flag_table: BTreeMap::from([(creator_id, hash)]),
                },
            );
        }
        *self.max_assigned_round.lock() = frame.round;
        *self.round_cursor.lock() = frame.round + 1;
        self.last_block_index
            .lock()
            .clone_from(&self.store.last_block_index().map_err(PosetError::Store)?);
        Ok(())
    }

    /// Read-only snapshot of a witness's fame, for stats/tests.
    pub fn fame_of(&self, witness: Hash) -> Option<FameVote> {
        self.decorations.lock().get(&witness).map(|d| d.famous)
    }

    /// Read-only snapshot of an event's assigned round.
    pub fn round_of(&self, hash: Hash) -> Option<u64> {
        self.decorations.lock().get(&hash).map(|d| d.round)
    }

    /// This process's insertion-order index for an event. Any dependency
    /// of `hash` was inserted earlier and so has a strictly smaller
    /// index; sorting a set of hashes by this value yields a valid
    /// topological order for replay to another node.
    pub fn topological_index(&self, hash: Hash) -> Option<u64> {
        self.decorations.lock().get(&hash).map(|d| d.topological_index)
    }

    /// Read-only snapshot of an event's flag table, keyed by creator id.
    /// Used by gossip-partner selection to score how well-represented a
    /// candidate peer's witnesses already are in this node's head.
    pub fn flag_table_of(&self, hash: Hash) -> Option<BTreeMap<u64, Hash>> {
        self.decorations.lock().get(&hash).map(|d| d.flag_table.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_crypto::signatures::Ed25519KeyPair;
    use shared_types::{EventBody, Participant};
    use std::collections::BTreeMap as Map;
    use store::adapters::memory::InMemoryStore;

    struct TestNode {
        keypair: Ed25519KeyPair,
        participant: Participant,
    }

    fn make_participants(n: usize) -> (Vec<TestNode>, ParticipantSet) {
        let mut nodes = Vec::new();
        let mut list = Vec::new();
        for i in 0..n {
            let keypair = Ed25519KeyPair::generate();
            let public_key = *keypair.public_key().as_bytes();
            let participant = Participant::new(public_key, format!("127.0.0.1:{}", 9000 + i));
            list.push(participant.clone());
            nodes.push(TestNode { keypair, participant });
        }
        (nodes, ParticipantSet::new(list))
    }

    fn sign_event(node: &TestNode, body: EventBody) -> Event {
        let encoded = bincode::serialize(&body).unwrap();
        let hash = *blake3::hash(&encoded).as_bytes();
        let signature = node.keypair.sign(&hash);
        Event {
            body,
            signature: *signature.as_bytes(),
        }
    }

    #[test]
    fn root_events_are_witnesses_at_round_zero() {
        let (nodes, participants) = make_participants(4);
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::default());
        let (poset, _rx) = Poset::new(store, participants, PosetConfig::default());

        let body = EventBody {
            creator: nodes[0].participant.public_key,
            index: 0,
            self_parent: None,
            other_parent: None,
            transactions: vec![],
            block_signatures: vec![],
            timestamp: 1,
        };
        let event = sign_event(&nodes[0], body);
        let hash = event.hash();
        let outcome = poset.insert_event(event).unwrap();
        assert_eq!(outcome, InsertOutcome::Inserted(hash));
        assert_eq!(poset.round_of(hash), Some(0));
    }

    #[test]
    fn invalid_signature_is_rejected_atomically() {
        let (nodes, participants) = make_participants(4);
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::default());
        let (poset, _rx) = Poset::new(store.clone(), participants, PosetConfig::default());

        let body = EventBody {
            creator: nodes[0].participant.public_key,
            index: 0,
            self_parent: None,
            other_parent: None,
            transactions: vec![],
            block_signatures: vec![],
            timestamp: 1,
        };
        let mut event = sign_event(&nodes[0], body);
        event.signature[0] ^= 0xFF;
        let hash = event.hash();

        let result = poset.insert_event(event);
        assert!(matches!(result, Err(PosetError::InvalidSignature)));
        assert!(store.get_event(&hash).is_err());
    }

    #[test]
    fn index_gap_is_rejected() {
        let (nodes, participants) = make_participants(4);
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::default());
        let (poset, _rx) = Poset::new(store, participants, PosetConfig::default());

        let root_body = EventBody {
            creator: nodes[0].participant.public_key,
            index: 0,
            self_parent: None,
            other_parent: None,
            transactions: vec![],
            block_signatures: vec![],
            timestamp: 1,
        };
        let root = sign_event(&nodes[0], root_body);
        let root_hash = root.hash();
        poset.insert_event(root).unwrap();

        let skip_body = EventBody {
            creator: nodes[0].participant.public_key,
            index: 2, // should be 1
            self_parent: Some(root_hash),
            other_parent: None,
            transactions: vec![],
            block_signatures: vec![],
            timestamp: 2,
        };
        let skip = sign_event(&nodes[0], skip_body);
        let result = poset.insert_event(skip);
        assert!(matches!(result, Err(PosetError::IndexGap { last: 0, got: 2 })));
    }

    #[test]
    fn frame_snapshot_round_trips_through_reset() {
        let (nodes, participants) = make_participants(4);
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::default());
        let (poset, _rx) = Poset::new(store, participants.clone(), PosetConfig::default());

        let body = EventBody {
            creator: nodes[0].participant.public_key,
            index: 0,
            self_parent: None,
            other_parent: None,
            transactions: vec![],
            block_signatures: vec![],
            timestamp: 1,
        };
        let event = sign_event(&nodes[0], body);
        poset.insert_event(event.clone()).unwrap();

        let mut roots = Map::new();
        roots.insert(nodes[0].participant.id, event.hash());
        let frame = Frame {
            round: 3,
            roots,
            events: vec![event.clone()],
        };
        poset.reset(frame, None).unwrap();
        assert_eq!(poset.round_of(event.hash()), Some(3));
    }
}
