//! # Core
//!
//! Per-node state that sits above Poset: the local head, the
//! transaction/block-signature pools, and the operations the gossip
//! driver calls each tick (`AddSelfEvent`, `EventDiff`, `Sync`,
//! `KnownEvents`, `ToWire`, `FastForward`).
//!
//! Core holds an `Arc<Poset>` and never the reverse: Poset's only output
//! boundary is its commit channel, consumed elsewhere by the commit
//! loop, not by Core.

use crate::pools::{BlockSignaturePool, PoolFull, TransactionPool};
use crate::wire;
use parking_lot::Mutex;
use poset::{InsertOutcome, Poset};
use shared_crypto::Ed25519KeyPair;
use shared_types::{Block, Event, EventBody, Frame, Hash, NodeError, Participant, ParticipantSet, PosetError, Transaction, WireEvent};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use store::Store;

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before epoch")
        .as_millis() as u64
}

struct HeadState {
    hash: Option<Hash>,
    next_index: u64,
}

/// Default bound on each of the transaction and block-signature pools.
pub const DEFAULT_POOL_CAPACITY: usize = 10_000;

/// Per-node state layered over [`poset::Poset`].
pub struct Core {
    store: Arc<dyn Store>,
    poset: Arc<Poset>,
    participants: ParticipantSet,
    keypair: Ed25519KeyPair,
    self_id: u64,
    head: Mutex<HeadState>,
    transactions: TransactionPool,
    block_signatures: BlockSignaturePool,
}

impl Core {
    /// Builds Core, seeding `head` from the most recent self-event
    /// already in `store` (empty on a brand-new node).
    pub fn new(
        store: Arc<dyn Store>,
        poset: Arc<Poset>,
        participants: ParticipantSet,
        keypair: Ed25519KeyPair,
    ) -> Result<Self, shared_types::StoreError> {
        Self::with_pool_capacity(store, poset, participants, keypair, DEFAULT_POOL_CAPACITY)
    }

    /// As [`Core::new`], with an explicit pool capacity.
    pub fn with_pool_capacity(
        store: Arc<dyn Store>,
        poset: Arc<Poset>,
        participants: ParticipantSet,
        keypair: Ed25519KeyPair,
        pool_capacity: usize,
    ) -> Result<Self, shared_types::StoreError> {
        let self_id = Participant::derive_id(keypair.public_key().as_bytes());
        let head = match store.last_event_from(self_id) {
            Ok((hash, _)) => {
                let event = store.get_event(&hash)?;
                HeadState {
                    hash: Some(hash),
                    next_index: event.body.index + 1,
                }
            }
            Err(_) => HeadState {
                hash: None,
                next_index: 0,
            },
        };
        Ok(Self {
            store,
            poset,
            participants,
            keypair,
            self_id,
            head: Mutex::new(head),
            transactions: TransactionPool::new(pool_capacity),
            block_signatures: BlockSignaturePool::new(pool_capacity),
        })
    }

    /// This node's participant id.
    pub fn self_id(&self) -> u64 {
        self.self_id
    }

    /// Submits a transaction from the application for inclusion in a
    /// future self-event.
    pub fn submit_transaction(&self, tx: Transaction) -> Result<(), PoolFull> {
        self.transactions.submit(tx)
    }

    /// Enqueues a block signature produced by the commit loop.
    pub fn submit_block_signature(&self, signature: shared_types::BlockSignature) -> Result<(), PoolFull> {
        self.block_signatures.submit(signature)
    }

    /// Builds a new self-event from `head`, draining both pools into it,
    /// signs it, and inserts it via Poset. On success, `head` advances.
    /// On failure, both pools are restored to their pre-drain contents
    /// so nothing submitted is lost.
    pub fn add_self_event(&self, other_parent: Option<Hash>) -> Result<Hash, NodeError> {
        let drained_transactions = self.transactions.drain();
        let drained_signatures = self.block_signatures.drain();

        let (self_parent, index) = {
            let head = self.head.lock();
            (head.hash, head.next_index)
        };

        let body = EventBody {
            creator: *self.keypair.public_key().as_bytes(),
            index,
            self_parent,
            other_parent,
            transactions: drained_transactions.clone(),
            block_signatures: drained_signatures.clone(),
            timestamp: now_millis(),
        };
        let hash = {
            let encoded = bincode::serialize(&body).expect("EventBody always serializable");
            *blake3::hash(&encoded).as_bytes()
        };
        let signature = self.keypair.sign(&hash);
        let event = Event {
            body,
            signature: *signature.as_bytes(),
        };

        match self.poset.insert_event(event) {
            Ok(InsertOutcome::Inserted(h)) | Ok(InsertOutcome::Forked(h)) => {
                let mut head = self.head.lock();
                head.hash = Some(h);
                head.next_index = index + 1;
                Ok(h)
            }
            Err(err) => {
                self.transactions.restore(drained_transactions);
                self.block_signatures.restore(drained_signatures);
                Err(NodeError::Validation(err))
            }
        }
    }

    /// Current head hash, if this node has produced any event yet.
    pub fn head(&self) -> Option<Hash> {
        self.head.lock().hash
    }

    /// Signs a committed block's application-reported state hash,
    /// producing this node's [`shared_types::BlockSignature`]. Kept on
    /// Core rather than handing the keypair to the commit loop directly:
    /// signing is the one crypto operation outside `add_self_event` and
    /// Core already owns the only keypair instance.
    pub fn sign_block(&self, block_index: u64, state_hash: Hash) -> shared_types::BlockSignature {
        let signature = self.keypair.sign(&state_hash);
        shared_types::BlockSignature {
            block_index,
            validator: *self.keypair.public_key().as_bytes(),
            signature: *signature.as_bytes(),
        }
    }

    /// Snapshot of `participant id -> last known index`.
    pub fn known_events(&self) -> Result<BTreeMap<u64, u64>, shared_types::StoreError> {
        self.store.known_events()
    }

    /// For each participant with `known[id] < lastIndex`, their events
    /// with index greater than `known[id]`, across all participants, in
    /// an order safe to replay (dependencies first).
    pub fn event_diff(&self, known: &BTreeMap<u64, u64>) -> Result<Vec<WireEvent>, shared_types::StoreError> {
        let mut hashes: Vec<Hash> = Vec::new();
        for participant in self.participants.iter() {
            match known.get(&participant.id) {
                Some(&last_known) => {
                    hashes.extend(self.store.participant_events(&participant.public_key, last_known)?);
                }
                None => {
                    // Peer has never heard of this creator: `participant_events`
                    // can only express "strictly after index N", so the root
                    // (index 0) needs to be fetched and prepended separately.
                    let mut all = self.store.participant_events(&participant.public_key, 0)?;
                    if let Ok(root) = self.store.event_hash_at(participant.id, 0) {
                        all.insert(0, root);
                    }
                    hashes.extend(all);
                }
            }
        }
        hashes.sort_by_key(|h| self.poset.topological_index(*h).unwrap_or(u64::MAX));
        hashes
            .into_iter()
            .map(|h| {
                let event = self.store.get_event(&h)?;
                wire::event_to_wire(self.store.as_ref(), &event)
            })
            .collect()
    }

    /// Replaces parent hashes with `(creator_id, index)` pairs for wire
    /// transport.
    pub fn to_wire(&self, events: &[Event]) -> Result<Vec<WireEvent>, shared_types::StoreError> {
        events.iter().map(|event| wire::event_to_wire(self.store.as_ref(), event)).collect()
    }

    /// Reconstructs and inserts each wire event in order. Aborts on the
    /// first insertion failure: a peer that can't be resolved in one
    /// round is a real error, not a recoverable ordering issue, per the
    /// delivery-order guarantee each Sync response is expected to honor.
    pub fn sync(&self, wire_events: Vec<WireEvent>) -> Result<(), NodeError> {
        for wire_event in wire_events {
            let event = wire::wire_to_event(self.store.as_ref(), &self.participants, &wire_event)
                .map_err(PosetError::from)
                .map_err(NodeError::Validation)?;
            if let Err(err) = self.poset.insert_event(event) {
                tracing::warn!(error = %err, "sync aborted: event could not be inserted");
                return Err(NodeError::Validation(err));
            }
        }
        Ok(())
    }

    /// Resets Poset and Store to `frame`/`block`, re-seeds `head` to this
    /// node's root in the frame (or the empty state if absent), and
    /// clears both pools: anything pending is now stale relative to the
    /// jumped-to state.
    pub fn fast_forward(&self, frame: Frame, block: Block) -> Result<(), NodeError> {
        let self_root = frame.roots.get(&self.self_id).copied();
        self.poset
            .reset(frame, Some(block))
            .map_err(NodeError::Validation)?;

        let next_index = match self_root {
            Some(hash) => {
                let event = self.store.get_event(&hash).map_err(NodeError::Integrity)?;
                event.body.index + 1
            }
            None => 0,
        };
        *self.head.lock() = HeadState {
            hash: self_root,
            next_index,
        };
        self.transactions.drain();
        self.block_signatures.drain();
        Ok(())
    }
}
