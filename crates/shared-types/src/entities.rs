//! # Domain Entities
//!
//! The data model shared by `poset`, `node-core`, `store`, `sync`, and
//! `peer-selector`: participants, events, rounds, frames, and blocks.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: every crate that crosses the Poset/Store
//!   boundary uses these types rather than defining its own.
//! - **Immutability after signing**: `Event` has no public mutators once
//!   constructed; derived fields live on `EventRecord`, not on the event
//!   itself.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 32-byte BLAKE3 digest, used for event, frame, and block hashes.
pub type Hash = [u8; 32];

/// Raw Ed25519 public key bytes, doubling as participant identity.
pub type PublicKeyBytes = [u8; 32];

/// Raw Ed25519 signature bytes.
pub type SignatureBytes = [u8; 64];

/// Opaque application payload carried by an event.
pub type Transaction = Vec<u8>;

/// A participant in the poset: identity, stable ordering key, network
/// location.
///
/// `id` is derived once at participant-set load time (see
/// [`Participant::derive_id`]) and never recomputed; participants are
/// ordered by ascending `id` everywhere the data model requires a total
/// order over the participant set (fame election, flag tables,
/// round-robin tiebreaks).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Ed25519 public key.
    pub public_key: PublicKeyBytes,
    /// Stable 64-bit id, ordered ascending across the participant set.
    pub id: u64,
    /// `host:port` gossip address.
    pub net_addr: String,
}

impl Participant {
    /// Derives the stable id for a public key: the first 8 bytes of its
    /// BLAKE3 hash, read big-endian.
    ///
    /// A pure function of the key so every node computes the same id for
    /// the same participant without coordination.
    pub fn derive_id(public_key: &PublicKeyBytes) -> u64 {
        let digest = blake3::hash(public_key);
        let bytes = digest.as_bytes();
        u64::from_be_bytes(bytes[0..8].try_into().unwrap())
    }

    /// Builds a participant from a public key and address, deriving `id`.
    pub fn new(public_key: PublicKeyBytes, net_addr: String) -> Self {
        let id = Self::derive_id(&public_key);
        Self {
            public_key,
            id,
            net_addr,
        }
    }
}

/// The ordered, fixed set of participants for a poset instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParticipantSet {
    by_id: BTreeMap<u64, Participant>,
}

impl ParticipantSet {
    /// Builds a participant set, sorting by id.
    pub fn new(participants: Vec<Participant>) -> Self {
        let by_id = participants.into_iter().map(|p| (p.id, p)).collect();
        Self { by_id }
    }

    /// Number of participants, `n`.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// True if the set has no participants.
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// The super-majority threshold: strictly more than `2n/3`.
    pub fn super_majority(&self) -> usize {
        (2 * self.len()) / 3 + 1
    }

    /// Looks up a participant by id.
    pub fn get(&self, id: u64) -> Option<&Participant> {
        self.by_id.get(&id)
    }

    /// Looks up a participant by public key, linear in `n` (the set is
    /// small and this is not a hot path).
    pub fn get_by_key(&self, public_key: &PublicKeyBytes) -> Option<&Participant> {
        self.by_id.values().find(|p| &p.public_key == public_key)
    }

    /// Iterates participants in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.by_id.values()
    }

    /// All participant ids, ascending.
    pub fn ids(&self) -> Vec<u64> {
        self.by_id.keys().copied().collect()
    }
}

/// Whether a witness's fame has been decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FameVote {
    /// Fame not yet resolved.
    Undecided,
    /// Decided famous.
    Yes,
    /// Decided not famous.
    No,
}

/// A signature over a block, gossiped by creators that have observed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSignature {
    /// Index of the block being signed.
    pub block_index: u64,
    /// Signer's public key.
    pub validator: PublicKeyBytes,
    /// Signature over the block's hash.
    pub signature: SignatureBytes,
}

/// The body of an event: everything the creator signs.
///
/// Split from [`Event`] so hashing/signing has a single, stable byte
/// representation independent of the event's own cached hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventBody {
    /// Creator's public key.
    pub creator: PublicKeyBytes,
    /// Monotonic per-creator sequence number, starting at 0.
    pub index: u64,
    /// Hash of the creator's previous event; `None` iff `index == 0`.
    pub self_parent: Option<Hash>,
    /// Hash of an event from another creator; `None` only permitted at
    /// `index == 0`.
    pub other_parent: Option<Hash>,
    /// Ordered transactions included by the creator.
    pub transactions: Vec<Transaction>,
    /// Block signatures the creator is gossiping.
    pub block_signatures: Vec<BlockSignature>,
    /// Creation timestamp (creator's local clock, milliseconds since epoch).
    pub timestamp: u64,
}

/// A signed, immutable event.
///
/// `Event` never changes after construction; all consensus-derived state
/// (round, witness flag, fame, etc.) is tracked separately by Poset in an
/// [`EventRecord`], keyed by the event's hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// The signed body.
    pub body: EventBody,
    /// Creator's signature over the BLAKE3 hash of `body`.
    pub signature: SignatureBytes,
}

impl Event {
    /// The canonical hash: BLAKE3 over the bincode encoding of `body`.
    pub fn hash(&self) -> Hash {
        let encoded = bincode::serialize(&self.body).expect("EventBody always serializable");
        *blake3::hash(&encoded).as_bytes()
    }

    /// True if this event is index 0 for its creator (no self-parent).
    pub fn is_root(&self) -> bool {
        self.body.index == 0
    }
}

/// Consensus-derived decorations for one event, cached by Poset and
/// persisted by Store alongside the event itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    /// The event.
    pub event: Event,
    /// Cached hash (avoids re-hashing on every lookup).
    pub hash: Hash,
    /// Assigned round.
    pub round: u64,
    /// Whether this event is a witness for its round.
    pub is_witness: bool,
    /// Fame decision, only meaningful if `is_witness`.
    pub famous: FameVote,
    /// Round in which this event was received into consensus order, once
    /// decided.
    pub round_received: Option<u64>,
    /// Median consensus timestamp, once `round_received` is set.
    pub consensus_timestamp: Option<u64>,
    /// Monotonic insertion-order index (topological order within this
    /// process, not the final consensus order).
    pub topological_index: u64,
    /// Flag table: for each participant id, the hash of the earliest
    /// witness ancestor of that creator seen by this event.
    pub flag_table: BTreeMap<u64, Hash>,
}

/// Per-round bookkeeping: which events are witnesses and their fame.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoundInfo {
    /// Witness hashes for this round, in the order they were assigned.
    pub witnesses: Vec<Hash>,
    /// Fame decisions keyed by witness hash.
    pub fame: BTreeMap<Hash, FameVote>,
    /// Every event assigned this as its structural round, witness or
    /// not, in assignment order. Superset of `witnesses`.
    pub events: Vec<Hash>,
    /// Events whose `roundReceived` is this round, in final consensus
    /// total order. Populated once this round's block is assembled.
    pub received: Vec<Hash>,
}

impl RoundInfo {
    /// True once every witness in this round has a decided fame.
    pub fn is_decided(&self) -> bool {
        !self.witnesses.is_empty()
            && self
                .witnesses
                .iter()
                .all(|w| !matches!(self.fame.get(w), None | Some(FameVote::Undecided)))
    }
}

/// A bootstrap snapshot at a given round: enough to seed a fresh node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    /// The round this frame snapshots.
    pub round: u64,
    /// Root event hash per participant id at this round.
    pub roots: BTreeMap<u64, Hash>,
    /// Events included in the snapshot.
    pub events: Vec<Event>,
}

/// A totally-ordered, committed block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Monotonic block index, starting at 0.
    pub index: u64,
    /// The round in which this block's events were received.
    pub round_received: u64,
    /// State hash, filled in asynchronously by the application.
    pub state_hash: Option<Hash>,
    /// Hash of the frame snapshot for `round_received`.
    pub frame_hash: Hash,
    /// Concatenated transactions from all events in this block, in
    /// consensus order.
    pub transactions: Vec<Transaction>,
    /// Signatures gossiped so far for this block.
    pub signatures: Vec<BlockSignature>,
}

impl Block {
    /// Canonical hash: BLAKE3 over the bincode encoding of the block with
    /// `signatures` cleared (signatures are appended after the hash is
    /// known and must not change it).
    pub fn hash(&self) -> Hash {
        let mut for_hash = self.clone();
        for_hash.signatures.clear();
        let encoded = bincode::serialize(&for_hash).expect("Block always serializable");
        *blake3::hash(&encoded).as_bytes()
    }
}

/// An event as it travels over the wire: parent references are replaced
/// by `(creator_id, index)` pairs so the payload doesn't repeat 32-byte
/// hashes the receiver can resolve locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireEvent {
    /// Creator's participant id.
    pub creator_id: u64,
    /// Sequence number.
    pub index: u64,
    /// Self-parent's index (creator is implicit); `None` iff `index == 0`.
    pub self_parent_index: Option<u64>,
    /// Other-parent's creator id and index.
    pub other_parent: Option<(u64, u64)>,
    /// Transactions.
    pub transactions: Vec<Transaction>,
    /// Block signatures.
    pub block_signatures: Vec<BlockSignature>,
    /// Creation timestamp.
    pub timestamp: u64,
    /// Creator's signature over the body.
    pub signature: SignatureBytes,
}

/// Node operational state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeState {
    /// Normal gossip operation.
    Babbling,
    /// A sync reported `syncLimit`; must fast-forward before resuming.
    CatchingUp,
    /// Terminal; all loops have been signalled to stop.
    Shutdown,
}
