//! # Multi-node test network
//!
//! Builds a set of [`Core`]/[`Poset`] pairs sharing one [`ParticipantSet`]
//! but each with its own in-memory store, and drives gossip between them
//! the same way the gossip driver's tick does: pull the peer's diff,
//! insert it, then create a self-event with the peer's head as
//! other-parent. The eager push-back half of a real tick is an
//! optimization, not load-bearing for consensus progress, so the harness
//! omits it.

use node_core::Core;
use poset::{Poset, PosetConfig};
use shared_crypto::Ed25519KeyPair;
use shared_types::{Block, NodeError, Participant, ParticipantSet};
use std::sync::Arc;
use store::adapters::memory::InMemoryStore;
use store::Store;
use tokio::sync::mpsc;

/// One node's consensus stack, plus the block-commit channel Poset feeds.
pub struct TestNode {
    pub core: Arc<Core>,
    pub poset: Arc<Poset>,
    pub store: Arc<dyn Store>,
    pub participant: Participant,
    pub blocks: mpsc::Receiver<Block>,
}

impl TestNode {
    /// Drains every block committed so far without blocking.
    pub fn drain_blocks(&mut self) -> Vec<Block> {
        let mut blocks = Vec::new();
        while let Ok(block) = self.blocks.try_recv() {
            blocks.push(block);
        }
        blocks
    }
}

/// A fixed set of nodes over a shared participant list, each with its own
/// store, wired up for manual gossip in test code.
pub struct TestNetwork {
    pub nodes: Vec<TestNode>,
    pub participants: ParticipantSet,
}

impl TestNetwork {
    /// Builds `n` nodes. Does not create genesis events; call
    /// [`TestNetwork::genesis_all`] for that.
    pub fn new(n: usize) -> Self {
        let mut keypairs = Vec::with_capacity(n);
        let mut list = Vec::with_capacity(n);
        for i in 0..n {
            let keypair = Ed25519KeyPair::generate();
            let participant =
                Participant::new(*keypair.public_key().as_bytes(), format!("127.0.0.1:{}", 9000 + i));
            list.push(participant);
            keypairs.push(keypair);
        }
        let participants = ParticipantSet::new(list);

        let nodes = keypairs
            .into_iter()
            .map(|keypair| {
                let id = Participant::derive_id(keypair.public_key().as_bytes());
                let participant = participants.get(id).expect("just inserted").clone();
                let store: Arc<dyn Store> = Arc::new(InMemoryStore::default());
                let (poset, blocks) = Poset::new(store.clone(), participants.clone(), PosetConfig::default());
                let poset = Arc::new(poset);
                let core = Arc::new(
                    Core::new(store.clone(), poset.clone(), participants.clone(), keypair)
                        .expect("fresh store never fails to seed head"),
                );
                TestNode { core, poset, store, participant, blocks }
            })
            .collect();

        Self { nodes, participants }
    }

    /// Has every node create its root event.
    pub fn genesis_all(&self) {
        for node in &self.nodes {
            node.core.add_self_event(None).unwrap();
        }
    }

    /// `puller` pulls everything `source` has that `puller` doesn't know
    /// about yet, then creates a self-event with `source`'s head as
    /// other-parent.
    pub fn sync_once(&self, puller: usize, source: usize) -> Result<(), NodeError> {
        let known = self.nodes[puller].core.known_events().map_err(NodeError::Integrity)?;
        let diff = self.nodes[source].core.event_diff(&known).map_err(NodeError::Integrity)?;
        self.nodes[puller].core.sync(diff)?;
        let other_parent = self.nodes[source].core.head();
        self.nodes[puller].core.add_self_event(other_parent)?;
        Ok(())
    }

    /// Runs `rounds` of round-robin pulls: node `i` pulls from node
    /// `(i + 1) % n` each round, in index order.
    pub fn gossip_rounds(&self, rounds: usize) {
        let n = self.nodes.len();
        for _ in 0..rounds {
            for i in 0..n {
                let source = (i + 1) % n;
                if source != i {
                    self.sync_once(i, source).unwrap();
                }
            }
        }
    }
}
