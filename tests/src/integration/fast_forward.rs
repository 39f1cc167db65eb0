//! A node fast-forwarding from a peer's decided frame and block starts
//! from at least that peer's last block index, with matching block
//! contents.

#[cfg(test)]
mod tests {
    use crate::harness::TestNetwork;
    use shared_crypto::Ed25519KeyPair;
    use shared_types::{Participant, ParticipantSet};
    use std::sync::Arc;
    use store::adapters::memory::InMemoryStore;
    use store::Store;

    #[test]
    fn fast_forwarded_node_adopts_the_source_nodes_latest_block() {
        let network = TestNetwork::new(3);
        network.genesis_all();

        // Enough gossip rounds for at least one block to reach consensus
        // across three honest, fully-connected nodes.
        network.gossip_rounds(12);

        let source = network.nodes.iter().find(|n| n.store.last_block_index().unwrap().is_some()).expect(
            "three nodes gossiping for twelve rounds should have decided at least one block",
        );
        let block_index = source.store.last_block_index().unwrap().unwrap();
        let block = source.store.get_block(block_index).unwrap();
        let frame = source.store.get_frame(block.round_received).unwrap();

        // A brand-new node, participating in the same set but with no
        // events of its own yet.
        let keypair = Ed25519KeyPair::generate();
        let participant = Participant::new(*keypair.public_key().as_bytes(), "127.0.0.1:9999".to_string());
        let mut participants: Vec<Participant> = network.participants.iter().cloned().collect();
        participants.push(participant);
        let participants = ParticipantSet::new(participants);

        let store: Arc<dyn Store> = Arc::new(InMemoryStore::default());
        let (poset, _blocks) = poset::Poset::new(store.clone(), participants.clone(), poset::PosetConfig::default());
        let poset = Arc::new(poset);
        let core = node_core::Core::new(store.clone(), poset.clone(), participants, keypair).unwrap();

        core.fast_forward(frame, block.clone()).unwrap();

        let adopted = store.last_block_index().unwrap().unwrap();
        assert!(adopted >= block_index);
        let adopted_block = store.get_block(adopted).unwrap();
        assert_eq!(adopted_block.frame_hash, block.frame_hash);
    }
}
