//! A node joining late (empty store) catches up to the rest of the
//! network through ordinary gossip rounds, without fast-forwarding, and
//! converges on the same events the others already share.

#[cfg(test)]
mod tests {
    use crate::harness::TestNetwork;
    use shared_crypto::Ed25519KeyPair;
    use shared_types::{Participant, ParticipantSet};
    use std::sync::Arc;
    use store::adapters::memory::InMemoryStore;
    use store::Store;

    #[test]
    fn late_joiner_converges_with_established_peers_over_repeated_gossip() {
        let network = TestNetwork::new(3);
        network.genesis_all();
        network.gossip_rounds(6);

        // A fourth node joins the same participant set but has produced
        // nothing yet; its own store starts empty.
        let keypair = Ed25519KeyPair::generate();
        let participant = Participant::new(*keypair.public_key().as_bytes(), "127.0.0.1:9998".to_string());
        let mut participants: Vec<Participant> = network.participants.iter().cloned().collect();
        participants.push(participant.clone());
        let participants = ParticipantSet::new(participants);

        let store: Arc<dyn Store> = Arc::new(InMemoryStore::default());
        let (poset, _blocks) = poset::Poset::new(store.clone(), participants.clone(), poset::PosetConfig::default());
        let poset = Arc::new(poset);
        let core = node_core::Core::new(store.clone(), poset, participants, keypair).unwrap();

        core.add_self_event(None).unwrap();

        // Pull from an established peer repeatedly, the same way an
        // ordinary (non-fast-forwarding) gossip tick would.
        let established = &network.nodes[0];
        for _ in 0..6 {
            let known = core.known_events().unwrap();
            let diff = established.core.event_diff(&known).unwrap();
            core.sync(diff).unwrap();
            let other_parent = established.core.head();
            core.add_self_event(other_parent).unwrap();
        }

        let established_known = established.core.known_events().unwrap();
        let joiner_known = core.known_events().unwrap();
        for id in established_known.keys() {
            assert!(
                joiner_known.contains_key(id),
                "late joiner never learned of participant {id}"
            );
        }
    }
}
