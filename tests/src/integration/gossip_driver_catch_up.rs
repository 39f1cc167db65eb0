//! A joining node whose gossip driver starts in `CatchingUp` fast-forwards
//! against a real sync server and block-signature backfill call, over the
//! actual wire protocol, and transitions back to `Babbling`.

#[cfg(test)]
mod tests {
    use crate::harness::TestNetwork;
    use node::fatal;
    use node::gossip::GossipDriver;
    use node::handler::CoreSyncHandler;
    use node::state::NodeStateHandle;
    use shared_crypto::Ed25519KeyPair;
    use shared_types::{NodeState, Participant, ParticipantSet};
    use std::sync::Arc;
    use std::time::Duration;
    use store::adapters::memory::InMemoryStore;
    use store::Store;
    use sync::{SyncClient, SyncServer};

    #[tokio::test]
    async fn catching_up_node_fast_forwards_over_real_transport_and_resumes_babbling() {
        let network = TestNetwork::new(3);
        network.genesis_all();
        network.gossip_rounds(12);

        let source = network
            .nodes
            .iter()
            .find(|n| n.store.last_block_index().unwrap().is_some())
            .expect("three nodes gossiping for twelve rounds should have decided at least one block");

        let handler: Arc<dyn sync::SyncHandler> =
            Arc::new(CoreSyncHandler::new(source.core.clone(), source.store.clone()));
        let server = SyncServer::bind("127.0.0.1:0", handler).await.unwrap();
        let addr = server.local_addr().unwrap();
        let (_server_shutdown_tx, server_shutdown_rx) = tokio::sync::watch::channel(false);
        tokio::spawn(server.serve(server_shutdown_rx));

        // A brand-new node, sharing the network's participant set except
        // the source's address is swapped for the server actually bound
        // above, since TestNetwork's addresses are never listened on.
        let keypair = Ed25519KeyPair::generate();
        let participant = Participant::new(*keypair.public_key().as_bytes(), "127.0.0.1:9997".to_string());
        let mut participants: Vec<Participant> = network.participants.iter().cloned().collect();
        for p in &mut participants {
            if p.id == source.participant.id {
                p.net_addr = addr.to_string();
            }
        }
        participants.push(participant);
        let participants = ParticipantSet::new(participants);

        let store: Arc<dyn Store> = Arc::new(InMemoryStore::default());
        let (poset, _blocks) = poset::Poset::new(store.clone(), participants.clone(), poset::PosetConfig::default());
        let poset = Arc::new(poset);
        let self_id = Participant::derive_id(keypair.public_key().as_bytes());
        let core = Arc::new(node_core::Core::new(store.clone(), poset.clone(), participants.clone(), keypair).unwrap());

        let state = NodeStateHandle::new(NodeState::CatchingUp);
        let (fatal_handle, _fatal_rx) = fatal::channel();
        let client = SyncClient::new(Duration::from_secs(1));
        let driver = GossipDriver::new(
            core,
            poset,
            store.clone(),
            participants,
            self_id,
            client,
            state.clone(),
            fatal_handle,
            Duration::from_millis(20),
        );

        let (driver_shutdown_tx, driver_shutdown_rx) = tokio::sync::watch::channel(false);
        let driver_task = tokio::spawn(driver.run(driver_shutdown_rx));

        let mut observed_catching_up = state.get() == NodeState::CatchingUp;
        let mut resumed = false;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            match state.get() {
                NodeState::CatchingUp => observed_catching_up = true,
                NodeState::Babbling => {
                    resumed = true;
                    break;
                }
                NodeState::Shutdown => break,
            }
        }

        let _ = driver_shutdown_tx.send(true);
        driver_task.await.unwrap();

        assert!(observed_catching_up, "driver never started in CatchingUp");
        assert!(resumed, "driver never transitioned back to Babbling after fast-forward");

        let adopted = store.last_block_index().unwrap();
        assert!(adopted.is_some(), "joining node never adopted a fast-forwarded block");
    }
}
