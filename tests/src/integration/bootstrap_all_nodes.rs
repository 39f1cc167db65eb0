//! A network of nodes persists blocks to disk, survives a full process
//! restart, and continues committing new blocks on top of the ones it
//! already had, leaving the pre-restart blocks byte-for-byte unchanged.

#[cfg(test)]
mod tests {
    use node_core::Core;
    use poset::{Poset, PosetConfig};
    use shared_crypto::Ed25519KeyPair;
    use shared_types::{Block, Participant, ParticipantSet};
    use std::sync::Arc;
    use store::adapters::rocksdb::{RocksDbConfig, RocksDbStore};
    use store::Store;
    use tempfile::TempDir;

    struct Node {
        core: Arc<Core>,
        store: Arc<dyn Store>,
    }

    fn open_store(dir: &TempDir) -> Arc<dyn Store> {
        Arc::new(RocksDbStore::open(RocksDbConfig::for_testing(dir.path().to_string_lossy().to_string())).unwrap())
    }

    fn sync_once(nodes: &[Node], puller: usize, source: usize) {
        let known = nodes[puller].core.known_events().unwrap();
        let diff = nodes[source].core.event_diff(&known).unwrap();
        nodes[puller].core.sync(diff).unwrap();
        let other_parent = nodes[source].core.head();
        nodes[puller].core.add_self_event(other_parent).unwrap();
    }

    fn gossip_rounds(nodes: &[Node], rounds: usize) {
        let n = nodes.len();
        for _ in 0..rounds {
            for i in 0..n {
                let source = (i + 1) % n;
                if source != i {
                    sync_once(nodes, i, source);
                }
            }
        }
    }

    #[test]
    fn restarted_network_keeps_prior_blocks_and_keeps_committing() {
        const N: usize = 4;

        let dirs: Vec<TempDir> = (0..N).map(|_| TempDir::new().unwrap()).collect();
        let mut seeds = Vec::with_capacity(N);
        let mut keypairs = Vec::with_capacity(N);
        let mut list = Vec::with_capacity(N);
        for i in 0..N {
            let keypair = Ed25519KeyPair::generate();
            seeds.push(keypair.to_seed());
            list.push(Participant::new(*keypair.public_key().as_bytes(), format!("127.0.0.1:{}", 9100 + i)));
            keypairs.push(keypair);
        }
        let participants = ParticipantSet::new(list);

        let mut nodes: Vec<Node> = keypairs
            .into_iter()
            .zip(&dirs)
            .map(|(keypair, dir)| {
                let store = open_store(dir);
                let (poset, _blocks) = Poset::new(store.clone(), participants.clone(), PosetConfig::default());
                let poset = Arc::new(poset);
                let core = Arc::new(Core::new(store.clone(), poset, participants.clone(), keypair).unwrap());
                Node { core, store }
            })
            .collect();

        for node in &nodes {
            node.core.add_self_event(None).unwrap();
        }
        gossip_rounds(&nodes, 15);

        let committed_before: Vec<Option<u64>> =
            nodes.iter().map(|n| n.store.last_block_index().unwrap()).collect();
        assert!(
            committed_before.iter().any(|idx| idx.is_some()),
            "four nodes gossiping for fifteen rounds should have decided at least one block"
        );

        let blocks_before: Vec<Vec<Block>> = nodes
            .iter()
            .map(|n| {
                let last = n.store.last_block_index().unwrap();
                match last {
                    Some(last) => (0..=last).map(|i| n.store.get_block(i).unwrap()).collect(),
                    None => Vec::new(),
                }
            })
            .collect();

        // Drop every in-process handle so each node's RocksDB lock is
        // released before reopening the same datadir.
        drop(nodes);

        let nodes: Vec<Node> = seeds
            .into_iter()
            .zip(&dirs)
            .map(|(seed, dir)| {
                let keypair = Ed25519KeyPair::from_seed(seed);
                let store = open_store(dir);
                let (poset, _blocks) = Poset::rebuild(store.clone(), participants.clone(), PosetConfig::default())
                    .expect("replaying a node's own persisted events must succeed");
                let poset = Arc::new(poset);
                let core = Arc::new(Core::new(store.clone(), poset, participants.clone(), keypair).unwrap());
                Node { core, store }
            })
            .collect();

        // The pre-restart blocks survived the restart unchanged.
        for (node, before) in nodes.iter().zip(&blocks_before) {
            let last = node.store.last_block_index().unwrap();
            for block in before {
                let after = node.store.get_block(block.index).unwrap();
                assert_eq!(after.frame_hash, block.frame_hash);
                assert_eq!(after.transactions, block.transactions);
                assert_eq!(after.round_received, block.round_received);
            }
            assert!(last.unwrap_or(0) >= before.last().map_or(0, |b| b.index));
        }

        // The resumed network keeps making progress past where it left off.
        gossip_rounds(&nodes, 15);
        let committed_after: Vec<Option<u64>> =
            nodes.iter().map(|n| n.store.last_block_index().unwrap()).collect();
        for (before, after) in committed_before.iter().zip(&committed_after) {
            assert!(after.unwrap_or(0) >= before.unwrap_or(0));
        }
        assert!(
            committed_after.iter().any(|idx| idx.unwrap_or(0) > 0),
            "resumed network should keep committing blocks after restart"
        );
    }
}
