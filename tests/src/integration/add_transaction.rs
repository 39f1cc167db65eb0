//! A transaction submitted to one node rides that node's next self-event
//! and is visible to a peer after one sync round.

#[cfg(test)]
mod tests {
    use crate::harness::TestNetwork;

    #[test]
    fn submitted_transaction_is_drained_into_the_next_self_event() {
        let network = TestNetwork::new(2);
        network.genesis_all();

        network.nodes[0].core.submit_transaction(b"Hello World!".to_vec()).unwrap();
        let hash = network.nodes[0].core.add_self_event(None).unwrap();

        let event = network.nodes[0].store.get_event(&hash).unwrap();
        assert_eq!(event.body.transactions, vec![b"Hello World!".to_vec()]);

        // The pool is empty again: a second self-event carries nothing.
        let second = network.nodes[0].core.add_self_event(None).unwrap();
        let second_event = network.nodes[0].store.get_event(&second).unwrap();
        assert!(second_event.body.transactions.is_empty());
    }

    #[test]
    fn peer_observes_the_transaction_after_one_sync_round() {
        let network = TestNetwork::new(2);
        network.genesis_all();

        network.nodes[0].core.submit_transaction(b"Hello World!".to_vec()).unwrap();
        network.nodes[0].core.add_self_event(None).unwrap();

        network.sync_once(1, 0).unwrap();

        let a_head = network.nodes[0].core.head().unwrap();
        let event = network.nodes[1].store.get_event(&a_head).unwrap();
        assert_eq!(event.body.transactions, vec![b"Hello World!".to_vec()]);
    }
}
