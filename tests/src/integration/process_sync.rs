//! A sync response carries exactly the events the requester is missing,
//! reconstructed from the responder's own store.

#[cfg(test)]
mod tests {
    use crate::harness::TestNetwork;

    #[test]
    fn sync_returns_only_the_responders_missing_events() {
        let network = TestNetwork::new(2);
        network.genesis_all();

        let a_known = network.nodes[0].core.known_events().unwrap();
        assert_eq!(a_known.get(&network.nodes[0].participant.id), Some(&0));

        // B computes its diff against A's known map: B's own genesis is
        // the only event A hasn't seen yet.
        let diff = network.nodes[1].core.event_diff(&a_known).unwrap();
        assert_eq!(diff.len(), 1);
        assert_eq!(diff[0].creator_id, network.nodes[1].participant.id);
        assert_eq!(diff[0].index, 0);

        // A inserts the diff and can now see B's genesis too.
        network.nodes[0].core.sync(diff).unwrap();
        let a_known_after = network.nodes[0].core.known_events().unwrap();
        assert_eq!(a_known_after.get(&network.nodes[1].participant.id), Some(&0));
    }

    #[test]
    fn an_unsynced_node_reports_nothing_known_about_a_peer_it_has_never_heard_from() {
        let network = TestNetwork::new(2);
        network.genesis_all();

        let b_known = network.nodes[1].core.known_events().unwrap();
        assert_eq!(b_known.get(&network.nodes[0].participant.id), None);
    }
}
