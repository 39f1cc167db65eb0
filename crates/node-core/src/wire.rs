//! # Wire ↔ event conversion
//!
//! An event's parent hashes are 32 bytes each; a wire event replaces them
//! with `(creator_id, index)` pairs the receiver resolves locally, so a
//! sync response doesn't repeat hashes the peer already has the
//! ingredients to recompute. Resolution in both directions goes through
//! [`store::Store`], so these are free functions rather than methods on
//! [`crate::Core`] — nothing here needs `Core`'s pools or keypair.

use shared_types::{Event, EventBody, Hash, Participant, ParticipantSet, WireEvent};
use store::Store;

/// Converts a stored event into its wire representation, resolving the
/// other-parent hash to a `(creator_id, index)` pair via `store`.
pub fn event_to_wire(store: &dyn Store, event: &Event) -> Result<WireEvent, shared_types::StoreError> {
    let creator_id = Participant::derive_id(&event.body.creator);
    let self_parent_index = if event.body.index == 0 {
        None
    } else {
        Some(event.body.index - 1)
    };
    let other_parent = match event.body.other_parent {
        Some(hash) => {
            let other = store.get_event(&hash)?;
            Some((Participant::derive_id(&other.body.creator), other.body.index))
        }
        None => None,
    };
    Ok(WireEvent {
        creator_id,
        index: event.body.index,
        self_parent_index,
        other_parent,
        transactions: event.body.transactions.clone(),
        block_signatures: event.body.block_signatures.clone(),
        timestamp: event.body.timestamp,
        signature: event.signature,
    })
}

/// Reconstructs a full event from its wire representation, resolving
/// `(creator_id, index)` references back to hashes via `store`.
///
/// Fails with `StoreError::NotFound` if a referenced parent hasn't been
/// seen yet — within a single sync batch this can only happen if the
/// batch wasn't delivered in topological order, which is the sender's
/// responsibility to guarantee.
pub fn wire_to_event(
    store: &dyn Store,
    participants: &ParticipantSet,
    wire: &WireEvent,
) -> Result<Event, shared_types::StoreError> {
    let participant = participants.get(wire.creator_id).ok_or_else(|| {
        shared_types::StoreError::NotFound(format!("participant {}", wire.creator_id))
    })?;
    let self_parent: Option<Hash> = match wire.self_parent_index {
        Some(index) => Some(store.event_hash_at(wire.creator_id, index)?),
        None => None,
    };
    let other_parent: Option<Hash> = match wire.other_parent {
        Some((creator_id, index)) => Some(store.event_hash_at(creator_id, index)?),
        None => None,
    };
    let body = EventBody {
        creator: participant.public_key,
        index: wire.index,
        self_parent,
        other_parent,
        transactions: wire.transactions.clone(),
        block_signatures: wire.block_signatures.clone(),
        timestamp: wire.timestamp,
    };
    Ok(Event {
        body,
        signature: wire.signature,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_crypto::Ed25519KeyPair;
    use store::adapters::memory::InMemoryStore;

    fn sign(keypair: &Ed25519KeyPair, body: EventBody) -> Event {
        let hash = {
            let encoded = bincode::serialize(&body).unwrap();
            *blake3::hash(&encoded).as_bytes()
        };
        let signature = keypair.sign(&hash);
        Event {
            body,
            signature: *signature.as_bytes(),
        }
    }

    #[test]
    fn wire_round_trips_through_store_resolution() {
        let store = InMemoryStore::default();
        let a = Ed25519KeyPair::generate();
        let b = Ed25519KeyPair::generate();
        let participants = ParticipantSet::new(vec![
            Participant::new(*a.public_key().as_bytes(), "a:9000".into()),
            Participant::new(*b.public_key().as_bytes(), "b:9000".into()),
        ]);

        let a_root = sign(
            &a,
            EventBody {
                creator: *a.public_key().as_bytes(),
                index: 0,
                self_parent: None,
                other_parent: None,
                transactions: vec![],
                block_signatures: vec![],
                timestamp: 1,
            },
        );
        store.set_event(a_root.clone()).unwrap();

        let b_root = sign(
            &b,
            EventBody {
                creator: *b.public_key().as_bytes(),
                index: 0,
                self_parent: None,
                other_parent: None,
                transactions: vec![],
                block_signatures: vec![],
                timestamp: 1,
            },
        );
        store.set_event(b_root.clone()).unwrap();

        let a_second = sign(
            &a,
            EventBody {
                creator: *a.public_key().as_bytes(),
                index: 1,
                self_parent: Some(a_root.hash()),
                other_parent: Some(b_root.hash()),
                transactions: vec![b"hi".to_vec()],
                block_signatures: vec![],
                timestamp: 2,
            },
        );
        store.set_event(a_second.clone()).unwrap();

        let wire = event_to_wire(&store, &a_second).unwrap();
        assert_eq!(wire.self_parent_index, Some(0));
        assert_eq!(wire.other_parent, Some((Participant::derive_id(b.public_key().as_bytes()), 0)));

        let reconstructed = wire_to_event(&store, &participants, &wire).unwrap();
        assert_eq!(reconstructed, a_second);
    }

    #[test]
    fn wire_to_event_fails_for_unresolved_parent() {
        let store = InMemoryStore::default();
        let a = Ed25519KeyPair::generate();
        let participants = ParticipantSet::new(vec![Participant::new(
            *a.public_key().as_bytes(),
            "a:9000".into(),
        )]);
        let wire = WireEvent {
            creator_id: Participant::derive_id(a.public_key().as_bytes()),
            index: 1,
            self_parent_index: Some(0),
            other_parent: None,
            transactions: vec![],
            block_signatures: vec![],
            timestamp: 1,
            signature: [0u8; 64],
        };
        assert!(wire_to_event(&store, &participants, &wire).is_err());
    }
}
