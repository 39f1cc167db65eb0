//! # Round Received & Total Order
//!
//! Consensus timestamp computation and the total-order comparator for
//! events sharing a `roundReceived`.

use shared_types::Hash;

/// Median of the self-ancestor timestamps at which each famous witness
/// first reached the event — the event's consensus timestamp.
///
/// `timestamps` need not be sorted on entry.
pub fn median_timestamp(mut timestamps: Vec<u64>) -> u64 {
    assert!(!timestamps.is_empty(), "median of no witnesses is undefined");
    timestamps.sort_unstable();
    let mid = timestamps.len() / 2;
    if timestamps.len() % 2 == 1 {
        timestamps[mid]
    } else {
        // Even count: average the two middle values, rounding down.
        (timestamps[mid - 1] + timestamps[mid]) / 2
    }
}

/// XORs a set of signatures together for the whitening tiebreaker.
pub fn whiten_signatures(signatures: &[[u8; 64]]) -> [u8; 64] {
    let mut result = [0u8; 64];
    for sig in signatures {
        for (r, b) in result.iter_mut().zip(sig.iter()) {
            *r ^= b;
        }
    }
    result
}

/// One event's sort key within a `roundReceived` bucket: consensus
/// timestamp ascending, then distance from the whitened signature
/// (smaller XOR-distance first), then hash, each a deterministic
/// tiebreaker over the previous.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderKey {
    /// Consensus timestamp.
    pub consensus_timestamp: u64,
    /// `signature XOR whitened_signature`, compared byte-wise.
    pub whitening_distance: [u8; 64],
    /// Final tiebreaker.
    pub hash: Hash,
}

impl OrderKey {
    /// Builds the sort key for an event given the round's whitened
    /// signature.
    pub fn new(consensus_timestamp: u64, event_signature: &[u8; 64], whitened: &[u8; 64], hash: Hash) -> Self {
        let mut distance = [0u8; 64];
        for ((d, e), w) in distance.iter_mut().zip(event_signature.iter()).zip(whitened.iter()) {
            *d = e ^ w;
        }
        Self {
            consensus_timestamp,
            whitening_distance: distance,
            hash,
        }
    }
}

impl PartialOrd for OrderKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.consensus_timestamp
            .cmp(&other.consensus_timestamp)
            .then_with(|| self.whitening_distance.cmp(&other.whitening_distance))
            .then_with(|| self.hash.cmp(&other.hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_of_odd_count_is_middle_value() {
        assert_eq!(median_timestamp(vec![5, 1, 3]), 3);
    }

    #[test]
    fn median_of_even_count_averages_middle_two() {
        assert_eq!(median_timestamp(vec![1, 2, 3, 4]), 2);
    }

    #[test]
    fn whiten_signatures_is_commutative_xor() {
        let a = [1u8; 64];
        let b = [2u8; 64];
        let mut expected = [0u8; 64];
        for i in 0..64 {
            expected[i] = a[i] ^ b[i];
        }
        assert_eq!(whiten_signatures(&[a, b]), expected);
        assert_eq!(whiten_signatures(&[b, a]), expected);
    }

    #[test]
    fn order_key_sorts_by_timestamp_first() {
        let whitened = [0u8; 64];
        let k1 = OrderKey::new(10, &[0u8; 64], &whitened, [1u8; 32]);
        let k2 = OrderKey::new(5, &[0u8; 64], &whitened, [2u8; 32]);
        assert!(k2 < k1);
    }

    #[test]
    fn order_key_falls_back_to_hash_when_timestamps_and_whitening_tie() {
        let whitened = [0u8; 64];
        let k1 = OrderKey::new(10, &[0u8; 64], &whitened, [1u8; 32]);
        let k2 = OrderKey::new(10, &[0u8; 64], &whitened, [2u8; 32]);
        assert!(k1 < k2);
    }
}
