//! # Fame Election (Virtual Voting)
//!
//! The pure vote-computation rules from the fame election algorithm,
//! factored out of [`crate::poset::Poset`]'s round-iteration loop so
//! they can be tested without a full poset instance.

/// Default coin-round period. A protocol constant, not a per-node
/// setting: varying it across nodes would break determinism.
pub const DEFAULT_COIN_ROUND_PERIOD: u64 = 10;

/// The deterministic pseudorandom coin bit for a coin round: the low
/// bit of the deciding witness's signature's first byte. Reuses bytes
/// already persisted with the event rather than introducing a fresh
/// randomness source.
pub fn coin_flip(signature: &[u8; 64]) -> bool {
    signature[0] & 1 == 1
}

/// Splits a set of votes into (yes, no) counts.
pub fn tally(votes: &[bool]) -> (usize, usize) {
    let yes = votes.iter().filter(|v| **v).count();
    (yes, votes.len() - yes)
}

/// `> 2/3` supermajority check; returns the agreed value if one side
/// clears the threshold.
pub fn supermajority(yes: usize, no: usize, total: usize) -> Option<bool> {
    if total == 0 {
        return None;
    }
    if 3 * yes > 2 * total {
        Some(true)
    } else if 3 * no > 2 * total {
        Some(false)
    } else {
        None
    }
}

/// Simple majority, ties broken toward `true`.
pub fn majority(yes: usize, no: usize) -> bool {
    yes >= no
}

/// Computes a single witness `y`'s vote on witness `w`'s fame at
/// distance `d = y.round - w.round`.
///
/// - `d == 1`: the vote is whether `y` sees `w` (ancestor reachability).
/// - `d > 1`: majority/supermajority of the round-`d-1` votes `y`
///   strongly sees, falling back to a coin flip on coin rounds.
///
/// Returns `(vote, decided_by_supermajority)`; the caller decides `w`'s
/// fame as `vote` when `decided_by_supermajority` is true and `d` is not
/// a coin round.
pub fn compute_vote(
    d: u64,
    y_sees_w: bool,
    strongly_seen_prev_votes: &[bool],
    y_signature: &[u8; 64],
    coin_period: u64,
) -> (bool, bool) {
    if d == 1 {
        return (y_sees_w, false);
    }

    let (yes, no) = tally(strongly_seen_prev_votes);
    let total = strongly_seen_prev_votes.len();

    if let Some(agreed) = supermajority(yes, no, total) {
        return (agreed, true);
    }

    if d % coin_period == 0 {
        (coin_flip(y_signature), false)
    } else {
        (majority(yes, no), false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_one_vote_mirrors_sees() {
        let (vote, decided) = compute_vote(1, true, &[], &[0u8; 64], DEFAULT_COIN_ROUND_PERIOD);
        assert!(vote);
        assert!(!decided);
    }

    #[test]
    fn supermajority_of_prior_votes_decides() {
        let votes = vec![true, true, true, false];
        let (vote, decided) = compute_vote(2, false, &votes, &[0u8; 64], DEFAULT_COIN_ROUND_PERIOD);
        assert!(vote);
        assert!(decided);
    }

    #[test]
    fn no_supermajority_falls_back_to_majority_with_tie_toward_true() {
        let votes = vec![true, false];
        let (vote, decided) = compute_vote(2, false, &votes, &[0u8; 64], DEFAULT_COIN_ROUND_PERIOD);
        assert!(vote); // tie -> true
        assert!(!decided);
    }

    #[test]
    fn coin_round_with_no_supermajority_uses_signature_low_bit() {
        let votes = vec![true, false, true, false]; // tied, no supermajority
        let even_sig = [0u8; 64];
        let odd_sig = [1u8; 64];
        let (vote_even, decided_even) =
            compute_vote(DEFAULT_COIN_ROUND_PERIOD, false, &votes, &even_sig, DEFAULT_COIN_ROUND_PERIOD);
        let (vote_odd, decided_odd) =
            compute_vote(DEFAULT_COIN_ROUND_PERIOD, false, &votes, &odd_sig, DEFAULT_COIN_ROUND_PERIOD);
        assert!(!decided_even && !decided_odd);
        assert!(!vote_even);
        assert!(vote_odd);
    }

    #[test]
    fn coin_flip_reads_low_bit_of_first_byte() {
        assert!(!coin_flip(&[0u8; 64]));
        assert!(coin_flip(&[1u8; 64]));
        assert!(!coin_flip(&[2u8; 64]));
    }
}
