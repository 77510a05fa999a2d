//! Peer-review assignment.
//!
//! At the watch→review boundary every player is assigned exactly one other
//! player whose guesses they must judge. The assignment is a single cyclic
//! rotation of the roster, which for any rotation amount in `[1, N-1]` is a
//! derangement: nobody reviews themselves, everyone reviews exactly one
//! peer and is reviewed by exactly one peer.
//!
//! The mapping is ephemeral. It is generated once per phase transition,
//! published on a side channel, and never persisted; a later call draws a
//! fresh rotation.

use std::collections::HashMap;

use rand::Rng;
use thiserror::Error;

use super::types::Player;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReviewAssignmentError {
    #[error("review assignment requires at least 2 players, got {0}")]
    NotEnoughPlayers(usize),
}

/// Map each player to the peer whose guesses they review.
///
/// Keyed by the reviewer's name; the value is the reviewee's full record,
/// guesses included, so the client can render the review screen from the
/// mapping alone.
pub type ReviewAssignment = HashMap<String, Player>;

/// Draw a random cyclic assignment over `roster`.
///
/// Rotation amount `k` is uniform in `[1, N-1]`; `roster[i]` reviews
/// `roster[(i + N - k) % N]`, matching a right-rotation of the roster by
/// `k` positions. Fewer than two players is an invariant violation: there
/// is no peer to review, and silently skipping would strand the lobby in
/// the review phase with no assignment.
pub fn assign_reviewers<R: Rng + ?Sized>(
    roster: &[Player],
    rng: &mut R,
) -> Result<ReviewAssignment, ReviewAssignmentError> {
    let n = roster.len();
    if n < 2 {
        return Err(ReviewAssignmentError::NotEnoughPlayers(n));
    }

    let k = rng.gen_range(1..n);
    let mut assignment = ReviewAssignment::with_capacity(n);
    for (i, reviewer) in roster.iter().enumerate() {
        let reviewee = &roster[(i + n - k) % n];
        assignment.insert(reviewer.name.clone(), reviewee.clone());
    }
    Ok(assignment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;
    use uuid::Uuid;

    fn roster(names: &[&str]) -> Vec<Player> {
        names
            .iter()
            .map(|name| Player::new(*name, Uuid::nil(), "#cccccc"))
            .collect()
    }

    #[test]
    fn three_players_always_yield_a_derangement() {
        let players = roster(&["a", "b", "c"]);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let assignment = assign_reviewers(&players, &mut rng).unwrap();
            assert_eq!(assignment.len(), 3);
            let mut reviewees = HashSet::new();
            for (reviewer, reviewee) in &assignment {
                assert_ne!(reviewer, &reviewee.name, "fixed point in assignment");
                assert!(reviewees.insert(reviewee.name.clone()), "reviewee repeated");
            }
        }
    }

    #[test]
    fn two_players_always_swap() {
        let players = roster(&["a", "b"]);
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..20 {
            let assignment = assign_reviewers(&players, &mut rng).unwrap();
            assert_eq!(assignment["a"].name, "b");
            assert_eq!(assignment["b"].name, "a");
        }
    }

    #[test]
    fn reviewee_record_carries_guesses() {
        let mut players = roster(&["a", "b"]);
        players[1]
            .guesses
            .push(crate::game::types::Guess::new("rain starts"));
        let mut rng = StdRng::seed_from_u64(3);
        let assignment = assign_reviewers(&players, &mut rng).unwrap();
        assert_eq!(assignment["a"].guesses.len(), 1);
        assert_eq!(assignment["a"].guesses[0].guess, "rain starts");
    }

    #[test]
    fn lone_player_is_rejected() {
        let players = roster(&["a"]);
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            assign_reviewers(&players, &mut rng),
            Err(ReviewAssignmentError::NotEnoughPlayers(1))
        );
        assert_eq!(
            assign_reviewers(&[], &mut rng),
            Err(ReviewAssignmentError::NotEnoughPlayers(0))
        );
    }
}
