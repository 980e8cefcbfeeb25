//! End-of-replay classification.

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

use crate::state::{GameState, PlayerState};

/// How a session ended, judged from its final snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "players", rename_all = "snake_case")]
pub enum Outcome {
    /// Exactly one racer still has HP.
    Winner(PlayerState),
    /// Nobody survived.
    NoSurvivors,
    /// Several racers survived; listed in display order.
    MultiWinner(Vec<PlayerState>),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Winner(p) => write!(f, "{} wins with {} HP", p.name, p.hp),
            Outcome::NoSurvivors => f.write_str("no survivors"),
            Outcome::MultiWinner(players) => {
                let names: Vec<&str> = players.iter().map(|p| p.name.as_str()).collect();
                write!(f, "shared victory: {}", names.join(", "))
            }
        }
    }
}

fn display_order(a: &PlayerState, b: &PlayerState) -> Ordering {
    b.hp.cmp(&a.hp).then_with(|| a.name.cmp(&b.name))
}

/// All racers ordered by descending HP, then name.
pub fn standings(state: &GameState) -> Vec<&PlayerState> {
    let mut racers: Vec<&PlayerState> = state.racers().collect();
    racers.sort_by(|a, b| display_order(a, b));
    racers
}

/// Classifies the outcome. Ordering only affects the listed order, never
/// the classification.
pub fn classify_outcome(state: &GameState) -> Outcome {
    let mut survivors: Vec<PlayerState> = standings(state)
        .into_iter()
        .filter(|p| p.is_alive())
        .cloned()
        .collect();

    if survivors.len() > 1 {
        Outcome::MultiWinner(survivors)
    } else {
        survivors.pop().map_or(Outcome::NoSurvivors, Outcome::Winner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with(players: &[(&str, i64)]) -> GameState {
        let mut state = GameState::default();
        state.players = players
            .iter()
            .map(|(name, hp)| PlayerState::new(name.to_lowercase(), *name, *hp))
            .collect();
        state.players.push(PlayerState::new("commentator", "Commentator", 5));
        state
    }

    #[test]
    fn test_single_survivor_is_winner() {
        let state = state_with(&[("Alice", 2), ("Bob", 0), ("Cara", 0)]);
        match classify_outcome(&state) {
            Outcome::Winner(p) => assert_eq!(p.name, "Alice"),
            other => panic!("Expected Winner, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_survivors() {
        let state = state_with(&[("Alice", 0), ("Bob", 0)]);
        assert_eq!(classify_outcome(&state), Outcome::NoSurvivors);
    }

    #[test]
    fn test_multiple_survivors_ordered_for_display() {
        let state = state_with(&[("Cara", 3), ("Bob", 3), ("Alice", 1)]);
        match classify_outcome(&state) {
            Outcome::MultiWinner(players) => {
                let names: Vec<&str> = players.iter().map(|p| p.name.as_str()).collect();
                assert_eq!(names, vec!["Bob", "Cara", "Alice"]);
            }
            other => panic!("Expected MultiWinner, got {other:?}"),
        }
    }

    #[test]
    fn test_commentator_never_counts() {
        let state = state_with(&[("Alice", 0)]);
        assert_eq!(classify_outcome(&state), Outcome::NoSurvivors);
        assert!(standings(&state).iter().all(|p| !p.is_commentator()));
    }
}
