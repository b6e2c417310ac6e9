//! Win-condition evaluation over the alive subset of the assignments.

use super::roles::Team;
use crate::types::PlayerAssignment;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WinReason {
    FactionEliminated,
    ParityReached,
}

impl WinReason {
    pub fn describe(self) -> &'static str {
        match self {
            WinReason::FactionEliminated => "faction eliminated",
            WinReason::ParityReached => "parity reached",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Outcome {
    pub winner: Team,
    pub reason: WinReason,
}

/// Check the win conditions, in order:
/// no alien alive → village wins; aliens ≥ everyone else → aliens win.
pub fn evaluate(assignments: &[PlayerAssignment]) -> Option<Outcome> {
    let (aliens, others) = assignments
        .iter()
        .filter(|a| a.alive)
        .fold((0usize, 0usize), |(aliens, others), a| {
            if a.role.team().is_adversarial() {
                (aliens + 1, others)
            } else {
                (aliens, others + 1)
            }
        });

    if aliens == 0 {
        Some(Outcome {
            winner: Team::Village,
            reason: WinReason::FactionEliminated,
        })
    } else if aliens >= others {
        Some(Outcome {
            winner: Team::Aliens,
            reason: WinReason::ParityReached,
        })
    } else {
        None
    }
}

/// Holds the first declared outcome; later evaluations never replace it.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutcomeLatch {
    outcome: Option<Outcome>,
}

impl OutcomeLatch {
    pub fn from_outcome(outcome: Option<Outcome>) -> Self {
        Self { outcome }
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    /// Evaluate after an elimination unless a winner is already declared.
    pub fn observe(&mut self, assignments: &[PlayerAssignment]) -> Option<Outcome> {
        if self.outcome.is_none() {
            self.outcome = evaluate(assignments);
        }
        self.outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::roles::Role;

    fn table(aliens: usize, others: usize) -> Vec<PlayerAssignment> {
        let mut out = Vec::new();
        for i in 0..aliens {
            out.push(PlayerAssignment::new(format!("a{}", i), Role::Alien, out.len()));
        }
        for i in 0..others {
            out.push(PlayerAssignment::new(format!("v{}", i), Role::Villager, out.len()));
        }
        out
    }

    #[test]
    fn test_parity_hands_aliens_the_win() {
        assert_eq!(
            evaluate(&table(2, 2)),
            Some(Outcome {
                winner: Team::Aliens,
                reason: WinReason::ParityReached,
            })
        );
        assert_eq!(evaluate(&table(2, 3)), None);
    }

    #[test]
    fn test_no_aliens_left_hands_village_the_win() {
        let mut assignments = table(1, 3);
        assignments[0].alive = false;
        assert_eq!(
            evaluate(&assignments),
            Some(Outcome {
                winner: Team::Village,
                reason: WinReason::FactionEliminated,
            })
        );
    }

    #[test]
    fn test_dead_players_do_not_count() {
        let mut assignments = table(1, 3);
        assert_eq!(evaluate(&assignments), None);
        assignments[1].alive = false;
        assignments[2].alive = false;
        assert_eq!(evaluate(&assignments).map(|o| o.winner), Some(Team::Aliens));
    }

    #[test]
    fn test_latch_keeps_first_outcome() {
        let mut latch = OutcomeLatch::default();
        let mut assignments = table(2, 3);
        assert_eq!(latch.observe(&assignments), None);

        assignments[2].alive = false;
        let first = latch.observe(&assignments).expect("parity");
        assert_eq!(first.winner, Team::Aliens);

        // Membership changes after a win have no meaning
        assignments[0].alive = false;
        assignments[1].alive = false;
        assert_eq!(evaluate(&assignments).map(|o| o.winner), Some(Team::Village));
        assert_eq!(latch.observe(&assignments), Some(first));
    }

    #[test]
    fn test_reason_text() {
        assert_eq!(WinReason::FactionEliminated.describe(), "faction eliminated");
        assert_eq!(WinReason::ParityReached.describe(), "parity reached");
    }
}
