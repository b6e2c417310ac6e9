//! Pure game rules: no I/O, no locks, no clocks.
//!
//! The room server (and the single-device [`local`] machine) call into these
//! with snapshots of their state and apply the results themselves.

pub mod capability;
pub mod day;
pub mod deal;
pub mod local;
pub mod night;
pub mod roles;
pub mod win;

use crate::types::{EliminationCause, Participant, PlayerAssignment, PlayerId};

/// Mark `ids` as eliminated. Players already dead keep their original
/// elimination record.
pub fn apply_eliminations(
    assignments: &[PlayerAssignment],
    ids: &[PlayerId],
    cause: EliminationCause,
    round: u32,
) -> Vec<PlayerAssignment> {
    assignments
        .iter()
        .map(|a| {
            if a.alive && ids.contains(&a.player_id) {
                PlayerAssignment {
                    alive: false,
                    eliminated_by: Some(cause),
                    eliminated_in_round: Some(round),
                    ..a.clone()
                }
            } else {
                a.clone()
            }
        })
        .collect()
}

/// Engine view of the table, in deal order
pub fn participants_from_assignments(assignments: &[PlayerAssignment]) -> Vec<Participant> {
    let mut ordered: Vec<&PlayerAssignment> = assignments.iter().collect();
    ordered.sort_by_key(|a| a.order);
    ordered
        .into_iter()
        .map(|a| Participant {
            id: a.player_id.clone(),
            name: a.player_id.clone(),
            alive: a.alive,
        })
        .collect()
}
