//! Single-device ("pass the phone") game as an explicit state machine.
//!
//! One device owns the state, so there is no log to replay: every action goes
//! through [`transition`], which returns a new [`LocalGame`] and shares its
//! rules (night resolution, majorities, win conditions) with the networked
//! engines.

use super::capability::capabilities;
use super::day::majority_threshold;
use super::night::{resolve_faction_vote, resolve_night, NightError, NightRecord, NightResolution};
use super::roles::NightAction;
use super::win::{Outcome, OutcomeLatch};
use super::{apply_eliminations, participants_from_assignments};
use crate::types::{EliminationCause, GamePhase, PlayerAssignment, PlayerId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("{action} is not allowed during the {phase:?} phase")]
    WrongPhase {
        action: &'static str,
        phase: LocalPhase,
    },

    #[error("player {0} is not in the game")]
    UnknownPlayer(PlayerId),

    #[error("player {0} has been eliminated")]
    Eliminated(PlayerId),

    #[error("player {player} cannot {action}")]
    NotPermitted {
        player: PlayerId,
        action: &'static str,
    },

    #[error("the game is over")]
    GameOver,

    #[error(transparent)]
    Night(#[from] NightError),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LocalPhase {
    Night,
    Day,
    Ended,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "target_id", rename_all = "snake_case")]
pub enum Ballot {
    Player(PlayerId),
    Skip,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DayResult {
    pub round: u32,
    pub eliminated: Option<PlayerId>,
    pub skipped: bool,
    pub tally: BTreeMap<PlayerId, usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocalGame {
    pub round: u32,
    pub phase: LocalPhase,
    pub assignments: Vec<PlayerAssignment>,
    pub night: NightRecord,
    pub alien_ballots: BTreeMap<PlayerId, PlayerId>,
    pub day_ballots: BTreeMap<PlayerId, Ballot>,
    pub latch: OutcomeLatch,
    pub last_night: Option<NightResolution>,
    pub last_day: Option<DayResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum LocalAction {
    AlienVote {
        voter_id: PlayerId,
        target_id: PlayerId,
    },
    Protect {
        doctor_id: PlayerId,
        target_id: PlayerId,
    },
    Investigate {
        seer_id: PlayerId,
        target_id: PlayerId,
    },
    ResolveNight,
    CastBallot {
        voter_id: PlayerId,
        ballot: Ballot,
    },
    ResolveDay,
}

impl LocalGame {
    /// A fresh game starts at the first night
    pub fn new(assignments: Vec<PlayerAssignment>) -> Self {
        Self {
            round: 1,
            phase: LocalPhase::Night,
            assignments,
            night: NightRecord::new(1),
            alien_ballots: BTreeMap::new(),
            day_ballots: BTreeMap::new(),
            latch: OutcomeLatch::default(),
            last_night: None,
            last_day: None,
        }
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.latch.outcome()
    }

    fn seat(&self, player_id: &str) -> Result<&PlayerAssignment, TransitionError> {
        let seat = self
            .assignments
            .iter()
            .find(|a| a.player_id == player_id)
            .ok_or_else(|| TransitionError::UnknownPlayer(player_id.to_string()))?;
        if !seat.alive {
            return Err(TransitionError::Eliminated(player_id.to_string()));
        }
        Ok(seat)
    }

    fn require_night_actor(
        &self,
        player_id: &str,
        action: NightAction,
        label: &'static str,
    ) -> Result<(), TransitionError> {
        let seat = self.seat(player_id)?;
        if capabilities(Some(seat), GamePhase::Night).night_action != Some(action) {
            return Err(TransitionError::NotPermitted {
                player: player_id.to_string(),
                action: label,
            });
        }
        Ok(())
    }

    fn require_phase(&self, phase: LocalPhase, action: &'static str) -> Result<(), TransitionError> {
        if self.phase != phase {
            return Err(TransitionError::WrongPhase {
                action,
                phase: self.phase,
            });
        }
        Ok(())
    }
}

/// Apply one action, producing the next state
pub fn transition(state: &LocalGame, action: LocalAction) -> Result<LocalGame, TransitionError> {
    if state.phase == LocalPhase::Ended {
        return Err(TransitionError::GameOver);
    }
    let mut next = state.clone();

    match action {
        LocalAction::AlienVote {
            voter_id,
            target_id,
        } => {
            next.require_phase(LocalPhase::Night, "abducting")?;
            next.require_night_actor(&voter_id, NightAction::Eliminate, "abduct")?;
            next.alien_ballots.insert(voter_id, target_id);
        }
        LocalAction::Protect {
            doctor_id,
            target_id,
        } => {
            next.require_phase(LocalPhase::Night, "protecting")?;
            next.require_night_actor(&doctor_id, NightAction::Protect, "protect")?;
            next.night.doctor_target_id = Some(target_id);
        }
        LocalAction::Investigate { seer_id, target_id } => {
            next.require_phase(LocalPhase::Night, "investigating")?;
            next.require_night_actor(&seer_id, NightAction::Investigate, "investigate")?;
            next.night.seer_target_id = Some(target_id);
        }
        LocalAction::ResolveNight => {
            next.require_phase(LocalPhase::Night, "resolving the night")?;
            next.night.alien_target_id = resolve_faction_vote(&next.alien_ballots, &next.assignments);
            let resolution = resolve_night(&next.night, &next.assignments);
            next.night.finalize(&resolution)?;
            next.assignments = apply_eliminations(
                &next.assignments,
                &resolution.casualties,
                EliminationCause::Night,
                next.round,
            );
            next.alien_ballots.clear();
            next.last_night = Some(resolution);
            next.phase = if next.latch.observe(&next.assignments).is_some() {
                LocalPhase::Ended
            } else {
                LocalPhase::Day
            };
        }
        LocalAction::CastBallot { voter_id, ballot } => {
            next.require_phase(LocalPhase::Day, "voting")?;
            next.seat(&voter_id)?;
            if let Ballot::Player(target_id) = &ballot {
                next.seat(target_id)?;
            }
            next.day_ballots.insert(voter_id, ballot);
        }
        LocalAction::ResolveDay => {
            next.require_phase(LocalPhase::Day, "resolving the day")?;
            let result = tally_day(&next);
            if let Some(eliminated) = &result.eliminated {
                next.assignments = apply_eliminations(
                    &next.assignments,
                    std::slice::from_ref(eliminated),
                    EliminationCause::Day,
                    next.round,
                );
            }
            next.day_ballots.clear();
            next.last_day = Some(result);
            if next.latch.observe(&next.assignments).is_some() {
                next.phase = LocalPhase::Ended;
            } else {
                next.round += 1;
                next.phase = LocalPhase::Night;
                next.night = NightRecord::new(next.round);
            }
        }
    }

    Ok(next)
}

fn tally_day(state: &LocalGame) -> DayResult {
    let eligible: Vec<PlayerId> = participants_from_assignments(&state.assignments)
        .into_iter()
        .filter(|p| p.alive)
        .map(|p| p.id)
        .collect();

    let mut tally: BTreeMap<PlayerId, usize> = BTreeMap::new();
    let mut skips = 0;
    for (voter, ballot) in &state.day_ballots {
        if !eligible.contains(voter) {
            continue;
        }
        match ballot {
            Ballot::Skip => skips += 1,
            Ballot::Player(target) if eligible.contains(target) => {
                *tally.entry(target.clone()).or_insert(0) += 1
            }
            Ballot::Player(_) => {}
        }
    }

    let skipped = skips * 2 > eligible.len();
    let threshold = majority_threshold(eligible.len());
    let eliminated = if skipped {
        None
    } else {
        tally
            .iter()
            .find(|(_, count)| **count >= threshold)
            .map(|(target, _)| target.clone())
    };

    DayResult {
        round: state.round,
        eliminated,
        skipped,
        tally,
    }
}
