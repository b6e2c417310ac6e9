//! Night resolution: simultaneous elimination, protection and investigation.
//!
//! Night targets come from untrusted clients, so unknown or stale ids are
//! dropped instead of reported.

use super::day::majority_threshold;
use super::roles::{Role, Team};
use crate::types::{PlayerAssignment, PlayerId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NightError {
    #[error("night of round {0} is already resolved")]
    AlreadyResolved(u32),
}

/// Role submissions and results for one night. Single-writer: only the
/// coordinating party mutates it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NightRecord {
    pub round: u32,
    pub alien_target_id: Option<PlayerId>,
    pub doctor_target_id: Option<PlayerId>,
    pub seer_target_id: Option<PlayerId>,
    pub seer_result_team: Option<Team>,
    pub casualties: Vec<PlayerId>,
    pub saved: Vec<PlayerId>,
    pub resolved: bool,
}

impl NightRecord {
    pub fn new(round: u32) -> Self {
        Self {
            round,
            ..Default::default()
        }
    }

    /// Copy a resolution into the record. A night is finalized once.
    pub fn finalize(&mut self, resolution: &NightResolution) -> Result<(), NightError> {
        if self.resolved {
            return Err(NightError::AlreadyResolved(self.round));
        }
        self.casualties = resolution.casualties.clone();
        self.saved = resolution.saved.clone();
        self.seer_result_team = resolution.seer_insight.as_ref().map(|i| i.team);
        self.resolved = true;
        Ok(())
    }
}

/// What the seer learned. Only ever shown to the seer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeerInsight {
    pub round: u32,
    pub target_id: PlayerId,
    pub team: Team,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NightResolution {
    pub round: u32,
    pub casualties: Vec<PlayerId>,
    pub saved: Vec<PlayerId>,
    pub seer_insight: Option<SeerInsight>,
}

/// Resolve one night against the assignments as they stood at nightfall.
pub fn resolve_night(record: &NightRecord, assignments: &[PlayerAssignment]) -> NightResolution {
    let find = |id: &str| assignments.iter().find(|a| a.player_id == id);

    let mut casualties = Vec::new();
    let mut saved = Vec::new();

    if let Some(victim) = record
        .alien_target_id
        .as_deref()
        .and_then(find)
        .filter(|a| a.alive)
    {
        if record.doctor_target_id.as_deref() == Some(victim.player_id.as_str()) {
            saved.push(victim.player_id.clone());
        } else {
            casualties.push(victim.player_id.clone());
        }
    }

    let seer_insight = record
        .seer_target_id
        .as_deref()
        .and_then(find)
        .map(|target| SeerInsight {
            round: record.round,
            target_id: target.player_id.clone(),
            team: target.role.team(),
        });

    NightResolution {
        round: record.round,
        casualties,
        saved,
        seer_insight,
    }
}

/// Pick the alien faction's target from its members' ballots.
///
/// Only alive aliens vote, ballots for fellow aliens or for players who are
/// unknown or dead are discarded, and a target needs `floor(n/2)+1` of the
/// `n` alive aliens.
pub fn resolve_faction_vote(
    ballots: &BTreeMap<PlayerId, PlayerId>,
    assignments: &[PlayerAssignment],
) -> Option<PlayerId> {
    let alive_role = |id: &str| {
        assignments
            .iter()
            .find(|a| a.player_id == id && a.alive)
            .map(|a| a.role)
    };
    let faction_size = assignments
        .iter()
        .filter(|a| a.alive && a.role == Role::Alien)
        .count();
    if faction_size == 0 {
        return None;
    }

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for (voter, target) in ballots {
        if alive_role(voter) != Some(Role::Alien) {
            continue;
        }
        match alive_role(target) {
            Some(role) if role != Role::Alien => *counts.entry(target.as_str()).or_insert(0) += 1,
            _ => {}
        }
    }

    let threshold = majority_threshold(faction_size);
    counts
        .into_iter()
        .find(|(_, count)| *count >= threshold)
        .map(|(target, _)| target.to_string())
}
