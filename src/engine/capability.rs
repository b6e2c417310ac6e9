//! What a given view of the game is allowed to do.
//!
//! Computed from (assignment, phase) on demand; the canonical player record
//! carries no mutable capability flags.

use super::roles::{NightAction, Role};
use crate::types::{GamePhase, PlayerAssignment};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ChatChannel {
    Public,
    /// Faction channel for the aliens
    Aliens,
    /// Eliminated players only
    Graveyard,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CapabilitySet {
    /// Nominate, support, ready, vote and skip
    pub day_actions: bool,
    pub night_action: Option<NightAction>,
    pub readable: Vec<ChatChannel>,
    pub writable: Vec<ChatChannel>,
}

impl CapabilitySet {
    pub fn can_read(&self, channel: ChatChannel) -> bool {
        self.readable.contains(&channel)
    }

    pub fn can_speak(&self, channel: ChatChannel) -> bool {
        self.writable.contains(&channel)
    }
}

/// Capabilities of a participant (or a spectator, when `assignment` is
/// `None`) in `phase`.
pub fn capabilities(assignment: Option<&PlayerAssignment>, phase: GamePhase) -> CapabilitySet {
    use ChatChannel::*;

    let Some(assignment) = assignment else {
        return CapabilitySet {
            readable: vec![Public],
            ..Default::default()
        };
    };
    let is_alien = assignment.role == Role::Alien;

    match phase {
        GamePhase::Lobby => CapabilitySet {
            readable: vec![Public],
            writable: vec![Public],
            ..Default::default()
        },
        GamePhase::Ended => CapabilitySet {
            readable: vec![Public, Aliens, Graveyard],
            writable: vec![Public],
            ..Default::default()
        },
        _ if !assignment.alive => CapabilitySet {
            readable: vec![Public, Graveyard],
            writable: vec![Graveyard],
            ..Default::default()
        },
        GamePhase::Day => {
            let mut readable = vec![Public];
            if is_alien {
                readable.push(Aliens);
            }
            CapabilitySet {
                day_actions: true,
                night_action: None,
                readable,
                writable: vec![Public],
            }
        }
        GamePhase::Night => {
            let (readable, writable) = if is_alien {
                (vec![Public, Aliens], vec![Aliens])
            } else {
                (vec![Public], vec![])
            };
            CapabilitySet {
                day_actions: false,
                night_action: assignment.role.night_action(),
                readable,
                writable,
            }
        }
    }
}
