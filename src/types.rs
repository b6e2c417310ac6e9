use crate::engine::deal::RoleSetup;
use crate::engine::roles::Role;
use crate::engine::win::Outcome;
use serde::{Deserialize, Serialize};

/// Opaque ID types for type safety
pub type GameId = String;
pub type PlayerId = String;
pub type EventId = String;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GamePhase {
    Lobby,
    Night,
    Day,
    Ended,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub version: u64,
    pub phase: GamePhase,
    /// 0 in the lobby, then one per Night+Day cycle
    pub round_no: u32,
    pub setup: Option<RoleSetup>,
    /// First declared outcome; never overwritten
    pub outcome: Option<Outcome>,
    pub created_at: String,
}

/// A player as the day engine sees them
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Participant {
    pub id: PlayerId,
    pub name: String,
    pub alive: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EliminationCause {
    Night,
    Day,
}

/// Dealt role of one player. The role never changes; the elimination fields
/// are written exactly once.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerAssignment {
    pub player_id: PlayerId,
    pub role: Role,
    /// Position in the deal
    pub order: usize,
    pub alive: bool,
    pub eliminated_by: Option<EliminationCause>,
    pub eliminated_in_round: Option<u32>,
}

impl PlayerAssignment {
    pub fn new(player_id: PlayerId, role: Role, order: usize) -> Self {
        Self {
            player_id,
            role,
            order,
            alive: true,
            eliminated_by: None,
            eliminated_in_round: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    /// Short join code handed out by the host
    pub token: String,
    pub display_name: Option<String>,
}

/// Who is on the other end of a connection
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionRole {
    Host,
    Player,
    Spectator,
}
