use crate::engine::capability::CapabilitySet;
use crate::engine::day::{DerivedDayState, VoteTally};
use crate::engine::night::SeerInsight;
use crate::engine::roles::{NightAction, Role, Team};
use crate::engine::win::Outcome;
use crate::types::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    RegisterPlayer {
        player_token: String,
        display_name: String,
    },
    /// `target_id: null` retracts the current nomination
    Nominate {
        player_token: String,
        target_id: Option<PlayerId>,
    },
    Support {
        player_token: String,
        target_id: PlayerId,
        support: bool,
    },
    Ready {
        player_token: String,
        ready: bool,
    },
    Vote {
        player_token: String,
        target_id: PlayerId,
    },
    Skip {
        player_token: String,
        support: bool,
    },
    /// The slot is decided by the player's role
    NightAction {
        player_token: String,
        target_id: PlayerId,
    },
    RequestPrivateState {
        player_token: String,
    },
    // Host-only messages
    HostCreatePlayers {
        count: u32,
    },
    HostStartGame,
    /// Without candidates the ballot is every validly nominated player
    HostStartVote {
        #[serde(default)]
        candidates: Option<Vec<PlayerId>>,
    },
    HostResetDay,
    HostResolveNight,
    HostResolveDay,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        protocol: String,
        role: ConnectionRole,
        game: Game,
        server_now: String,
    },
    Phase {
        phase: GamePhase,
        round_no: u32,
        server_now: String,
    },
    PlayersCreated {
        players: Vec<PlayerToken>,
    },
    PlayerRegistered {
        player_id: PlayerId,
        display_name: String,
    },
    Roster {
        players: Vec<RosterEntry>,
    },
    DayState {
        state: DerivedDayState,
    },
    /// Sent to the submitting player only
    NightSubmitted {
        action: NightAction,
        target_id: PlayerId,
    },
    NightResolved {
        result: PublicNightResult,
    },
    DayResolved {
        result: DayResolution,
    },
    PrivateState {
        state: PrivateState,
    },
    /// Roles are revealed once the game is over
    GameOver {
        outcome: Outcome,
        assignments: Vec<PlayerAssignment>,
    },
    Ack,
    Error {
        code: String,
        msg: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerToken {
    pub id: PlayerId,
    pub token: String,
}

/// Public view of a seat; never carries the role
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RosterEntry {
    pub player_id: PlayerId,
    pub display_name: Option<String>,
    pub alive: bool,
}

/// What everybody learns at dawn
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublicNightResult {
    pub round: u32,
    pub casualties: Vec<PlayerId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DayResolution {
    pub round: u32,
    pub eliminated: Option<PlayerId>,
    pub tie: bool,
    pub skipped: bool,
    pub tally: Vec<VoteTally>,
}

/// Everything only this player may see
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrivateState {
    pub player_id: PlayerId,
    pub role: Role,
    pub role_name: String,
    /// What the role does, for the role card
    pub role_description: String,
    pub team: Team,
    pub alive: bool,
    /// Fellow aliens, for aliens; empty otherwise
    pub allies: Vec<PlayerId>,
    pub insights: Vec<SeerInsight>,
    pub capabilities: CapabilitySet,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_messages_use_snake_case_tags() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"t":"nominate","player_token":"ABCDE","target_id":null}"#)
                .unwrap();
        assert!(matches!(
            msg,
            ClientMessage::Nominate {
                target_id: None,
                ..
            }
        ));

        let msg: ClientMessage = serde_json::from_str(r#"{"t":"host_start_vote"}"#).unwrap();
        assert!(matches!(
            msg,
            ClientMessage::HostStartVote { candidates: None }
        ));
    }

    #[test]
    fn test_error_serialization() {
        let json = serde_json::to_value(ServerMessage::Error {
            code: "WRONG_PHASE".to_string(),
            msg: "nope".to_string(),
        })
        .unwrap();
        assert_eq!(json["t"], "error");
        assert_eq!(json["code"], "WRONG_PHASE");
    }

    #[test]
    fn test_roster_never_mentions_roles() {
        let json = serde_json::to_string(&ServerMessage::Roster {
            players: vec![RosterEntry {
                player_id: "p1".into(),
                display_name: Some("Dallas".into()),
                alive: true,
            }],
        })
        .unwrap();
        assert!(!json.contains("role"));
    }
}
