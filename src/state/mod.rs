mod day;
mod game;
mod night;
mod player;

pub use day::DayLog;

use crate::config::ServerConfig;
use crate::engine::deal::DealError;
use crate::engine::night::{NightError, NightRecord, NightResolution, SeerInsight};
use crate::protocol::ServerMessage;
use crate::types::*;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// Errors returned by room operations; `code()` is what clients see
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GameError {
    #[error("No active game")]
    NoGame,

    #[error("Invalid phase transition from {from:?} to {to:?}")]
    InvalidTransition { from: GamePhase, to: GamePhase },

    #[error("Cannot {action} during {actual:?}")]
    WrongPhase {
        action: &'static str,
        actual: GamePhase,
    },

    #[error("Invalid player token")]
    InvalidToken,

    #[error("Registration is closed")]
    RegistrationClosed,

    #[error("The table is limited to {max} players")]
    TableFull { max: usize },

    #[error("Player {0} is not seated in this game")]
    NotParticipant(PlayerId),

    #[error("Player {0} has been eliminated")]
    Eliminated(PlayerId),

    #[error("Player {0} has no night action")]
    NoNightAction(PlayerId),

    #[error("Actions can only be submitted for yourself")]
    ActorMismatch,

    #[error("Only the host can {0}")]
    Privileged(&'static str),

    #[error("Voting has already started")]
    VoteAlreadyStarted,

    #[error("No valid nominations to vote on")]
    NoCandidates,

    #[error("The day is undecided: no majority, tie or skip majority yet")]
    DayUndecided,

    #[error("Invalid role setup: {0}")]
    Setup(#[from] DealError),

    #[error(transparent)]
    Night(#[from] NightError),
}

impl GameError {
    pub fn code(&self) -> &'static str {
        match self {
            GameError::NoGame => "NO_GAME",
            GameError::InvalidTransition { .. } => "INVALID_TRANSITION",
            GameError::WrongPhase { .. } => "WRONG_PHASE",
            GameError::InvalidToken => "INVALID_TOKEN",
            GameError::RegistrationClosed => "REGISTRATION_CLOSED",
            GameError::TableFull { .. } => "TABLE_FULL",
            GameError::NotParticipant(_) => "NOT_PARTICIPANT",
            GameError::Eliminated(_) => "ELIMINATED",
            GameError::NoNightAction(_) => "NO_NIGHT_ACTION",
            GameError::ActorMismatch => "ACTOR_MISMATCH",
            GameError::Privileged(_) => "UNAUTHORIZED",
            GameError::VoteAlreadyStarted => "VOTE_ALREADY_STARTED",
            GameError::NoCandidates => "NO_CANDIDATES",
            GameError::DayUndecided => "DAY_UNDECIDED",
            GameError::Setup(_) => "INVALID_SETUP",
            GameError::Night(_) => "NIGHT_ALREADY_RESOLVED",
        }
    }
}

impl From<GameError> for ServerMessage {
    fn from(err: GameError) -> Self {
        ServerMessage::Error {
            code: err.code().to_string(),
            msg: err.to_string(),
        }
    }
}

/// Shared application state
///
/// Locks are always taken in field order (game, players, assignments,
/// day_log, night_records, faction_ballots, seer_insights, last_night).
#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    pub game: Arc<RwLock<Option<Game>>>,
    /// Roster in join-code creation order
    pub players: Arc<RwLock<Vec<Player>>>,
    pub assignments: Arc<RwLock<Vec<PlayerAssignment>>>,
    pub day_log: Arc<RwLock<DayLog>>,
    pub night_records: Arc<RwLock<HashMap<u32, NightRecord>>>,
    /// Alien ballots for the current night (voter -> target)
    pub faction_ballots: Arc<RwLock<BTreeMap<PlayerId, PlayerId>>>,
    /// Per-seer insights; never broadcast
    pub seer_insights: Arc<RwLock<HashMap<PlayerId, Vec<SeerInsight>>>>,
    pub last_night: Arc<RwLock<Option<NightResolution>>>,
    /// Broadcast channel for messages to every connection
    pub broadcast: broadcast::Sender<ServerMessage>,
    /// Broadcast channel for host-only messages
    pub host_broadcast: broadcast::Sender<ServerMessage>,
}

impl AppState {
    pub fn new() -> Self {
        Self::with_config(ServerConfig::default())
    }

    pub fn with_config(config: ServerConfig) -> Self {
        let (tx, _rx) = broadcast::channel(config.broadcast_capacity);
        let (host_tx, _host_rx) = broadcast::channel(config.broadcast_capacity);
        Self {
            config,
            game: Arc::new(RwLock::new(None)),
            players: Arc::new(RwLock::new(Vec::new())),
            assignments: Arc::new(RwLock::new(Vec::new())),
            day_log: Arc::new(RwLock::new(DayLog::default())),
            night_records: Arc::new(RwLock::new(HashMap::new())),
            faction_ballots: Arc::new(RwLock::new(BTreeMap::new())),
            seer_insights: Arc::new(RwLock::new(HashMap::new())),
            last_night: Arc::new(RwLock::new(None)),
            broadcast: tx,
            host_broadcast: host_tx,
        }
    }

    /// Send to every connected client; no receivers is fine
    pub fn broadcast_to_all(&self, msg: ServerMessage) {
        let _ = self.broadcast.send(msg);
    }

    /// Send to host connections only
    pub fn broadcast_to_host(&self, msg: ServerMessage) {
        let _ = self.host_broadcast.send(msg);
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
