//! Server configuration loaded from the environment.

use crate::engine::deal::RoleSetup;
use std::net::SocketAddr;

pub const DEFAULT_BIND: &str = "0.0.0.0:6574";
pub const DEFAULT_BROADCAST_CAPACITY: usize = 100;
pub const DEFAULT_MAX_PLAYERS: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// Overrides for the default role setup; `None` keeps the per-table default
    pub aliens: Option<usize>,
    pub doctors: Option<usize>,
    pub seers: Option<usize>,
    pub broadcast_capacity: usize,
    /// Upper bound on join tokens per game
    pub max_players: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 6574)),
            aliens: None,
            doctors: None,
            seers: None,
            broadcast_capacity: DEFAULT_BROADCAST_CAPACITY,
            max_players: DEFAULT_MAX_PLAYERS,
        }
    }
}

/// Read a trimmed, non-empty variable
fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

/// Parse a variable, warning and falling back to `None` on garbage
fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = env_value(key)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring invalid {}={:?}, using default", key, raw);
            None
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let broadcast_capacity = match env_parsed::<usize>("NIGHTFALL_BROADCAST_CAPACITY") {
            Some(0) => {
                tracing::warn!("NIGHTFALL_BROADCAST_CAPACITY must be positive, using default");
                defaults.broadcast_capacity
            }
            Some(capacity) => capacity,
            None => defaults.broadcast_capacity,
        };

        let max_players = match env_parsed::<usize>("NIGHTFALL_MAX_PLAYERS") {
            Some(0) => {
                tracing::warn!("NIGHTFALL_MAX_PLAYERS must be positive, using default");
                defaults.max_players
            }
            Some(max) => max,
            None => defaults.max_players,
        };

        Self {
            bind: env_parsed("NIGHTFALL_BIND").unwrap_or(defaults.bind),
            aliens: env_parsed("NIGHTFALL_ALIENS"),
            doctors: env_parsed("NIGHTFALL_DOCTORS"),
            seers: env_parsed("NIGHTFALL_SEERS"),
            broadcast_capacity,
            max_players,
        }
    }

    /// Role setup for a table of `players`, with any configured overrides
    pub fn role_setup(&self, players: usize) -> RoleSetup {
        let base = RoleSetup::for_players(players);
        RoleSetup {
            aliens: self.aliens.unwrap_or(base.aliens),
            doctors: self.doctors.unwrap_or(base.doctors),
            seers: self.seers.unwrap_or(base.seers),
        }
    }
}
