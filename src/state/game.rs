use super::{AppState, GameError};
use crate::engine::deal::{deal_roles, RoleSetup};
use crate::engine::night::NightRecord;
use crate::engine::win::OutcomeLatch;
use crate::protocol::ServerMessage;
use crate::types::*;

impl AppState {
    /// Initialize a new game
    pub async fn create_game(&self) -> Game {
        let game = Game {
            id: ulid::Ulid::new().to_string(),
            version: 1,
            phase: GamePhase::Lobby,
            round_no: 0,
            setup: None,
            outcome: None,
            created_at: chrono::Utc::now().to_rfc3339(),
        };

        *self.game.write().await = Some(game.clone());
        tracing::info!("Created game {}", game.id);
        game
    }

    /// Get current game
    pub async fn get_game(&self) -> Option<Game> {
        self.game.read().await.clone()
    }

    /// Check if a phase transition is valid
    pub fn is_valid_phase_transition(from: GamePhase, to: GamePhase) -> bool {
        use GamePhase::*;

        matches!(
            (from, to),
            (Lobby, Night) | (Night, Day) | (Night, Ended) | (Day, Night) | (Day, Ended)
        )
    }

    /// Move `game` to `to`, bumping the version. Day to Night opens the next round.
    pub(crate) fn apply_transition(game: &mut Game, to: GamePhase) -> Result<(), GameError> {
        if !Self::is_valid_phase_transition(game.phase, to) {
            return Err(GameError::InvalidTransition {
                from: game.phase,
                to,
            });
        }
        match (game.phase, to) {
            (GamePhase::Lobby, GamePhase::Night) => game.round_no = 1,
            (GamePhase::Day, GamePhase::Night) => game.round_no += 1,
            _ => {}
        }
        game.phase = to;
        game.version += 1;
        Ok(())
    }

    /// Latch the outcome if the assignments decide the game
    pub(crate) fn settle_outcome(game: &mut Game, assignments: &[PlayerAssignment]) -> GamePhase {
        let mut latch = OutcomeLatch::from_outcome(game.outcome);
        game.outcome = latch.observe(assignments);
        if game.outcome.is_some() {
            GamePhase::Ended
        } else {
            match game.phase {
                GamePhase::Night => GamePhase::Day,
                _ => GamePhase::Night,
            }
        }
    }

    /// Deal roles to the registered players and start the first night
    pub async fn start_game(&self) -> Result<Game, GameError> {
        {
            let game = self.game.read().await;
            let game = game.as_ref().ok_or(GameError::NoGame)?;
            if game.phase != GamePhase::Lobby {
                return Err(GameError::InvalidTransition {
                    from: game.phase,
                    to: GamePhase::Night,
                });
            }
        }

        // Tokens nobody claimed stay out of the deal
        let player_ids: Vec<PlayerId> = self
            .players
            .read()
            .await
            .iter()
            .filter(|p| p.display_name.is_some())
            .map(|p| p.id.clone())
            .collect();
        let setup = self.config.role_setup(player_ids.len());
        let pool = setup.build_pool(player_ids.len()).inspect_err(|e| {
            tracing::warn!("Refusing to start game: {}", e);
        })?;
        let assignments = deal_roles(&player_ids, &pool, &mut rand::rng())?;

        self.begin_with_assignments(assignments, Some(setup)).await
    }

    /// Seat the dealt table and open round 1
    pub(crate) async fn begin_with_assignments(
        &self,
        assignments: Vec<PlayerAssignment>,
        setup: Option<RoleSetup>,
    ) -> Result<Game, GameError> {
        let mut game_guard = self.game.write().await;
        let game = game_guard.as_mut().ok_or(GameError::NoGame)?;
        Self::apply_transition(game, GamePhase::Night)?;
        game.setup = setup;
        game.outcome = None;

        let seats = assignments.len();
        *self.assignments.write().await = assignments;
        self.day_log.write().await.clear();
        {
            let mut records = self.night_records.write().await;
            records.clear();
            records.insert(1, NightRecord::new(1));
        }
        self.faction_ballots.write().await.clear();
        self.seer_insights.write().await.clear();
        *self.last_night.write().await = None;

        let snapshot = game.clone();
        drop(game_guard);

        tracing::info!("Game {} started with {} players", snapshot.id, seats);
        self.broadcast_phase_change().await;
        self.broadcast_roster().await;
        Ok(snapshot)
    }

    /// Broadcast current phase to all clients
    pub(crate) async fn broadcast_phase_change(&self) {
        if let Some(game) = self.get_game().await {
            self.broadcast_to_all(ServerMessage::Phase {
                phase: game.phase,
                round_no: game.round_no,
                server_now: chrono::Utc::now().to_rfc3339(),
            });
        }
    }

    /// Reveal the table once a winner is latched
    pub(crate) async fn broadcast_game_over(&self) {
        let Some(outcome) = self.get_game().await.and_then(|g| g.outcome) else {
            return;
        };
        tracing::info!(
            "Game over: {:?} win, {}",
            outcome.winner,
            outcome.reason.describe()
        );
        let assignments = self.assignments.read().await.clone();
        self.broadcast_to_all(ServerMessage::GameOver {
            outcome,
            assignments,
        });
    }
}
