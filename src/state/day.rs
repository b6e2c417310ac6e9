use super::player::participants_from;
use super::{AppState, GameError};
use crate::engine::apply_eliminations;
use crate::engine::day::{
    auto_start_candidates, derive, DayAction, DayEvent, DayStage, DerivedDayState,
};
use crate::engine::night::NightRecord;
use crate::protocol::{DayResolution, ServerMessage};
use crate::types::*;

/// Append-only day log. Ids come from a monotonic generator and timestamps
/// never go backwards, so append order and replay order agree.
pub struct DayLog {
    events: Vec<DayEvent>,
    ids: ulid::Generator,
}

impl Default for DayLog {
    fn default() -> Self {
        Self {
            events: Vec::new(),
            ids: ulid::Generator::new(),
        }
    }
}

impl DayLog {
    pub fn events(&self) -> &[DayEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn append(&mut self, round: u32, action: DayAction) -> &DayEvent {
        let now = chrono::Utc::now().timestamp_millis();
        let created_at = self
            .events
            .last()
            .map_or(now, |last| now.max(last.created_at));
        let id = self.ids.generate().unwrap_or_else(|_| ulid::Ulid::new());

        self.events.push(DayEvent {
            id: id.to_string(),
            created_at,
            round,
            action,
        });
        &self.events[self.events.len() - 1]
    }

    pub(crate) fn clear(&mut self) {
        self.events.clear();
    }
}

impl AppState {
    /// Append a player's day action, then apply the auto-start policy.
    ///
    /// Privileged transitions are refused here; the host issues them through
    /// [`AppState::host_start_vote`] and [`AppState::host_reset_day`].
    pub async fn append_day_event(
        &self,
        token: &str,
        action: DayAction,
    ) -> Result<DerivedDayState, GameError> {
        if action.is_privileged() {
            return Err(GameError::Privileged(if action == DayAction::Reset {
                "reset the day"
            } else {
                "start the vote"
            }));
        }

        let game = self.game.read().await;
        let game = game.as_ref().ok_or(GameError::NoGame)?;
        if game.phase != GamePhase::Day {
            return Err(GameError::WrongPhase {
                action: "act during the day",
                actual: game.phase,
            });
        }
        let round = game.round_no;

        let players = self.players.read().await;
        let player = players
            .iter()
            .find(|p| p.token == token)
            .ok_or(GameError::InvalidToken)?;
        if action.actor_id() != Some(&player.id) {
            return Err(GameError::ActorMismatch);
        }
        let assignments = self.assignments.read().await;
        match assignments.iter().find(|a| a.player_id == player.id) {
            None => return Err(GameError::NotParticipant(player.id.clone())),
            Some(seat) if !seat.alive => return Err(GameError::Eliminated(player.id.clone())),
            Some(_) => {}
        }
        let participants = participants_from(&players, &assignments);

        let mut log = self.day_log.write().await;
        log.append(round, action);
        let mut derived = derive(log.events(), round, &participants);

        // The server is the only issuer of StartVote, and it appends under the
        // same write lock, so at most one auto-start lands per round
        if let Some(candidates) = auto_start_candidates(&derived) {
            tracing::info!(
                "All {} players ready in round {}, starting vote on {:?}",
                derived.eligible_count(),
                round,
                candidates
            );
            log.append(round, DayAction::StartVote { candidates });
            derived = derive(log.events(), round, &participants);
        }
        drop(log);

        self.broadcast_to_all(ServerMessage::DayState {
            state: derived.clone(),
        });
        Ok(derived)
    }

    /// Fix the ballot by hand. Defaults to every validly nominated player.
    pub async fn host_start_vote(
        &self,
        candidates: Option<Vec<PlayerId>>,
    ) -> Result<DerivedDayState, GameError> {
        self.append_privileged(|derived| {
            if derived.stage == DayStage::Voting {
                return Err(GameError::VoteAlreadyStarted);
            }
            let mut ballot: Vec<PlayerId> = Vec::new();
            for candidate in candidates.unwrap_or_else(|| derived.valid_targets()) {
                if derived.eligible_ids.contains(&candidate) && !ballot.contains(&candidate) {
                    ballot.push(candidate);
                }
            }
            let candidates = ballot;
            if candidates.is_empty() {
                return Err(GameError::NoCandidates);
            }
            tracing::info!("Host started vote on {:?}", candidates);
            Ok(DayAction::StartVote { candidates })
        })
        .await
    }

    /// Drop everything accumulated this round
    pub async fn host_reset_day(&self) -> Result<DerivedDayState, GameError> {
        self.append_privileged(|derived| {
            tracing::info!("Host reset day {}", derived.round);
            Ok(DayAction::Reset)
        })
        .await
    }

    async fn append_privileged<F>(&self, build: F) -> Result<DerivedDayState, GameError>
    where
        F: FnOnce(&DerivedDayState) -> Result<DayAction, GameError>,
    {
        let game = self.game.read().await;
        let game = game.as_ref().ok_or(GameError::NoGame)?;
        if game.phase != GamePhase::Day {
            return Err(GameError::WrongPhase {
                action: "change the day",
                actual: game.phase,
            });
        }
        let round = game.round_no;
        let participants = {
            let players = self.players.read().await;
            let assignments = self.assignments.read().await;
            participants_from(&players, &assignments)
        };

        let mut log = self.day_log.write().await;
        let current = derive(log.events(), round, &participants);
        let action = build(&current)?;
        log.append(round, action);
        let derived = derive(log.events(), round, &participants);
        drop(log);

        self.broadcast_to_all(ServerMessage::DayState {
            state: derived.clone(),
        });
        Ok(derived)
    }

    /// Current day state derived from the log
    pub async fn derive_day_state(&self) -> Result<DerivedDayState, GameError> {
        let round = self
            .game
            .read()
            .await
            .as_ref()
            .map(|g| g.round_no)
            .ok_or(GameError::NoGame)?;
        let participants = self.participants().await;
        let log = self.day_log.read().await;
        Ok(derive(log.events(), round, &participants))
    }

    /// Close the day. Needs a majority, a tie or a skip majority; only a
    /// majority eliminates.
    pub async fn resolve_day(&self) -> Result<DayResolution, GameError> {
        let mut game_guard = self.game.write().await;
        let game = game_guard.as_mut().ok_or(GameError::NoGame)?;
        if game.phase != GamePhase::Day {
            return Err(GameError::WrongPhase {
                action: "resolve the day",
                actual: game.phase,
            });
        }
        let round = game.round_no;

        let players = self.players.read().await;
        let mut assignments = self.assignments.write().await;
        let derived = {
            let log = self.day_log.read().await;
            derive(
                log.events(),
                round,
                &participants_from(&players, &assignments),
            )
        };

        let resolution = DayResolution {
            round,
            eliminated: derived.majority_target_id.clone(),
            tie: derived.majority_target_id.is_none() && derived.tie,
            skipped: derived.majority_target_id.is_none() && derived.skip_has_majority,
            tally: derived.tally.clone(),
        };
        if resolution.eliminated.is_none() && !resolution.tie && !resolution.skipped {
            return Err(GameError::DayUndecided);
        }

        if let Some(target) = &resolution.eliminated {
            *assignments = apply_eliminations(
                &assignments,
                std::slice::from_ref(target),
                EliminationCause::Day,
                round,
            );
        }
        let next = Self::settle_outcome(game, &assignments);
        Self::apply_transition(game, next)?;
        if next == GamePhase::Night {
            let night = game.round_no;
            self.night_records
                .write()
                .await
                .insert(night, NightRecord::new(night));
        }
        drop(assignments);
        drop(players);
        drop(game_guard);

        tracing::info!(
            "Day {} resolved: eliminated={:?} tie={} skipped={}",
            round,
            resolution.eliminated,
            resolution.tie,
            resolution.skipped
        );
        self.broadcast_to_all(ServerMessage::DayResolved {
            result: resolution.clone(),
        });
        self.broadcast_roster().await;
        self.broadcast_phase_change().await;
        if next == GamePhase::Ended {
            self.broadcast_game_over().await;
        }
        Ok(resolution)
    }
}
