use super::{AppState, GameError};
use crate::engine::night::{resolve_faction_vote, resolve_night, NightRecord, NightResolution};
use crate::engine::roles::{NightAction, Role};
use crate::engine::apply_eliminations;
use crate::protocol::{PublicNightResult, ServerMessage};
use crate::types::*;

impl AppState {
    /// Record a night target; the actor's role decides the slot. Last write wins.
    pub async fn submit_night_action(
        &self,
        token: &str,
        target_id: PlayerId,
    ) -> Result<NightAction, GameError> {
        let game = self.game.read().await;
        let game = game.as_ref().ok_or(GameError::NoGame)?;
        if game.phase != GamePhase::Night {
            return Err(GameError::WrongPhase {
                action: "act at night",
                actual: game.phase,
            });
        }
        let round = game.round_no;

        let players = self.players.read().await;
        let player = players
            .iter()
            .find(|p| p.token == token)
            .ok_or(GameError::InvalidToken)?;
        let assignments = self.assignments.read().await;
        let seat = assignments
            .iter()
            .find(|a| a.player_id == player.id)
            .ok_or_else(|| GameError::NotParticipant(player.id.clone()))?;
        if !seat.alive {
            return Err(GameError::Eliminated(player.id.clone()));
        }
        let action = seat
            .role
            .night_action()
            .ok_or_else(|| GameError::NoNightAction(player.id.clone()))?;

        match action {
            NightAction::Eliminate => {
                self.faction_ballots
                    .write()
                    .await
                    .insert(player.id.clone(), target_id);
            }
            NightAction::Protect | NightAction::Investigate => {
                let mut records = self.night_records.write().await;
                let record = records
                    .entry(round)
                    .or_insert_with(|| NightRecord::new(round));
                if action == NightAction::Protect {
                    record.doctor_target_id = Some(target_id);
                } else {
                    record.seer_target_id = Some(target_id);
                }
            }
        }

        tracing::debug!("{:?} submitted for round {} by {}", action, round, player.id);
        Ok(action)
    }

    /// Resolve the current night and move to Day (or Ended)
    pub async fn resolve_night(&self) -> Result<NightResolution, GameError> {
        let mut game_guard = self.game.write().await;
        let game = game_guard.as_mut().ok_or(GameError::NoGame)?;
        if game.phase != GamePhase::Night {
            return Err(GameError::WrongPhase {
                action: "resolve the night",
                actual: game.phase,
            });
        }
        let round = game.round_no;

        let mut assignments = self.assignments.write().await;
        let resolution = {
            let mut records = self.night_records.write().await;
            let mut ballots = self.faction_ballots.write().await;
            let record = records
                .entry(round)
                .or_insert_with(|| NightRecord::new(round));
            record.alien_target_id = resolve_faction_vote(&ballots, &assignments);
            let resolution = resolve_night(record, &assignments);
            record.finalize(&resolution)?;
            ballots.clear();
            resolution
        };

        if let Some(insight) = &resolution.seer_insight {
            let mut insights = self.seer_insights.write().await;
            for seer in assignments
                .iter()
                .filter(|a| a.alive && a.role == Role::Seer)
            {
                insights
                    .entry(seer.player_id.clone())
                    .or_default()
                    .push(insight.clone());
            }
        }

        *assignments = apply_eliminations(
            &assignments,
            &resolution.casualties,
            EliminationCause::Night,
            round,
        );
        let next = Self::settle_outcome(game, &assignments);
        Self::apply_transition(game, next)?;
        *self.last_night.write().await = Some(resolution.clone());
        drop(assignments);
        drop(game_guard);

        tracing::info!(
            "Night {} resolved: {} casualties, {} saved",
            round,
            resolution.casualties.len(),
            resolution.saved.len()
        );
        self.broadcast_to_all(ServerMessage::NightResolved {
            result: PublicNightResult {
                round,
                casualties: resolution.casualties.clone(),
            },
        });
        self.broadcast_roster().await;
        self.broadcast_phase_change().await;
        if next == GamePhase::Ended {
            self.broadcast_game_over().await;
        }
        Ok(resolution)
    }

    /// Casualties of the most recent night, safe to show everyone
    pub async fn last_public_night(&self) -> Option<PublicNightResult> {
        self.last_night
            .read()
            .await
            .as_ref()
            .map(|night| PublicNightResult {
                round: night.round,
                casualties: night.casualties.clone(),
            })
    }
}
