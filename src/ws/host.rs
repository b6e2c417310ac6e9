//! Host-only command handlers
//!
//! All handlers in this module require the Host role.
//! Authorization is checked in the main dispatch layer before calling these.

use crate::protocol::{PlayerToken, ServerMessage};
use crate::state::AppState;
use crate::types::PlayerId;
use std::sync::Arc;

pub async fn handle_create_players(state: &Arc<AppState>, count: u32) -> Option<ServerMessage> {
    tracing::info!("Host creating {} players", count);
    let players: Vec<PlayerToken> = match state.create_players(count as usize).await {
        Ok(created) => created
            .into_iter()
            .map(|player| PlayerToken {
                id: player.id,
                token: player.token,
            })
            .collect(),
        Err(e) => {
            tracing::warn!("Refusing to create players: {}", e);
            return Some(e.into());
        }
    };
    // Other host screens need the join codes too
    state.broadcast_to_host(ServerMessage::PlayersCreated {
        players: players.clone(),
    });
    state.broadcast_roster().await;
    Some(ServerMessage::PlayersCreated { players })
}

pub async fn handle_start_game(state: &Arc<AppState>) -> Option<ServerMessage> {
    tracing::info!("Host starting game");
    match state.start_game().await {
        Ok(game) => Some(ServerMessage::Phase {
            phase: game.phase,
            round_no: game.round_no,
            server_now: chrono::Utc::now().to_rfc3339(),
        }),
        Err(e) => Some(e.into()),
    }
}

pub async fn handle_start_vote(
    state: &Arc<AppState>,
    candidates: Option<Vec<PlayerId>>,
) -> Option<ServerMessage> {
    match state.host_start_vote(candidates).await {
        Ok(derived) => Some(ServerMessage::DayState { state: derived }),
        Err(e) => Some(e.into()),
    }
}

pub async fn handle_reset_day(state: &Arc<AppState>) -> Option<ServerMessage> {
    match state.host_reset_day().await {
        Ok(derived) => Some(ServerMessage::DayState { state: derived }),
        Err(e) => Some(e.into()),
    }
}

pub async fn handle_resolve_night(state: &Arc<AppState>) -> Option<ServerMessage> {
    match state.resolve_night().await {
        Ok(_) => state
            .last_public_night()
            .await
            .map(|result| ServerMessage::NightResolved { result }),
        Err(e) => Some(e.into()),
    }
}

pub async fn handle_resolve_day(state: &Arc<AppState>) -> Option<ServerMessage> {
    match state.resolve_day().await {
        Ok(result) => Some(ServerMessage::DayResolved { result }),
        Err(e) => Some(e.into()),
    }
}
