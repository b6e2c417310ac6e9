//! Player message handlers
//!
//! Day actions are turned into log events with the actor taken from the
//! player's token.

use crate::engine::day::DayAction;
use crate::protocol::ServerMessage;
use crate::state::{AppState, GameError};
use crate::types::PlayerId;
use std::sync::Arc;

pub async fn handle_register_player(
    state: &Arc<AppState>,
    player_token: String,
    display_name: String,
) -> Option<ServerMessage> {
    let display_name = display_name.trim().to_string();
    if display_name.is_empty() {
        return Some(ServerMessage::Error {
            code: "INVALID_NAME".to_string(),
            msg: "Display name cannot be empty".to_string(),
        });
    }

    match state.register_player(&player_token, display_name).await {
        Ok(player) => {
            tracing::info!("Player {} registered", player.id);
            state.broadcast_roster().await;
            Some(ServerMessage::PlayerRegistered {
                player_id: player.id,
                display_name: player.display_name.unwrap_or_default(),
            })
        }
        Err(e) => Some(e.into()),
    }
}

/// Resolve the token, build the action for that player and append it
async fn submit_day_action<F>(
    state: &Arc<AppState>,
    player_token: &str,
    build: F,
) -> Option<ServerMessage>
where
    F: FnOnce(PlayerId) -> DayAction,
{
    let Some(player) = state.get_player_by_token(player_token).await else {
        return Some(GameError::InvalidToken.into());
    };
    match state.append_day_event(player_token, build(player.id)).await {
        Ok(derived) => Some(ServerMessage::DayState { state: derived }),
        Err(e) => {
            tracing::debug!("Rejected day action: {}", e);
            Some(e.into())
        }
    }
}

pub async fn handle_nominate(
    state: &Arc<AppState>,
    player_token: String,
    target_id: Option<PlayerId>,
) -> Option<ServerMessage> {
    submit_day_action(state, &player_token, |actor_id| DayAction::Nominate {
        actor_id,
        target_id,
    })
    .await
}

pub async fn handle_support(
    state: &Arc<AppState>,
    player_token: String,
    target_id: PlayerId,
    support: bool,
) -> Option<ServerMessage> {
    submit_day_action(state, &player_token, |actor_id| DayAction::Support {
        actor_id,
        target_id,
        support,
    })
    .await
}

pub async fn handle_ready(
    state: &Arc<AppState>,
    player_token: String,
    ready: bool,
) -> Option<ServerMessage> {
    submit_day_action(state, &player_token, |actor_id| DayAction::Ready {
        actor_id,
        ready,
    })
    .await
}

pub async fn handle_vote(
    state: &Arc<AppState>,
    player_token: String,
    target_id: PlayerId,
) -> Option<ServerMessage> {
    submit_day_action(state, &player_token, |actor_id| DayAction::Vote {
        actor_id,
        target_id,
    })
    .await
}

pub async fn handle_skip(
    state: &Arc<AppState>,
    player_token: String,
    support: bool,
) -> Option<ServerMessage> {
    submit_day_action(state, &player_token, |actor_id| DayAction::Skip {
        actor_id,
        support,
    })
    .await
}

pub async fn handle_night_action(
    state: &Arc<AppState>,
    player_token: String,
    target_id: PlayerId,
) -> Option<ServerMessage> {
    match state
        .submit_night_action(&player_token, target_id.clone())
        .await
    {
        Ok(action) => Some(ServerMessage::NightSubmitted { action, target_id }),
        Err(e) => Some(e.into()),
    }
}

pub async fn handle_request_private_state(
    state: &Arc<AppState>,
    player_token: String,
) -> Option<ServerMessage> {
    match state.private_state(&player_token).await {
        Ok(private) => Some(ServerMessage::PrivateState { state: private }),
        Err(e) => Some(e.into()),
    }
}
