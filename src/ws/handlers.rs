//! WebSocket message dispatch
//!
//! This module provides the main entry point for handling client messages.
//! Authorization is checked here, then dispatched to role-specific handler modules.

use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use crate::types::ConnectionRole;
use std::sync::Arc;

use super::{host, player};

/// Macro to check host authorization and return early if unauthorized
macro_rules! check_host {
    ($role:expr, $action:expr) => {
        if *$role != ConnectionRole::Host {
            tracing::warn!("Rejected host command from {:?}: {}", $role, $action);
            return Some(ServerMessage::Error {
                code: "UNAUTHORIZED".to_string(),
                msg: format!("Only host can {}", $action),
            });
        }
    };
}

/// Handle client messages and return optional response
pub async fn handle_message(
    msg: ClientMessage,
    role: &ConnectionRole,
    state: &Arc<AppState>,
) -> Option<ServerMessage> {
    match msg {
        // Player messages
        ClientMessage::RegisterPlayer {
            player_token,
            display_name,
        } => player::handle_register_player(state, player_token, display_name).await,

        ClientMessage::Nominate {
            player_token,
            target_id,
        } => player::handle_nominate(state, player_token, target_id).await,

        ClientMessage::Support {
            player_token,
            target_id,
            support,
        } => player::handle_support(state, player_token, target_id, support).await,

        ClientMessage::Ready {
            player_token,
            ready,
        } => player::handle_ready(state, player_token, ready).await,

        ClientMessage::Vote {
            player_token,
            target_id,
        } => player::handle_vote(state, player_token, target_id).await,

        ClientMessage::Skip {
            player_token,
            support,
        } => player::handle_skip(state, player_token, support).await,

        ClientMessage::NightAction {
            player_token,
            target_id,
        } => player::handle_night_action(state, player_token, target_id).await,

        ClientMessage::RequestPrivateState { player_token } => {
            player::handle_request_private_state(state, player_token).await
        }

        // Host-only commands (authorization checked before dispatch)
        ClientMessage::HostCreatePlayers { count } => {
            check_host!(role, "create players");
            host::handle_create_players(state, count).await
        }

        ClientMessage::HostStartGame => {
            check_host!(role, "start the game");
            host::handle_start_game(state).await
        }

        ClientMessage::HostStartVote { candidates } => {
            check_host!(role, "start the vote");
            host::handle_start_vote(state, candidates).await
        }

        ClientMessage::HostResetDay => {
            check_host!(role, "reset the day");
            host::handle_reset_day(state).await
        }

        ClientMessage::HostResolveNight => {
            check_host!(role, "resolve the night");
            host::handle_resolve_night(state).await
        }

        ClientMessage::HostResolveDay => {
            check_host!(role, "resolve the day");
            host::handle_resolve_day(state).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GamePhase;

    #[tokio::test]
    async fn test_unauthorized_host_command() {
        let state = Arc::new(AppState::new());

        for role in [ConnectionRole::Player, ConnectionRole::Spectator] {
            let result =
                handle_message(ClientMessage::HostCreatePlayers { count: 3 }, &role, &state)
                    .await;
            match result {
                Some(ServerMessage::Error { code, msg }) => {
                    assert_eq!(code, "UNAUTHORIZED");
                    assert_eq!(msg, "Only host can create players");
                }
                other => panic!("Expected Error message, got {:?}", other),
            }
        }
        assert!(state.players.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_host_create_players() {
        let state = Arc::new(AppState::new());
        let role = ConnectionRole::Host;

        let result =
            handle_message(ClientMessage::HostCreatePlayers { count: 2 }, &role, &state).await;

        if let Some(ServerMessage::PlayersCreated { players }) = result {
            assert_eq!(players.len(), 2);
        } else {
            panic!("Expected PlayersCreated message");
        }
    }

    #[tokio::test]
    async fn test_create_players_is_capped() {
        let state = Arc::new(AppState::new());
        let role = ConnectionRole::Host;

        let result = handle_message(
            ClientMessage::HostCreatePlayers { count: u32::MAX },
            &role,
            &state,
        )
        .await;
        match result {
            Some(ServerMessage::Error { code, .. }) => assert_eq!(code, "TABLE_FULL"),
            other => panic!("Expected Error message, got {:?}", other),
        }
        assert!(state.players.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_start_game_requires_enough_players() {
        let state = Arc::new(AppState::new());
        state.create_game().await;
        let role = ConnectionRole::Host;

        handle_message(ClientMessage::HostCreatePlayers { count: 2 }, &role, &state).await;
        let result = handle_message(ClientMessage::HostStartGame, &role, &state).await;
        match result {
            Some(ServerMessage::Error { code, .. }) => assert_eq!(code, "INVALID_SETUP"),
            other => panic!("Expected Error message, got {:?}", other),
        }

        let created =
            handle_message(ClientMessage::HostCreatePlayers { count: 3 }, &role, &state).await;
        let Some(ServerMessage::PlayersCreated { players }) = created else {
            panic!("Expected PlayersCreated message");
        };
        for (i, player) in players.iter().enumerate() {
            let registered = handle_message(
                ClientMessage::RegisterPlayer {
                    player_token: player.token.clone(),
                    display_name: format!("Crew {}", i),
                },
                &ConnectionRole::Player,
                &state,
            )
            .await;
            assert!(matches!(
                registered,
                Some(ServerMessage::PlayerRegistered { .. })
            ));
        }
        let result = handle_message(ClientMessage::HostStartGame, &role, &state).await;
        match result {
            Some(ServerMessage::Phase { phase, round_no, .. }) => {
                assert_eq!(phase, GamePhase::Night);
                assert_eq!(round_no, 1);
            }
            other => panic!("Expected Phase message, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_day_actions_outside_day_are_rejected() {
        let state = Arc::new(AppState::new());
        state.create_game().await;
        let created = host::handle_create_players(&state, 1).await;
        let Some(ServerMessage::PlayersCreated { players }) = created else {
            panic!("Expected PlayersCreated message");
        };

        let result = handle_message(
            ClientMessage::Ready {
                player_token: players[0].token.clone(),
                ready: true,
            },
            &ConnectionRole::Player,
            &state,
        )
        .await;
        match result {
            Some(ServerMessage::Error { code, .. }) => assert_eq!(code, "WRONG_PHASE"),
            other => panic!("Expected Error message, got {:?}", other),
        }
    }
}
