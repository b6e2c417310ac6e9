use nightfall::engine::day::DayStage;
use nightfall::engine::roles::{Role, Team};
use nightfall::engine::win::WinReason;
use nightfall::protocol::{ClientMessage, PlayerToken, ServerMessage};
use nightfall::state::AppState;
use nightfall::types::{ConnectionRole, GamePhase, PlayerAssignment};
use nightfall::ws::handlers::handle_message;
use std::sync::Arc;

const HOST: ConnectionRole = ConnectionRole::Host;
const PLAYER: ConnectionRole = ConnectionRole::Player;

async fn send(state: &Arc<AppState>, role: ConnectionRole, msg: ClientMessage) -> ServerMessage {
    handle_message(msg, &role, state)
        .await
        .expect("every message gets a response")
}

/// Lobby with `n` registered players, then start the game
async fn started_game(n: u32) -> (Arc<AppState>, Vec<PlayerToken>) {
    let state = Arc::new(AppState::new());
    state.create_game().await;

    let tokens = match send(&state, HOST, ClientMessage::HostCreatePlayers { count: n }).await {
        ServerMessage::PlayersCreated { players } => players,
        other => panic!("Expected PlayersCreated message, got {:?}", other),
    };
    for (i, player) in tokens.iter().enumerate() {
        match send(
            &state,
            PLAYER,
            ClientMessage::RegisterPlayer {
                player_token: player.token.clone(),
                display_name: format!("Crew {}", i),
            },
        )
        .await
        {
            ServerMessage::PlayerRegistered {
                player_id,
                display_name,
            } => {
                assert_eq!(player_id, player.id);
                assert_eq!(display_name, format!("Crew {}", i));
            }
            other => panic!("Expected PlayerRegistered message, got {:?}", other),
        }
    }

    match send(&state, HOST, ClientMessage::HostStartGame).await {
        ServerMessage::Phase { phase, round_no, .. } => {
            assert_eq!(phase, GamePhase::Night);
            assert_eq!(round_no, 1);
        }
        other => panic!("Expected Phase message, got {:?}", other),
    }
    (state, tokens)
}

/// Tokens grouped by dealt role, in deal order
async fn by_role(state: &AppState, tokens: &[PlayerToken], role: Role) -> Vec<PlayerToken> {
    let assignments: Vec<PlayerAssignment> = state.assignments.read().await.clone();
    assignments
        .iter()
        .filter(|a| a.role == role)
        .filter_map(|a| tokens.iter().find(|t| t.id == a.player_id).cloned())
        .collect()
}

fn expect_error(msg: ServerMessage, expected: &str) {
    match msg {
        ServerMessage::Error { code, .. } => assert_eq!(code, expected),
        other => panic!("Expected {} error, got {:?}", expected, other),
    }
}

/// End-to-end game: a night kill, a seer reading, an auto-started vote and a
/// village win
#[tokio::test]
async fn test_full_game_flow() {
    let (state, tokens) = started_game(6).await;
    let mut events = state.broadcast.subscribe();

    let alien = by_role(&state, &tokens, Role::Alien).await.remove(0);
    let doctor = by_role(&state, &tokens, Role::Doctor).await.remove(0);
    let seer = by_role(&state, &tokens, Role::Seer).await.remove(0);
    let villagers = by_role(&state, &tokens, Role::Villager).await;
    assert_eq!(villagers.len(), 3);
    let victim = villagers[0].clone();

    // Night 1: the alien abducts a villager, the doctor guards the seer
    for (actor, target) in [(&alien, &victim), (&doctor, &seer), (&seer, &alien)] {
        match send(
            &state,
            PLAYER,
            ClientMessage::NightAction {
                player_token: actor.token.clone(),
                target_id: target.id.clone(),
            },
        )
        .await
        {
            ServerMessage::NightSubmitted { target_id, .. } => assert_eq!(target_id, target.id),
            other => panic!("Expected NightSubmitted message, got {:?}", other),
        }
    }
    expect_error(
        send(
            &state,
            PLAYER,
            ClientMessage::NightAction {
                player_token: villagers[1].token.clone(),
                target_id: alien.id.clone(),
            },
        )
        .await,
        "NO_NIGHT_ACTION",
    );
    expect_error(
        send(&state, PLAYER, ClientMessage::HostResolveNight).await,
        "UNAUTHORIZED",
    );

    match send(&state, HOST, ClientMessage::HostResolveNight).await {
        ServerMessage::NightResolved { result } => {
            assert_eq!(result.round, 1);
            assert_eq!(result.casualties, vec![victim.id.clone()]);
        }
        other => panic!("Expected NightResolved message, got {:?}", other),
    }
    assert_eq!(state.get_game().await.unwrap().phase, GamePhase::Day);

    // Only the seer learns what they saw
    match send(
        &state,
        PLAYER,
        ClientMessage::RequestPrivateState {
            player_token: seer.token.clone(),
        },
    )
    .await
    {
        ServerMessage::PrivateState { state: private } => {
            assert_eq!(private.role, Role::Seer);
            assert_eq!(private.insights.len(), 1);
            assert_eq!(private.insights[0].target_id, alien.id);
            assert_eq!(private.insights[0].team, Team::Aliens);
        }
        other => panic!("Expected PrivateState message, got {:?}", other),
    }

    // The victim is out of the day
    expect_error(
        send(
            &state,
            PLAYER,
            ClientMessage::Ready {
                player_token: victim.token.clone(),
                ready: true,
            },
        )
        .await,
        "ELIMINATED",
    );

    // Day 1: the doctor nominates the alien, the seer seconds it
    send(
        &state,
        PLAYER,
        ClientMessage::Nominate {
            player_token: doctor.token.clone(),
            target_id: Some(alien.id.clone()),
        },
    )
    .await;
    match send(
        &state,
        PLAYER,
        ClientMessage::Support {
            player_token: seer.token.clone(),
            target_id: alien.id.clone(),
            support: true,
        },
    )
    .await
    {
        ServerMessage::DayState { state: day } => {
            assert_eq!(day.nominations.len(), 1);
            assert!(day.nominations[0].valid);
        }
        other => panic!("Expected DayState message, got {:?}", other),
    }

    let alive = [&alien, &doctor, &seer, &villagers[1], &villagers[2]];
    let mut last = None;
    for player in alive {
        last = Some(
            send(
                &state,
                PLAYER,
                ClientMessage::Ready {
                    player_token: player.token.clone(),
                    ready: true,
                },
            )
            .await,
        );
    }
    match last {
        Some(ServerMessage::DayState { state: day }) => {
            assert_eq!(day.stage, DayStage::Voting);
            assert_eq!(day.candidates, vec![alien.id.clone()]);
            assert_eq!(day.majority_threshold, 3);
        }
        other => panic!("Expected DayState message, got {:?}", other),
    }

    // Not decided yet
    expect_error(
        send(&state, HOST, ClientMessage::HostResolveDay).await,
        "DAY_UNDECIDED",
    );

    for voter in [&doctor, &seer, &villagers[1]] {
        send(
            &state,
            PLAYER,
            ClientMessage::Vote {
                player_token: voter.token.clone(),
                target_id: alien.id.clone(),
            },
        )
        .await;
    }

    match send(&state, HOST, ClientMessage::HostResolveDay).await {
        ServerMessage::DayResolved { result } => {
            assert_eq!(result.eliminated, Some(alien.id.clone()));
            assert!(!result.tie);
        }
        other => panic!("Expected DayResolved message, got {:?}", other),
    }

    let game = state.get_game().await.unwrap();
    assert_eq!(game.phase, GamePhase::Ended);
    let outcome = game.outcome.expect("outcome latched");
    assert_eq!(outcome.winner, Team::Village);
    assert_eq!(outcome.reason, WinReason::FactionEliminated);

    // The table is revealed to everyone at the end
    let mut saw_game_over = false;
    while let Ok(msg) = events.try_recv() {
        if let ServerMessage::GameOver { assignments, .. } = msg {
            assert_eq!(assignments.len(), 6);
            saw_game_over = true;
        }
    }
    assert!(saw_game_over, "GameOver should be broadcast");
}

#[tokio::test]
async fn test_skip_majority_moves_to_next_night() {
    let (state, tokens) = started_game(5).await;
    send(&state, HOST, ClientMessage::HostResolveNight).await;

    for player in &tokens[..3] {
        send(
            &state,
            PLAYER,
            ClientMessage::Skip {
                player_token: player.token.clone(),
                support: true,
            },
        )
        .await;
    }
    match send(&state, HOST, ClientMessage::HostResolveDay).await {
        ServerMessage::DayResolved { result } => {
            assert!(result.skipped);
            assert_eq!(result.eliminated, None);
        }
        other => panic!("Expected DayResolved message, got {:?}", other),
    }

    let game = state.get_game().await.unwrap();
    assert_eq!(game.phase, GamePhase::Night);
    assert_eq!(game.round_no, 2);
}

#[tokio::test]
async fn test_host_controls_the_ballot() {
    let (state, tokens) = started_game(4).await;
    send(&state, HOST, ClientMessage::HostResolveNight).await;

    expect_error(
        send(&state, PLAYER, ClientMessage::HostStartVote { candidates: None }).await,
        "UNAUTHORIZED",
    );
    expect_error(
        send(&state, HOST, ClientMessage::HostStartVote { candidates: None }).await,
        "NO_CANDIDATES",
    );

    let candidates = vec![tokens[0].id.clone(), tokens[1].id.clone()];
    match send(
        &state,
        HOST,
        ClientMessage::HostStartVote {
            candidates: Some(candidates.clone()),
        },
    )
    .await
    {
        ServerMessage::DayState { state: day } => assert_eq!(day.candidates, candidates),
        other => panic!("Expected DayState message, got {:?}", other),
    }

    match send(&state, HOST, ClientMessage::HostResetDay).await {
        ServerMessage::DayState { state: day } => {
            assert_eq!(day.stage, DayStage::Nominations);
            assert!(day.candidates.is_empty());
        }
        other => panic!("Expected DayState message, got {:?}", other),
    }
}

#[tokio::test]
async fn test_registration_closes_after_start() {
    let (state, tokens) = started_game(3).await;
    expect_error(
        send(
            &state,
            PLAYER,
            ClientMessage::RegisterPlayer {
                player_token: tokens[0].token.clone(),
                display_name: "Renamed".to_string(),
            },
        )
        .await,
        "REGISTRATION_CLOSED",
    );
    expect_error(
        send(&state, HOST, ClientMessage::HostStartGame).await,
        "INVALID_TRANSITION",
    );
}
