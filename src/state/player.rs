use super::{AppState, GameError};
use crate::engine::capability::capabilities;
use crate::protocol::{PrivateState, RosterEntry, ServerMessage};
use crate::types::*;
use rand::Rng;

/// Safe character set for short codes (excludes 0/O, 1/I/L to avoid confusion)
const CODE_CHARS: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const CODE_LENGTH: usize = 5;

/// Generate a random short code (5 characters)
fn generate_short_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARS[rng.random_range(0..CODE_CHARS.len())] as char)
        .collect()
}

fn push_player(players: &mut Vec<Player>) -> Player {
    let token = loop {
        let code = generate_short_code();
        if !players.iter().any(|p| p.token == code) {
            break code;
        }
    };

    let player = Player {
        id: ulid::Ulid::new().to_string(),
        token,
        display_name: None,
    };
    players.push(player.clone());
    player
}

/// Engine view of the seated players, in roster order
pub(crate) fn participants_from(
    players: &[Player],
    assignments: &[PlayerAssignment],
) -> Vec<Participant> {
    players
        .iter()
        .filter_map(|p| {
            let seat = assignments.iter().find(|a| a.player_id == p.id)?;
            Some(Participant {
                id: p.id.clone(),
                name: p.display_name.clone().unwrap_or_else(|| p.id.clone()),
                alive: seat.alive,
            })
        })
        .collect()
}

impl AppState {
    /// Create a new player with a short join code
    pub async fn create_player(&self) -> Player {
        let mut players = self.players.write().await;
        push_player(&mut players)
    }

    /// Create `count` join tokens at once, up to the configured table size
    pub async fn create_players(&self, count: usize) -> Result<Vec<Player>, GameError> {
        let max = self.config.max_players;
        let mut players = self.players.write().await;
        if players.len().saturating_add(count) > max {
            return Err(GameError::TableFull { max });
        }
        Ok((0..count).map(|_| push_player(&mut players)).collect())
    }

    /// Register a player with display name; only while the game is in the lobby
    pub async fn register_player(
        &self,
        token: &str,
        display_name: String,
    ) -> Result<Player, GameError> {
        let in_lobby = self
            .game
            .read()
            .await
            .as_ref()
            .map_or(true, |g| g.phase == GamePhase::Lobby);

        let mut players = self.players.write().await;
        let player = players
            .iter_mut()
            .find(|p| p.token == token)
            .ok_or(GameError::InvalidToken)?;
        if !in_lobby {
            return Err(GameError::RegistrationClosed);
        }
        player.display_name = Some(display_name);
        Ok(player.clone())
    }

    /// Get player by token
    pub async fn get_player_by_token(&self, token: &str) -> Option<Player> {
        self.players
            .read()
            .await
            .iter()
            .find(|p| p.token == token)
            .cloned()
    }

    /// Seated players as the day engine sees them
    pub async fn participants(&self) -> Vec<Participant> {
        let players = self.players.read().await;
        let assignments = self.assignments.read().await;
        participants_from(&players, &assignments)
    }

    /// Public roster; alive flags once roles are dealt
    pub async fn roster(&self) -> Vec<RosterEntry> {
        let players = self.players.read().await;
        let assignments = self.assignments.read().await;
        players
            .iter()
            .map(|p| RosterEntry {
                player_id: p.id.clone(),
                display_name: p.display_name.clone(),
                alive: assignments
                    .iter()
                    .find(|a| a.player_id == p.id)
                    .map_or(true, |a| a.alive),
            })
            .collect()
    }

    pub(crate) async fn broadcast_roster(&self) {
        let players = self.roster().await;
        self.broadcast_to_all(ServerMessage::Roster { players });
    }

    /// Role, allies, insights and capabilities for one player
    pub async fn private_state(&self, token: &str) -> Result<PrivateState, GameError> {
        let phase = self
            .game
            .read()
            .await
            .as_ref()
            .map(|g| g.phase)
            .ok_or(GameError::NoGame)?;
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

        let allies = if seat.role.team().is_adversarial() {
            assignments
                .iter()
                .filter(|a| a.player_id != seat.player_id && a.role.team() == seat.role.team())
                .map(|a| a.player_id.clone())
                .collect()
        } else {
            Vec::new()
        };
        let insights = self
            .seer_insights
            .read()
            .await
            .get(&player.id)
            .cloned()
            .unwrap_or_default();

        Ok(PrivateState {
            player_id: player.id.clone(),
            role: seat.role,
            role_name: seat.role.display_name().to_string(),
            role_description: seat.role.description().to_string(),
            team: seat.role.team(),
            alive: seat.alive,
            allies,
            insights,
            capabilities: capabilities(Some(seat), phase),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::roles::Role;

    #[test]
    fn test_short_codes_use_safe_alphabet() {
        for _ in 0..50 {
            let code = generate_short_code();
            assert_eq!(code.len(), CODE_LENGTH);
            assert!(code.bytes().all(|c| CODE_CHARS.contains(&c)));
        }
    }

    #[test]
    fn test_participants_skip_unseated_players() {
        let players = vec![
            Player {
                id: "a".into(),
                token: "AAAAA".into(),
                display_name: Some("Ash".into()),
            },
            Player {
                id: "b".into(),
                token: "BBBBB".into(),
                display_name: None,
            },
        ];
        let mut seat = PlayerAssignment::new("b".into(), Role::Villager, 0);
        seat.alive = false;

        let participants = participants_from(&players, &[seat]);
        assert_eq!(
            participants,
            vec![Participant {
                id: "b".into(),
                name: "b".into(),
                alive: false,
            }]
        );
    }

    #[tokio::test]
    async fn test_aliens_see_each_other() {
        let state = AppState::new();
        state.create_game().await;
        let mut players = Vec::new();
        for _ in 0..4 {
            players.push(state.create_player().await);
        }
        let roles = [Role::Alien, Role::Alien, Role::Seer, Role::Villager];
        let assignments = players
            .iter()
            .zip(roles)
            .enumerate()
            .map(|(i, (p, r))| PlayerAssignment::new(p.id.clone(), r, i))
            .collect();
        state.begin_with_assignments(assignments, None).await.unwrap();

        let first = state.private_state(&players[0].token).await.unwrap();
        assert_eq!(first.allies, vec![players[1].id.clone()]);
        assert!(first.capabilities.night_action.is_some());

        let seer = state.private_state(&players[2].token).await.unwrap();
        assert!(seer.allies.is_empty());
        assert_eq!(seer.role, Role::Seer);
        assert_eq!(seer.role_name, "Seer");
        assert_eq!(seer.role_description, Role::Seer.description());

        let roster = state.roster().await;
        assert_eq!(roster.len(), 4);
        assert!(roster.iter().all(|r| r.alive));
    }

    #[tokio::test]
    async fn test_create_players_respects_table_size() {
        let state = AppState::with_config(crate::config::ServerConfig {
            max_players: 4,
            ..Default::default()
        });
        let first = state.create_players(3).await.unwrap();
        assert_eq!(first.len(), 3);
        assert_eq!(
            state.create_players(2).await,
            Err(GameError::TableFull { max: 4 })
        );
        assert_eq!(
            state.create_players(usize::MAX).await,
            Err(GameError::TableFull { max: 4 })
        );
        assert_eq!(state.players.read().await.len(), 3);
        assert_eq!(state.create_players(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_private_state_requires_a_seat() {
        let state = AppState::new();
        state.create_game().await;
        let player = state.create_player().await;
        assert_eq!(
            state.private_state(&player.token).await,
            Err(GameError::NotParticipant(player.id.clone()))
        );
        assert_eq!(
            state.private_state("zzzzz").await,
            Err(GameError::InvalidToken)
        );
    }
}
