//! One-shot random role assignment.

use super::roles::Role;
use crate::types::{PlayerAssignment, PlayerId};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const MIN_PLAYERS: usize = 3;

/// Setup mistakes; the only user-facing errors the engine produces
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DealError {
    #[error("need at least {min} players, got {got}")]
    TooFewPlayers { min: usize, got: usize },

    #[error("at least one alien is required")]
    NoAliens,

    #[error("{aliens} aliens would start at parity with {players} players")]
    AliensAtParity { aliens: usize, players: usize },

    #[error("{specials} special roles do not fit {players} players")]
    TooManyRoles { specials: usize, players: usize },

    /// Internal invariant: the pool must match the table exactly
    #[error("role pool has {pool} roles for {players} players")]
    PoolMismatch { pool: usize, players: usize },
}

/// Number of each special role; everybody else is a villager
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoleSetup {
    pub aliens: usize,
    pub doctors: usize,
    pub seers: usize,
}

impl RoleSetup {
    /// One alien per four players, one doctor, one seer
    pub fn for_players(players: usize) -> Self {
        Self {
            aliens: (players / 4).max(1),
            doctors: 1,
            seers: 1,
        }
    }

    pub fn specials(&self) -> usize {
        self.aliens + self.doctors + self.seers
    }

    pub fn validate(&self, players: usize) -> Result<(), DealError> {
        if players < MIN_PLAYERS {
            return Err(DealError::TooFewPlayers {
                min: MIN_PLAYERS,
                got: players,
            });
        }
        if self.aliens == 0 {
            return Err(DealError::NoAliens);
        }
        if self.specials() > players {
            return Err(DealError::TooManyRoles {
                specials: self.specials(),
                players,
            });
        }
        if self.aliens * 2 >= players {
            return Err(DealError::AliensAtParity {
                aliens: self.aliens,
                players,
            });
        }
        Ok(())
    }

    /// Role pool for `players` seats, padded with villagers
    pub fn build_pool(&self, players: usize) -> Result<Vec<Role>, DealError> {
        self.validate(players)?;
        let mut pool = Vec::with_capacity(players);
        pool.extend(std::iter::repeat(Role::Alien).take(self.aliens));
        pool.extend(std::iter::repeat(Role::Doctor).take(self.doctors));
        pool.extend(std::iter::repeat(Role::Seer).take(self.seers));
        pool.resize(players, Role::Villager);
        Ok(pool)
    }
}

/// Shuffle the pool and the players, then zip them together.
pub fn deal_roles<R: Rng + ?Sized>(
    player_ids: &[PlayerId],
    pool: &[Role],
    rng: &mut R,
) -> Result<Vec<PlayerAssignment>, DealError> {
    if pool.len() != player_ids.len() {
        return Err(DealError::PoolMismatch {
            pool: pool.len(),
            players: player_ids.len(),
        });
    }

    let mut roles = pool.to_vec();
    roles.shuffle(rng);
    let mut seats = player_ids.to_vec();
    seats.shuffle(rng);

    Ok(seats
        .into_iter()
        .zip(roles)
        .enumerate()
        .map(|(order, (player_id, role))| PlayerAssignment::new(player_id, role, order))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn ids(n: usize) -> Vec<PlayerId> {
        (0..n).map(|i| format!("p{}", i)).collect()
    }

    #[test]
    fn test_default_setup_scales_aliens() {
        assert_eq!(RoleSetup::for_players(5).aliens, 1);
        assert_eq!(RoleSetup::for_players(8).aliens, 2);
        assert_eq!(RoleSetup::for_players(12).aliens, 3);
    }

    #[test]
    fn test_pool_is_padded_with_villagers() {
        let pool = RoleSetup::for_players(6).build_pool(6).unwrap();
        assert_eq!(pool.len(), 6);
        assert_eq!(pool.iter().filter(|r| **r == Role::Alien).count(), 1);
        assert_eq!(pool.iter().filter(|r| **r == Role::Villager).count(), 3);
    }

    #[test]
    fn test_setup_validation() {
        let setup = RoleSetup {
            aliens: 1,
            doctors: 1,
            seers: 1,
        };
        assert_eq!(
            setup.validate(2),
            Err(DealError::TooFewPlayers { min: 3, got: 2 })
        );
        assert_eq!(
            RoleSetup { aliens: 0, ..setup }.validate(6),
            Err(DealError::NoAliens)
        );
        assert_eq!(
            RoleSetup { aliens: 3, ..setup }.validate(6),
            Err(DealError::AliensAtParity {
                aliens: 3,
                players: 6
            })
        );
        assert_eq!(
            RoleSetup { doctors: 4, ..setup }.validate(5),
            Err(DealError::TooManyRoles {
                specials: 6,
                players: 5
            })
        );
        assert!(setup.validate(3).is_ok());
    }

    #[test]
    fn test_deal_gives_every_player_one_role() {
        let players = ids(7);
        let pool = RoleSetup::for_players(7).build_pool(7).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let assignments = deal_roles(&players, &pool, &mut rng).unwrap();

        assert_eq!(assignments.len(), 7);
        let mut dealt: Vec<_> = assignments.iter().map(|a| a.player_id.clone()).collect();
        dealt.sort();
        assert_eq!(dealt, players);
        let mut roles: Vec<_> = assignments.iter().map(|a| a.role).collect();
        let mut expected = pool.clone();
        roles.sort_by_key(|r| *r as u8);
        expected.sort_by_key(|r| *r as u8);
        assert_eq!(roles, expected);
        assert!(assignments.iter().enumerate().all(|(i, a)| a.order == i && a.alive));
    }

    #[test]
    fn test_same_seed_same_deal() {
        let players = ids(6);
        let pool = RoleSetup::for_players(6).build_pool(6).unwrap();
        let first = deal_roles(&players, &pool, &mut StdRng::seed_from_u64(42)).unwrap();
        let second = deal_roles(&players, &pool, &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_pool_mismatch_aborts() {
        let result = deal_roles(&ids(4), &[Role::Alien], &mut StdRng::seed_from_u64(1));
        assert_eq!(
            result,
            Err(DealError::PoolMismatch {
                pool: 1,
                players: 4
            })
        );
    }
}
