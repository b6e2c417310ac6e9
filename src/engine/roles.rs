//! Static role catalog shared by the night engine and the win evaluator.

use serde::{Deserialize, Serialize};

/// Faction a role plays for
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    /// The adversarial faction hiding among the village
    Aliens,
    Village,
}

impl Team {
    pub fn is_adversarial(self) -> bool {
        self == Team::Aliens
    }
}

/// What a role may do during the night
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NightAction {
    Eliminate,
    Protect,
    Investigate,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Alien,
    Doctor,
    Seer,
    Villager,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Alien, Role::Doctor, Role::Seer, Role::Villager];

    pub fn team(self) -> Team {
        match self {
            Role::Alien => Team::Aliens,
            Role::Doctor | Role::Seer | Role::Villager => Team::Village,
        }
    }

    pub fn night_action(self) -> Option<NightAction> {
        match self {
            Role::Alien => Some(NightAction::Eliminate),
            Role::Doctor => Some(NightAction::Protect),
            Role::Seer => Some(NightAction::Investigate),
            Role::Villager => None,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Role::Alien => "Alien",
            Role::Doctor => "Doctor",
            Role::Seer => "Seer",
            Role::Villager => "Villager",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Role::Alien => "Each night, agree with the other aliens on one player to abduct.",
            Role::Doctor => "Each night, pick one player to protect from abduction.",
            Role::Seer => "Each night, learn which faction one player belongs to.",
            Role::Villager => "Find the aliens and vote them out during the day.",
        }
    }
}
