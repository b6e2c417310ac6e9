//! HTTP endpoints.
//!
//! `GET /api/state` is a public snapshot for spectators and dashboards; it
//! never includes roles or seer insights.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::engine::day::DerivedDayState;
use crate::protocol::{PublicNightResult, RosterEntry};
use crate::state::AppState;
use crate::types::{Game, GamePhase};

#[derive(Debug, Clone, Serialize)]
pub struct PublicSnapshot {
    pub game: Option<Game>,
    pub roster: Vec<RosterEntry>,
    /// Present during the day
    pub day: Option<DerivedDayState>,
    pub last_night: Option<PublicNightResult>,
}

impl AppState {
    pub async fn public_snapshot(&self) -> PublicSnapshot {
        let game = self.get_game().await;
        let day = match &game {
            Some(g) if g.phase == GamePhase::Day => self.derive_day_state().await.ok(),
            _ => None,
        };
        PublicSnapshot {
            game,
            roster: self.roster().await,
            day,
            last_night: self.last_public_night().await,
        }
    }
}

/// GET /api/state
pub async fn get_state(State(state): State<Arc<AppState>>) -> Json<PublicSnapshot> {
    Json(state.public_snapshot().await)
}

/// GET /healthz
pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
