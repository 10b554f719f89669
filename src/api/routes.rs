//! Route Definitions
//!
//! Maps URLs to handlers with type-safe routing.

use super::handlers::*;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Build the API router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        // Player actions
        .route("/players/:id/enter", post(enter_handler))
        .route("/players/:id/bet", post(bet_handler))
        .route("/players/:id/take", post(take_handler))
        .route("/players/:id/risk", post(risk_handler))
        .route("/players/:id/exit", post(exit_handler))
        .route("/players/:id/self-exclude", post(self_exclude_handler))
        .route("/players/:id/golden-hour", post(golden_hour_handler))
        .route("/players/:id/deposit", post(deposit_handler))
        // Player reads
        .route("/players/:id/balance", get(balance_handler))
        .route("/players/:id/pending", get(pending_handler))
        .route("/players/:id/last-chance", get(last_chance_handler))
        .route("/players/:id/profile", get(profile_handler))
        .route("/players/:id/welcome", get(welcome_handler))
        .route("/players/:id/games", get(games_handler))
        // Jackpot
        .route("/jackpot", get(jackpot_handler))
        .route("/jackpot/info", get(jackpot_info_handler))
        .with_state(state)
}
