//! Request Handlers
//!
//! Thin adapters from HTTP onto [`CasinoEngine`] operations. Every handler
//! carries the request ID into its error responses.

use super::{errors::ApiError, middleware::RequestId, models::*};
use crate::{
    access::AccessDecision,
    engine::{CasinoEngine, JackpotInfo, ProfileOverview, WelcomeContext},
    games::types::{BetResponse, FinalResult},
    jackpot::JackpotSnapshot,
};
use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Extension, Json,
};
use std::sync::Arc;

/// Shared application state
pub struct AppState {
    pub engine: Arc<CasinoEngine>,
    pub version: String,
}

impl AppState {
    pub fn new(engine: Arc<CasinoEngine>) -> Self {
        Self {
            engine,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// GET /health
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "Running".to_string(),
        version: state.version.clone(),
    })
}

/// POST /players/:id/enter
///
/// A refused entry is still a 200: the decision carries the reason and
/// context the client needs to render it.
pub async fn enter_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(player_id): Path<u64>,
) -> ApiResult<AccessDecision> {
    state
        .engine
        .enter(player_id)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_casino(request_id.0, e))
}

/// POST /players/:id/bet
pub async fn bet_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(player_id): Path<u64>,
    Json(request): Json<BetRequest>,
) -> ApiResult<BetResponse> {
    state
        .engine
        .place_bet(player_id, request.stake)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_casino(request_id.0, e))
}

/// POST /players/:id/take
pub async fn take_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(player_id): Path<u64>,
) -> ApiResult<FinalResult> {
    state
        .engine
        .take_intermediate(player_id)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_casino(request_id.0, e))
}

/// POST /players/:id/risk
pub async fn risk_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(player_id): Path<u64>,
) -> ApiResult<FinalResult> {
    state
        .engine
        .risk_intermediate(player_id)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_casino(request_id.0, e))
}

/// POST /players/:id/exit
pub async fn exit_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(player_id): Path<u64>,
) -> ApiResult<ExitResponse> {
    let summary = state
        .engine
        .exit_session(player_id)
        .await
        .map_err(|e| ApiError::from_casino(request_id.0, e))?;

    Ok(Json(ExitResponse { player_id, summary }))
}

/// POST /players/:id/self-exclude
pub async fn self_exclude_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(player_id): Path<u64>,
    body: Option<Json<SelfExcludeRequest>>,
) -> ApiResult<SelfExcludeResponse> {
    let days = body
        .and_then(|Json(request)| request.days)
        .unwrap_or(state.engine.config().responsible.self_exclusion_days);

    let excluded_until = state
        .engine
        .self_exclude(player_id, days)
        .await
        .map_err(|e| ApiError::from_casino(request_id.0, e))?;

    Ok(Json(SelfExcludeResponse {
        player_id,
        excluded_until,
    }))
}

/// POST /players/:id/golden-hour
pub async fn golden_hour_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(player_id): Path<u64>,
) -> ApiResult<GoldenHourResponse> {
    let ends_at = state
        .engine
        .activate_golden_hour(player_id)
        .await
        .map_err(|e| ApiError::from_casino(request_id.0, e))?;

    Ok(Json(GoldenHourResponse { player_id, ends_at }))
}

/// POST /players/:id/deposit
pub async fn deposit_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(player_id): Path<u64>,
    Json(request): Json<DepositRequest>,
) -> ApiResult<BalanceResponse> {
    let balance = state
        .engine
        .deposit(player_id, request.amount)
        .await
        .map_err(|e| ApiError::from_casino(request_id.0, e))?;

    Ok(Json(BalanceResponse { player_id, balance }))
}

/// GET /players/:id/balance
pub async fn balance_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(player_id): Path<u64>,
) -> ApiResult<BalanceResponse> {
    let balance = state
        .engine
        .balance(player_id)
        .map_err(|e| ApiError::from_casino(request_id.0, e))?;

    Ok(Json(BalanceResponse { player_id, balance }))
}

/// GET /players/:id/pending
pub async fn pending_handler(
    State(state): State<Arc<AppState>>,
    Path(player_id): Path<u64>,
) -> Json<PendingResponse> {
    Json(PendingResponse {
        player_id,
        pending: state.engine.pending_wager(player_id),
    })
}

/// GET /players/:id/last-chance
pub async fn last_chance_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(player_id): Path<u64>,
) -> ApiResult<LastChanceResponse> {
    let last_chance = state
        .engine
        .last_chance(player_id)
        .map_err(|e| ApiError::from_casino(request_id.0, e))?;

    Ok(Json(LastChanceResponse {
        player_id,
        last_chance,
    }))
}

/// GET /players/:id/profile
pub async fn profile_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(player_id): Path<u64>,
) -> ApiResult<ProfileOverview> {
    state
        .engine
        .profile(player_id)
        .map(Json)
        .map_err(|e| ApiError::from_casino(request_id.0, e))
}

/// GET /players/:id/welcome
pub async fn welcome_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(player_id): Path<u64>,
) -> ApiResult<WelcomeContext> {
    state
        .engine
        .welcome_context(player_id)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_casino(request_id.0, e))
}

/// GET /players/:id/games?limit=N
pub async fn games_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(player_id): Path<u64>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<GamesResponse> {
    let games = state
        .engine
        .recent_games(player_id, query.limit.min(MAX_LIMIT))
        .map_err(|e| ApiError::from_casino(request_id.0, e))?;

    Ok(Json(GamesResponse { player_id, games }))
}

/// GET /jackpot
pub async fn jackpot_handler(State(state): State<Arc<AppState>>) -> Json<JackpotSnapshot> {
    Json(state.engine.jackpot_snapshot().await)
}

/// GET /jackpot/info?limit=N
pub async fn jackpot_info_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<JackpotInfo> {
    state
        .engine
        .jackpot_info(query.limit.min(MAX_LIMIT))
        .await
        .map(Json)
        .map_err(|e| ApiError::from_casino(request_id.0, e))
}

/// GET /metrics
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        state.engine.metrics().to_prometheus_format(),
    )
        .into_response()
}
