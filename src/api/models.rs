//! API Request and Response Models

use crate::{
    games::types::{CooldownTier, GameRecord, PendingWager},
    session::SessionSummary,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// POST /players/:id/bet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetRequest {
    pub stake: u64,
}

/// POST /players/:id/deposit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositRequest {
    pub amount: u64,
}

/// POST /players/:id/self-exclude; `days` falls back to the configured default
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelfExcludeRequest {
    pub days: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub player_id: u64,
    pub balance: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelfExcludeResponse {
    pub player_id: u64,
    pub excluded_until: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoldenHourResponse {
    pub player_id: u64,
    pub ends_at: DateTime<Utc>,
}

/// Session close result; `summary` is null when nothing was played
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitResponse {
    pub player_id: u64,
    pub summary: Option<SessionSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingResponse {
    pub player_id: u64,
    pub pending: Option<PendingWager>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastChanceResponse {
    pub player_id: u64,
    pub last_chance: Option<CooldownTier>,
}

/// Query parameters for history listings
#[derive(Debug, Clone, Deserialize)]
pub struct LimitQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    20
}

/// Upper bound on any history page
pub const MAX_LIMIT: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GamesResponse {
    pub player_id: u64,
    pub games: Vec<GameRecord>,
}
