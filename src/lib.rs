//! Casino Engine
//!
//! Two-phase dice wagering with a shared progressive jackpot, loss-streak
//! cooldowns, responsible-gaming gates and per-player sessions, persisted
//! in RocksDB and served over HTTP.

pub mod access;
pub mod api;
pub mod casino_store;
pub mod clock;
pub mod config;
pub mod cooldown;
pub mod engine;
pub mod errors;
pub mod games;
pub mod jackpot;
pub mod metrics;
pub mod profile;
pub mod session;
pub mod storage;

pub use access::{AccessDecision, AccessGate, AccessReason};
pub use config::{CasinoConfig, ConfigLoader};
pub use engine::CasinoEngine;
pub use errors::{CasinoError, CasinoResult, WagerError};
pub use games::types::{BetResponse, FinalResult, Outcome, PendingWager};
