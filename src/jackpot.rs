//! Progressive jackpot shared by all players

use crate::config::{JackpotConfig, FULL_SCALE_BPS};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard};

/// Persisted jackpot record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JackpotState {
    pub pool: u64,
    pub last_winner_id: Option<u64>,
    pub last_win_amount: Option<u64>,
    pub last_win_at: Option<DateTime<Utc>>,
    pub total_won: u64,
}

impl JackpotState {
    pub fn fresh(config: &JackpotConfig) -> Self {
        Self {
            pool: config.floor,
            last_winner_id: None,
            last_win_amount: None,
            last_win_at: None,
            total_won: 0,
        }
    }

    /// Add to the pool and return the new size
    pub fn contribute(&mut self, amount: u64) -> u64 {
        self.pool = self.pool.saturating_add(amount);
        self.pool
    }

    /// Claim the pool if it is large enough. Returns the amount won, which is
    /// the pool before it resets to the floor.
    pub fn try_win(
        &mut self,
        player_id: u64,
        config: &JackpotConfig,
        now: DateTime<Utc>,
    ) -> Option<u64> {
        if self.pool < config.min_pool {
            return None;
        }

        let amount = self.pool;
        self.pool = config.floor;
        self.last_winner_id = Some(player_id);
        self.last_win_amount = Some(amount);
        self.last_win_at = Some(now);
        self.total_won = self.total_won.saturating_add(amount);
        Some(amount)
    }
}

/// Append-only history row for a jackpot win
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JackpotWin {
    pub id: u64,
    pub player_id: u64,
    pub amount: u64,
    pub won_at: DateTime<Utc>,
}

/// Public view of the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JackpotSnapshot {
    pub pool: u64,
    pub floor: u64,
    pub min_pool: u64,
}

/// Per-wager contribution: a share of the stake with a minimum
pub fn contribution_for(stake: u64, config: &JackpotConfig) -> u64 {
    let share = stake.saturating_mul(config.contribution_bps as u64) / FULL_SCALE_BPS as u64;
    share.max(config.min_contribution)
}

/// In-memory jackpot guarded by one global lock.
///
/// Callers hold the guard across their whole read-modify-write and the store
/// commit, and only write the new state back into the guard once the commit
/// has succeeded.
pub struct JackpotPool {
    config: JackpotConfig,
    state: Mutex<JackpotState>,
}

impl JackpotPool {
    pub fn new(config: JackpotConfig, state: JackpotState) -> Self {
        Self {
            config,
            state: Mutex::new(state),
        }
    }

    pub fn config(&self) -> &JackpotConfig {
        &self.config
    }

    pub async fn lock(&self) -> MutexGuard<'_, JackpotState> {
        self.state.lock().await
    }

    pub async fn snapshot(&self) -> JackpotSnapshot {
        let state = self.state.lock().await;
        JackpotSnapshot {
            pool: state.pool,
            floor: self.config.floor,
            min_pool: self.config.min_pool,
        }
    }

    pub async fn state(&self) -> JackpotState {
        self.state.lock().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_contribution_has_minimum() {
        let config = JackpotConfig::default();
        assert_eq!(contribution_for(10, &config), 1);
        assert_eq!(contribution_for(100, &config), 5);
        assert_eq!(contribution_for(500, &config), 25);
    }

    #[test]
    fn test_win_returns_pre_reset_amount() {
        let config = JackpotConfig::default();
        let mut state = JackpotState::fresh(&config);
        state.contribute(250);

        let now = Utc::now();
        assert_eq!(state.try_win(42, &config, now), Some(750));
        assert_eq!(state.pool, config.floor);
        assert_eq!(state.last_winner_id, Some(42));
        assert_eq!(state.last_win_amount, Some(750));
        assert_eq!(state.total_won, 750);
    }

    #[test]
    fn test_win_requires_min_pool() {
        let config = JackpotConfig {
            floor: 50,
            ..JackpotConfig::default()
        };
        let mut state = JackpotState::fresh(&config);

        assert_eq!(state.try_win(1, &config, Utc::now()), None);
        assert_eq!(state.pool, 50);
        assert_eq!(state.total_won, 0);
    }

    #[tokio::test]
    async fn test_concurrent_contributions_are_not_lost() {
        let config = JackpotConfig::default();
        let pool = Arc::new(JackpotPool::new(config.clone(), JackpotState::fresh(&config)));

        let mut handles = Vec::new();
        for _ in 0..50 {
            let pool = pool.clone();
            handles.push(tokio::spawn(async move {
                let mut guard = pool.lock().await;
                let mut next = guard.clone();
                next.contribute(2);
                tokio::task::yield_now().await;
                *guard = next;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(pool.snapshot().await.pool, config.floor + 100);
    }
}
