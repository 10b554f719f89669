//! Loss-streak cooldowns, tracked per player and game variant

use crate::config::CooldownConfig;
use crate::games::draws::DrawSource;
use crate::games::types::CooldownTier;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Cooldown bookkeeping for one (player, variant) pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownState {
    pub lose_streak: u32,
    pub cooldown_until: Option<DateTime<Utc>>,
}

/// A cooldown that was just started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownStarted {
    pub tier: CooldownTier,
    pub seconds: u64,
    pub until: DateTime<Utc>,
}

/// Whether play is currently allowed for a variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownCheck {
    pub allowed: bool,
    pub seconds_remaining: u64,
}

#[derive(Debug, Clone)]
pub struct CooldownManager {
    config: CooldownConfig,
}

impl CooldownManager {
    pub fn new(config: CooldownConfig) -> Self {
        Self { config }
    }

    pub fn on_win(&self, state: &mut CooldownState) {
        state.lose_streak = 0;
        state.cooldown_until = None;
    }

    /// Count a loss and start a cooldown when a threshold is reached.
    ///
    /// The long tier resets the streak; the short tier keeps counting so a
    /// player can still reach the long tier.
    pub fn on_loss(
        &self,
        state: &mut CooldownState,
        now: DateTime<Utc>,
        draws: &mut dyn DrawSource,
    ) -> Option<CooldownStarted> {
        state.lose_streak += 1;

        let (tier, seconds) = if state.lose_streak >= self.config.big_threshold {
            let seconds = draws.draw_range(self.config.big_min_secs, self.config.big_max_secs);
            state.lose_streak = 0;
            (CooldownTier::Long, seconds)
        } else if state.lose_streak >= self.config.small_threshold {
            let seconds =
                draws.draw_range(self.config.small_min_secs, self.config.small_max_secs);
            (CooldownTier::Short, seconds)
        } else {
            return None;
        };

        let until = now + Duration::seconds(seconds as i64);
        state.cooldown_until = Some(until);
        tracing::debug!(
            tier = ?tier,
            seconds,
            until = %until,
            "Cooldown started"
        );
        Some(CooldownStarted {
            tier,
            seconds,
            until,
        })
    }

    pub fn can_play(&self, state: &CooldownState, now: DateTime<Utc>) -> CooldownCheck {
        match state.cooldown_until {
            Some(until) if until > now => CooldownCheck {
                allowed: false,
                seconds_remaining: (until - now).num_seconds().max(0) as u64,
            },
            _ => CooldownCheck {
                allowed: true,
                seconds_remaining: 0,
            },
        }
    }

    /// Tier the next loss would trigger, if any
    pub fn last_chance(&self, state: &CooldownState) -> Option<CooldownTier> {
        let next = state.lose_streak + 1;
        if next >= self.config.big_threshold {
            Some(CooldownTier::Long)
        } else if next >= self.config.small_threshold {
            Some(CooldownTier::Short)
        } else {
            None
        }
    }
}
