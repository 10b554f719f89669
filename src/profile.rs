//! Per-player profile: lifetime and daily aggregates, streaks, responsible-gaming deadlines

use crate::config::{BonusConfig, ResponsibleGamingConfig};
use crate::cooldown::CooldownState;
use crate::games::types::{GameVariant, Modifiers};
use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub player_id: u64,

    // Lifetime aggregates
    pub total_games: u64,
    pub total_wagered: u64,
    pub total_won: u64,
    pub total_lost: u64,
    pub biggest_win: u64,
    pub total_visits: u32,

    // Streaks; at most one of the two current counters is non-zero
    pub current_win_streak: u32,
    pub current_lose_streak: u32,
    pub best_win_streak: u32,
    pub worst_lose_streak: u32,

    pub self_excluded_until: Option<DateTime<Utc>>,
    pub forced_break_until: Option<DateTime<Utc>>,
    pub cooldowns: BTreeMap<GameVariant, CooldownState>,

    // Daily counters, rolled over when `daily_reset_at` is on an earlier day
    pub daily_games: u32,
    pub daily_won: u64,
    pub daily_lost: u64,
    pub daily_reset_at: Option<DateTime<Utc>>,

    pub current_session_id: Option<u64>,
    pub golden_hour_started_at: Option<DateTime<Utc>>,
    pub last_session_result: i64,
    pub last_session_games: u32,
    pub last_game_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Streak badge shown next to the balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "count", rename_all = "snake_case")]
pub enum StreakBadge {
    WinStreak(u32),
    LoseStreak(u32),
}

/// Which greeting applies when the player opens the casino
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Greeting {
    GoldenHour { minutes_left: i64 },
    Night,
    FirstVisit,
    AfterLoss { last_result: i64 },
    AfterWin { last_result: i64 },
    Frequent { visits: u32 },
    Returning,
}

const FREQUENT_VISITS: u32 = 5;
const WIN_BADGE_FROM: u32 = 2;
const LOSE_BADGE_FROM: u32 = 3;

impl Profile {
    pub fn new(player_id: u64, now: DateTime<Utc>) -> Self {
        Self {
            player_id,
            total_games: 0,
            total_wagered: 0,
            total_won: 0,
            total_lost: 0,
            biggest_win: 0,
            total_visits: 0,
            current_win_streak: 0,
            current_lose_streak: 0,
            best_win_streak: 0,
            worst_lose_streak: 0,
            self_excluded_until: None,
            forced_break_until: None,
            cooldowns: BTreeMap::new(),
            daily_games: 0,
            daily_won: 0,
            daily_lost: 0,
            daily_reset_at: Some(now),
            current_session_id: None,
            golden_hour_started_at: None,
            last_session_result: 0,
            last_session_games: 0,
            last_game_at: None,
            created_at: now,
        }
    }

    /// Apply a finalized wager. Returns the forced-break deadline when this
    /// loss started one.
    pub fn record_outcome(
        &mut self,
        stake: u64,
        won: bool,
        payout: u64,
        now: DateTime<Utc>,
        policy: &ResponsibleGamingConfig,
    ) -> Option<DateTime<Utc>> {
        self.total_games += 1;
        self.total_wagered = self.total_wagered.saturating_add(stake);
        self.daily_games += 1;
        self.last_game_at = Some(now);

        if won {
            let winnings = payout.saturating_sub(stake);
            self.total_won = self.total_won.saturating_add(winnings);
            self.daily_won = self.daily_won.saturating_add(winnings);
            self.biggest_win = self.biggest_win.max(winnings);
            self.current_win_streak += 1;
            self.current_lose_streak = 0;
            self.best_win_streak = self.best_win_streak.max(self.current_win_streak);
            return None;
        }

        self.total_lost = self.total_lost.saturating_add(stake);
        self.daily_lost = self.daily_lost.saturating_add(stake);
        self.current_lose_streak += 1;
        self.current_win_streak = 0;
        self.worst_lose_streak = self.worst_lose_streak.max(self.current_lose_streak);

        if self.current_lose_streak >= policy.forced_break_after_losses {
            let until = now + Duration::seconds(policy.forced_break_secs as i64);
            self.forced_break_until = Some(until);
            self.current_lose_streak = 0;
            tracing::info!(
                player_id = self.player_id,
                until = %until,
                "Forced break after loss streak"
            );
            return Some(until);
        }
        None
    }

    /// Zero the daily counters once the watermark is on an earlier calendar day.
    /// Returns true when a reset happened.
    pub fn reset_daily_if_stale(&mut self, now: DateTime<Utc>) -> bool {
        let stale = match self.daily_reset_at {
            Some(mark) => mark.date_naive() < now.date_naive(),
            None => true,
        };
        if stale {
            self.daily_games = 0;
            self.daily_won = 0;
            self.daily_lost = 0;
            self.daily_reset_at = Some(now);
        }
        stale
    }

    /// Self-exclusion never shortens an existing deadline
    pub fn self_exclude(&mut self, days: u32, now: DateTime<Utc>) -> DateTime<Utc> {
        let requested = now + Duration::days(days as i64);
        let until = match self.self_excluded_until {
            Some(existing) if existing > requested => existing,
            _ => requested,
        };
        self.self_excluded_until = Some(until);
        until
    }

    pub fn cooldown(&self, variant: GameVariant) -> CooldownState {
        self.cooldowns.get(&variant).copied().unwrap_or_default()
    }

    pub fn cooldown_mut(&mut self, variant: GameVariant) -> &mut CooldownState {
        self.cooldowns.entry(variant).or_default()
    }

    pub fn activate_golden_hour(&mut self, now: DateTime<Utc>) {
        self.golden_hour_started_at = Some(now);
    }

    pub fn golden_hour_remaining(
        &self,
        now: DateTime<Utc>,
        bonuses: &BonusConfig,
    ) -> Option<Duration> {
        let started = self.golden_hour_started_at?;
        let remaining = started + Duration::minutes(bonuses.golden_hour_minutes) - now;
        (remaining > Duration::zero()).then_some(remaining)
    }

    pub fn modifiers(&self, now: DateTime<Utc>, bonuses: &BonusConfig) -> Modifiers {
        Modifiers {
            night_mode: is_night(now, bonuses),
            golden_hour: self.golden_hour_remaining(now, bonuses).is_some(),
        }
    }

    pub fn streak_badge(&self) -> Option<StreakBadge> {
        if self.current_win_streak >= WIN_BADGE_FROM {
            Some(StreakBadge::WinStreak(self.current_win_streak))
        } else if self.current_lose_streak >= LOSE_BADGE_FROM {
            Some(StreakBadge::LoseStreak(self.current_lose_streak))
        } else {
            None
        }
    }

    pub fn greeting(&self, now: DateTime<Utc>, bonuses: &BonusConfig) -> Greeting {
        if let Some(remaining) = self.golden_hour_remaining(now, bonuses) {
            return Greeting::GoldenHour {
                minutes_left: remaining.num_minutes(),
            };
        }
        if is_night(now, bonuses) {
            return Greeting::Night;
        }
        if self.total_visits == 0 {
            return Greeting::FirstVisit;
        }
        if self.last_session_result < 0 {
            return Greeting::AfterLoss {
                last_result: self.last_session_result,
            };
        }
        if self.last_session_result > 0 {
            return Greeting::AfterWin {
                last_result: self.last_session_result,
            };
        }
        if self.total_visits >= FREQUENT_VISITS {
            return Greeting::Frequent {
                visits: self.total_visits + 1,
            };
        }
        Greeting::Returning
    }
}

/// Night window in UTC hours; wraps past midnight when start > end
pub fn is_night(now: DateTime<Utc>, bonuses: &BonusConfig) -> bool {
    let hour = now.hour();
    if bonuses.night_start_hour > bonuses.night_end_hour {
        hour >= bonuses.night_start_hour || hour < bonuses.night_end_hour
    } else {
        hour >= bonuses.night_start_hour && hour < bonuses.night_end_hour
    }
}
