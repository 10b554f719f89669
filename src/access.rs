//! Entry checks run before a session opens or a stake is debited

use crate::config::{CasinoConfig, LimitsConfig};
use crate::cooldown::CooldownManager;
use crate::games::types::GameVariant;
use crate::profile::Profile;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why the gate decided the way it did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessReason {
    Ok,
    SelfBlocked,
    ForcedBreak,
    Cooldown,
    DailyLossLimit,
    DailyGamesLimit,
    NoBalance,
}

impl fmt::Display for AccessReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            AccessReason::Ok => "ok",
            AccessReason::SelfBlocked => "self_blocked",
            AccessReason::ForcedBreak => "forced_break",
            AccessReason::Cooldown => "cooldown",
            AccessReason::DailyLossLimit => "daily_loss_limit",
            AccessReason::DailyGamesLimit => "daily_games_limit",
            AccessReason::NoBalance => "no_balance",
        };
        f.write_str(text)
    }
}

/// Details for rendering the decision
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub until: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_remaining: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seconds_remaining: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loss_streak: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lost_today: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_loss_limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub games_today: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_games_limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_stake: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDecision {
    pub allowed: bool,
    pub reason: AccessReason,
    pub context: AccessContext,
    /// Session the player is in after a successful entry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<u64>,
}

impl AccessDecision {
    fn allow(balance: u64) -> Self {
        Self {
            allowed: true,
            reason: AccessReason::Ok,
            context: AccessContext {
                balance: Some(balance),
                ..Default::default()
            },
            session_id: None,
        }
    }

    fn deny(reason: AccessReason, context: AccessContext) -> Self {
        Self {
            allowed: false,
            reason,
            context,
            session_id: None,
        }
    }
}

/// Ordered entry checks:
/// self-exclusion, forced break, cooldown, daily loss, daily games, balance.
///
/// With `limits.enforce` off only the balance check runs.
#[derive(Debug, Clone)]
pub struct AccessGate {
    limits: LimitsConfig,
    forced_break_after_losses: u32,
    cooldowns: CooldownManager,
}

impl AccessGate {
    pub fn new(config: &CasinoConfig) -> Self {
        Self {
            limits: config.limits.clone(),
            forced_break_after_losses: config.responsible.forced_break_after_losses,
            cooldowns: CooldownManager::new(config.cooldown.clone()),
        }
    }

    /// Pure evaluation; the caller is expected to have rolled daily counters
    pub fn evaluate(
        &self,
        profile: &Profile,
        variant: GameVariant,
        balance: u64,
        now: DateTime<Utc>,
    ) -> AccessDecision {
        if self.limits.enforce {
            if let Some(until) = profile.self_excluded_until.filter(|until| *until > now) {
                return AccessDecision::deny(
                    AccessReason::SelfBlocked,
                    AccessContext {
                        until: Some(until),
                        days_remaining: Some(days_ceil(until - now)),
                        ..Default::default()
                    },
                );
            }

            if let Some(until) = profile.forced_break_until.filter(|until| *until > now) {
                return AccessDecision::deny(
                    AccessReason::ForcedBreak,
                    AccessContext {
                        until: Some(until),
                        seconds_remaining: Some((until - now).num_seconds().max(0) as u64),
                        loss_streak: Some(self.forced_break_after_losses),
                        ..Default::default()
                    },
                );
            }

            let state = profile.cooldown(variant);
            let check = self.cooldowns.can_play(&state, now);
            if !check.allowed {
                return AccessDecision::deny(
                    AccessReason::Cooldown,
                    AccessContext {
                        until: state.cooldown_until,
                        seconds_remaining: Some(check.seconds_remaining),
                        ..Default::default()
                    },
                );
            }

            if profile.daily_lost >= self.limits.daily_loss_limit {
                return AccessDecision::deny(
                    AccessReason::DailyLossLimit,
                    AccessContext {
                        lost_today: Some(profile.daily_lost),
                        daily_loss_limit: Some(self.limits.daily_loss_limit),
                        ..Default::default()
                    },
                );
            }

            if profile.daily_games >= self.limits.daily_games_limit {
                return AccessDecision::deny(
                    AccessReason::DailyGamesLimit,
                    AccessContext {
                        games_today: Some(profile.daily_games),
                        daily_games_limit: Some(self.limits.daily_games_limit),
                        ..Default::default()
                    },
                );
            }
        }

        if balance < self.limits.min_stake {
            return AccessDecision::deny(
                AccessReason::NoBalance,
                AccessContext {
                    min_stake: Some(self.limits.min_stake),
                    balance: Some(balance),
                    ..Default::default()
                },
            );
        }

        AccessDecision::allow(balance)
    }
}

/// Whole days left, rounded up so a few hours still read as one day
fn days_ceil(remaining: chrono::Duration) -> i64 {
    (remaining.num_seconds() + 86_399) / 86_400
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cooldown::CooldownState;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 1, 14, 0, 0).unwrap()
    }

    fn gate() -> AccessGate {
        AccessGate::new(&CasinoConfig::default())
    }

    #[test]
    fn test_clean_profile_is_allowed() {
        let decision = gate().evaluate(&Profile::new(1, now()), GameVariant::Dice, 1_000, now());
        assert!(decision.allowed);
        assert_eq!(decision.reason, AccessReason::Ok);
        assert_eq!(decision.context.balance, Some(1_000));
    }

    #[test]
    fn test_self_exclusion_wins_over_everything() {
        let mut profile = Profile::new(1, now());
        profile.self_exclude(7, now());
        profile.forced_break_until = Some(now() + Duration::hours(1));
        profile.cooldown_mut(GameVariant::Dice).cooldown_until = Some(now() + Duration::seconds(30));
        profile.daily_lost = 5_000;

        let decision = gate().evaluate(&profile, GameVariant::Dice, 0, now());
        assert!(!decision.allowed);
        assert_eq!(decision.reason, AccessReason::SelfBlocked);
        assert_eq!(decision.context.days_remaining, Some(7));
    }

    #[test]
    fn test_reason_wire_names_match_metric_labels() {
        for reason in [
            AccessReason::Ok,
            AccessReason::SelfBlocked,
            AccessReason::ForcedBreak,
            AccessReason::Cooldown,
            AccessReason::DailyLossLimit,
            AccessReason::DailyGamesLimit,
            AccessReason::NoBalance,
        ] {
            let json = serde_json::to_value(reason).unwrap();
            assert_eq!(json, serde_json::Value::String(reason.to_string()));
        }
        assert_eq!(AccessReason::SelfBlocked.to_string(), "self_blocked");
    }

    #[test]
    fn test_forced_break_before_cooldown() {
        let mut profile = Profile::new(1, now());
        profile.forced_break_until = Some(now() + Duration::minutes(30));
        profile.cooldown_mut(GameVariant::Dice).cooldown_until = Some(now() + Duration::seconds(30));

        let decision = gate().evaluate(&profile, GameVariant::Dice, 1_000, now());
        assert_eq!(decision.reason, AccessReason::ForcedBreak);
        assert_eq!(decision.context.seconds_remaining, Some(1_800));
    }

    #[test]
    fn test_cooldown_reports_seconds_remaining() {
        let mut profile = Profile::new(1, now());
        *profile.cooldown_mut(GameVariant::Dice) = CooldownState {
            lose_streak: 3,
            cooldown_until: Some(now() + Duration::seconds(42)),
        };

        let decision = gate().evaluate(&profile, GameVariant::Dice, 1_000, now());
        assert_eq!(decision.reason, AccessReason::Cooldown);
        assert_eq!(decision.context.seconds_remaining, Some(42));
    }

    #[test]
    fn test_daily_limits_in_order() {
        let limits = LimitsConfig::default();
        let mut profile = Profile::new(1, now());
        profile.daily_lost = limits.daily_loss_limit;
        profile.daily_games = limits.daily_games_limit;

        let decision = gate().evaluate(&profile, GameVariant::Dice, 1_000, now());
        assert_eq!(decision.reason, AccessReason::DailyLossLimit);

        profile.daily_lost = 0;
        let decision = gate().evaluate(&profile, GameVariant::Dice, 1_000, now());
        assert_eq!(decision.reason, AccessReason::DailyGamesLimit);
        assert_eq!(decision.context.games_today, Some(limits.daily_games_limit));
    }

    #[test]
    fn test_balance_checked_even_without_enforcement() {
        let gate = AccessGate::new(&CasinoConfig::testing());
        let mut profile = Profile::new(1, now());
        profile.self_exclude(7, now());

        let decision = gate.evaluate(&profile, GameVariant::Dice, 5, now());
        assert_eq!(decision.reason, AccessReason::NoBalance);
        assert_eq!(decision.context.min_stake, Some(10));

        let decision = gate.evaluate(&profile, GameVariant::Dice, 10, now());
        assert!(decision.allowed);
    }
}
