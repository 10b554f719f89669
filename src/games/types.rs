use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Game variants that keep their own cooldown state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GameVariant {
    Dice,
    // Other casino tables get their own variant and cooldown track
}

impl fmt::Display for GameVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameVariant::Dice => write!(f, "dice"),
        }
    }
}

/// Winning multipliers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Multiplier {
    #[serde(rename = "x1.5")]
    X1_5,
    #[serde(rename = "x2")]
    X2,
    #[serde(rename = "x3")]
    X3,
    #[serde(rename = "x5")]
    X5,
}

impl Multiplier {
    /// Payout for a stake, floored to whole units
    pub fn apply(self, stake: u64) -> u64 {
        match self {
            Multiplier::X1_5 => stake.saturating_mul(3) / 2,
            Multiplier::X2 => stake.saturating_mul(2),
            Multiplier::X3 => stake.saturating_mul(3),
            Multiplier::X5 => stake.saturating_mul(5),
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Multiplier::X1_5 => 1.5,
            Multiplier::X2 => 2.0,
            Multiplier::X3 => 3.0,
            Multiplier::X5 => 5.0,
        }
    }
}

impl fmt::Display for Multiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Multiplier::X1_5 => write!(f, "x1.5"),
            Multiplier::X2 => write!(f, "x2"),
            Multiplier::X3 => write!(f, "x3"),
            Multiplier::X5 => write!(f, "x5"),
        }
    }
}

/// Final outcome of a wager
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Lose,
    /// A loss with a different narrative tag; money-wise identical to `Lose`
    NearMiss,
    Win { multiplier: Multiplier },
    Jackpot { amount: u64 },
}

impl Outcome {
    pub fn is_win(&self) -> bool {
        matches!(self, Outcome::Win { .. } | Outcome::Jackpot { .. })
    }

    /// Stable tag used in metrics and logs
    pub fn tag(&self) -> &'static str {
        match self {
            Outcome::Lose => "lose",
            Outcome::NearMiss => "near_miss",
            Outcome::Win { multiplier: Multiplier::X1_5 } => "win_x1_5",
            Outcome::Win { multiplier: Multiplier::X2 } => "win_x2",
            Outcome::Win { multiplier: Multiplier::X3 } => "win_x3",
            Outcome::Win { multiplier: Multiplier::X5 } => "win_x5",
            Outcome::Jackpot { .. } => "jackpot",
        }
    }

    /// Multiplier recorded for audit; zero for losses and the jackpot
    pub fn multiplier_value(&self) -> f64 {
        match self {
            Outcome::Win { multiplier } => multiplier.as_f64(),
            Outcome::Lose | Outcome::NearMiss | Outcome::Jackpot { .. } => 0.0,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Resolution step of a wager
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    One,
    Two,
}

impl Phase {
    pub fn number(self) -> u8 {
        match self {
            Phase::One => 1,
            Phase::Two => 2,
        }
    }
}

/// Odds modifiers active for one resolution
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Modifiers {
    pub night_mode: bool,
    pub golden_hour: bool,
}

/// Phase-one intermediate result waiting for the player's take/risk decision
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingWager {
    pub player_id: u64,
    pub session_id: Option<u64>,
    pub variant: GameVariant,
    pub stake: u64,
    /// `floor(stake × 1.5)`, paid on take and forfeited on a lost risk
    pub value: u64,
    pub created_at: DateTime<Utc>,
}

/// Which threshold the next loss would cross
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CooldownTier {
    Short,
    Long,
}

/// Finalized wager as reported to the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalResult {
    pub player_id: u64,
    pub record_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<u64>,
    pub outcome: Outcome,
    pub stake: u64,
    /// Amount put on the line by this decision: the stake, or the pending value when risking
    pub at_stake: u64,
    pub payout: u64,
    pub net: i64,
    pub balance: u64,
    pub phase: Phase,
    pub was_risk: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooldown_until: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forced_break_until: Option<DateTime<Utc>>,
    /// Set when one more loss would trigger a cooldown
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_chance: Option<CooldownTier>,
}

/// Response for a placed bet (can be final or awaiting take/risk)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum BetResponse {
    Pending {
        wager: PendingWager,
        balance: u64,
    },
    Final {
        result: FinalResult,
    },
}

/// Immutable audit row, one per finalized wager
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameRecord {
    pub id: u64,
    pub player_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<u64>,
    pub variant: GameVariant,
    pub stake: u64,
    pub outcome: Outcome,
    pub multiplier: f64,
    pub payout: u64,
    pub phase: u8,
    pub was_risk: bool,
    pub near_miss: bool,
    pub created_at: DateTime<Utc>,
}
