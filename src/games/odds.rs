//! Weight tables for both resolution phases, in basis points

use crate::config::{BonusConfig, OddsConfig, FULL_SCALE_BPS};
use crate::games::types::{Modifiers, Multiplier};
use serde::{Deserialize, Serialize};

/// Phase-one bucket picked by the primary draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase1Bucket {
    /// x1.5 bucket, offered to the player as take/risk
    Intermediate,
    Win(Multiplier),
    Lose,
}

/// Phase-one weights after modifiers; `lose` absorbs the remainder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase1Weights {
    pub x1_5: u32,
    pub x2: u32,
    pub x3: u32,
    pub x5: u32,
    pub lose: u32,
}

impl Phase1Weights {
    pub fn build(odds: &OddsConfig, bonuses: &BonusConfig, modifiers: Modifiers) -> Self {
        let mut x2 = odds.phase1_x2_bps;
        let mut x3 = odds.phase1_x3_bps;
        if modifiers.golden_hour {
            x2 += bonuses.golden_hour_x2_bonus_bps;
        }
        if modifiers.night_mode {
            x3 += bonuses.night_x3_bonus_bps;
        }

        let wins = odds.phase1_x1_5_bps + x2 + x3 + odds.phase1_x5_bps;
        Self {
            x1_5: odds.phase1_x1_5_bps,
            x2,
            x3,
            x5: odds.phase1_x5_bps,
            lose: FULL_SCALE_BPS.saturating_sub(wins),
        }
    }

    /// Map a draw in `0..FULL_SCALE_BPS` to its bucket, walking lose → x1.5 → x2 → x3 → x5
    pub fn bucket(&self, draw: u32) -> Phase1Bucket {
        let table = [
            (self.lose, Phase1Bucket::Lose),
            (self.x1_5, Phase1Bucket::Intermediate),
            (self.x2, Phase1Bucket::Win(Multiplier::X2)),
            (self.x3, Phase1Bucket::Win(Multiplier::X3)),
            (self.x5, Phase1Bucket::Win(Multiplier::X5)),
        ];
        pick(&table, draw).unwrap_or(Phase1Bucket::Lose)
    }

    pub fn total(&self) -> u32 {
        self.x1_5 + self.x2 + self.x3 + self.x5 + self.lose
    }
}

/// Phase-two weights; fixed, no modifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase2Weights {
    pub lose: u32,
    pub x2: u32,
    pub x3: u32,
    pub x5: u32,
}

impl Phase2Weights {
    pub fn build(odds: &OddsConfig) -> Self {
        Self {
            lose: odds.phase2_lose_bps,
            x2: odds.phase2_x2_bps,
            x3: odds.phase2_x3_bps,
            x5: odds.phase2_x5_bps,
        }
    }

    /// `None` means the risk was lost
    pub fn bucket(&self, draw: u32) -> Option<Multiplier> {
        let table = [
            (self.lose, None),
            (self.x2, Some(Multiplier::X2)),
            (self.x3, Some(Multiplier::X3)),
            (self.x5, Some(Multiplier::X5)),
        ];
        pick(&table, draw).flatten()
    }
}

fn pick<T: Copy>(table: &[(u32, T)], draw: u32) -> Option<T> {
    let mut upper = 0u32;
    for (weight, value) in table {
        upper += weight;
        if draw < upper {
            return Some(*value);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_phase1_weights_sum_to_full_scale() {
        let weights = Phase1Weights::build(
            &OddsConfig::default(),
            &BonusConfig::default(),
            Modifiers::default(),
        );
        assert_eq!(weights.lose, 6_520);
        assert_eq!(weights.total(), FULL_SCALE_BPS);
    }

    #[test]
    fn test_bonuses_shift_weight_out_of_lose() {
        // (night, golden hour) -> (x2, x3, lose)
        let cases = [
            (false, false, 900, 300, 6_520),
            (true, false, 900, 400, 6_420),
            (false, true, 1_200, 300, 6_220),
            (true, true, 1_200, 400, 6_120),
        ];

        for (night_mode, golden_hour, x2, x3, lose) in cases {
            let weights = Phase1Weights::build(
                &OddsConfig::default(),
                &BonusConfig::default(),
                Modifiers {
                    night_mode,
                    golden_hour,
                },
            );
            assert_eq!(weights.x1_5, 2_200);
            assert_eq!(weights.x2, x2);
            assert_eq!(weights.x3, x3);
            assert_eq!(weights.x5, 80);
            assert_eq!(weights.lose, lose);
            assert_eq!(weights.total(), FULL_SCALE_BPS);
        }
    }

    #[test]
    fn test_phase1_bucket_boundaries() {
        let weights = Phase1Weights::build(
            &OddsConfig::default(),
            &BonusConfig::default(),
            Modifiers::default(),
        );
        assert_eq!(weights.bucket(0), Phase1Bucket::Lose);
        assert_eq!(weights.bucket(6_519), Phase1Bucket::Lose);
        assert_eq!(weights.bucket(6_520), Phase1Bucket::Intermediate);
        assert_eq!(weights.bucket(8_719), Phase1Bucket::Intermediate);
        assert_eq!(weights.bucket(8_720), Phase1Bucket::Win(Multiplier::X2));
        assert_eq!(weights.bucket(9_620), Phase1Bucket::Win(Multiplier::X3));
        assert_eq!(weights.bucket(9_920), Phase1Bucket::Win(Multiplier::X5));
        assert_eq!(weights.bucket(9_999), Phase1Bucket::Win(Multiplier::X5));
    }

    #[test]
    fn test_phase2_bucket_boundaries() {
        let weights = Phase2Weights::build(&OddsConfig::default());
        assert_eq!(weights.bucket(0), None);
        assert_eq!(weights.bucket(5_999), None);
        assert_eq!(weights.bucket(6_000), Some(Multiplier::X2));
        assert_eq!(weights.bucket(9_000), Some(Multiplier::X3));
        assert_eq!(weights.bucket(9_999), Some(Multiplier::X5));
    }
}
