//! Two-phase bet resolution

use crate::config::{BonusConfig, OddsConfig};
use crate::games::draws::DrawSource;
use crate::games::odds::{Phase1Bucket, Phase1Weights, Phase2Weights};
use crate::games::types::{Modifiers, Multiplier, PendingWager};

/// What the first draw decided
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase1Roll {
    /// Stake worth `value` now, awaiting take or risk
    Intermediate { value: u64 },
    Win { multiplier: Multiplier, payout: u64 },
    /// `jackpot_hit` still has to pass the pool's eligibility check
    Lose { jackpot_hit: bool, near_miss: bool },
}

/// What the risk draw decided
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase2Roll {
    Win { multiplier: Multiplier, payout: u64 },
    Lose,
}

/// Pure resolver over configured odds. Holds no state between calls.
#[derive(Debug, Clone)]
pub struct BetResolver {
    odds: OddsConfig,
    bonuses: BonusConfig,
}

impl BetResolver {
    pub fn new(odds: OddsConfig, bonuses: BonusConfig) -> Self {
        Self { odds, bonuses }
    }

    pub fn phase1_weights(&self, modifiers: Modifiers) -> Phase1Weights {
        Phase1Weights::build(&self.odds, &self.bonuses, modifiers)
    }

    pub fn resolve_phase1(
        &self,
        stake: u64,
        modifiers: Modifiers,
        draws: &mut dyn DrawSource,
    ) -> Phase1Roll {
        let weights = self.phase1_weights(modifiers);
        match weights.bucket(draws.draw_bps()) {
            Phase1Bucket::Intermediate => Phase1Roll::Intermediate {
                value: Multiplier::X1_5.apply(stake),
            },
            Phase1Bucket::Win(multiplier) => Phase1Roll::Win {
                multiplier,
                payout: multiplier.apply(stake),
            },
            Phase1Bucket::Lose => {
                // Both secondary draws are always taken so the draw count per loss is fixed
                let jackpot_hit = draws.draw_bps() < self.odds.jackpot_chance_bps;
                let near_miss = draws.draw_bps() < self.odds.near_miss_chance_bps;
                Phase1Roll::Lose {
                    jackpot_hit,
                    near_miss,
                }
            }
        }
    }

    /// Payouts are computed on the original stake, not the pending value
    pub fn resolve_phase2(&self, pending: &PendingWager, draws: &mut dyn DrawSource) -> Phase2Roll {
        match Phase2Weights::build(&self.odds).bucket(draws.draw_bps()) {
            Some(multiplier) => Phase2Roll::Win {
                multiplier,
                payout: multiplier.apply(pending.stake),
            },
            None => Phase2Roll::Lose,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FULL_SCALE_BPS;
    use crate::games::draws::{RandomDraws, ScriptedDraws};
    use crate::games::types::GameVariant;
    use chrono::Utc;

    fn resolver() -> BetResolver {
        BetResolver::new(OddsConfig::default(), BonusConfig::default())
    }

    fn pending(stake: u64) -> PendingWager {
        PendingWager {
            player_id: 1,
            session_id: None,
            variant: GameVariant::Dice,
            stake,
            value: Multiplier::X1_5.apply(stake),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_intermediate_value() {
        let mut draws = ScriptedDraws::new().with_bps([7_000]);
        let roll = resolver().resolve_phase1(100, Modifiers::default(), &mut draws);
        assert_eq!(roll, Phase1Roll::Intermediate { value: 150 });
    }

    #[test]
    fn test_direct_win_pays_multiplier() {
        let mut draws = ScriptedDraws::new().with_bps([9_700]);
        let roll = resolver().resolve_phase1(40, Modifiers::default(), &mut draws);
        assert_eq!(
            roll,
            Phase1Roll::Win {
                multiplier: Multiplier::X3,
                payout: 120
            }
        );
    }

    #[test]
    fn test_loss_consumes_jackpot_and_near_miss_draws() {
        let mut draws = ScriptedDraws::new().with_bps([100, 5_000, 100]);
        let roll = resolver().resolve_phase1(50, Modifiers::default(), &mut draws);
        assert_eq!(
            roll,
            Phase1Roll::Lose {
                jackpot_hit: false,
                near_miss: true
            }
        );
        assert_eq!(draws.remaining(), 0);

        let mut draws = ScriptedDraws::new().with_bps([6_000, 19, 9_999]);
        let roll = resolver().resolve_phase1(50, Modifiers::default(), &mut draws);
        assert_eq!(
            roll,
            Phase1Roll::Lose {
                jackpot_hit: true,
                near_miss: false
            }
        );
    }

    #[test]
    fn test_golden_hour_shrinks_lose_bucket() {
        let resolver = resolver();
        // 6_519 is the last losing draw without modifiers
        let mut draws = ScriptedDraws::new().with_bps([6_519, 9_999, 9_999]);
        let roll = resolver.resolve_phase1(10, Modifiers::default(), &mut draws);
        assert!(matches!(roll, Phase1Roll::Lose { .. }));

        let mut draws = ScriptedDraws::new().with_bps([6_519]);
        let modifiers = Modifiers {
            night_mode: false,
            golden_hour: true,
        };
        let roll = resolver.resolve_phase1(10, modifiers, &mut draws);
        assert_eq!(roll, Phase1Roll::Intermediate { value: 15 });
    }

    #[test]
    fn test_phase2_uses_original_stake() {
        let mut draws = ScriptedDraws::new().with_bps([9_500, 0]);
        let resolver = resolver();
        let wager = pending(100);

        assert_eq!(
            resolver.resolve_phase2(&wager, &mut draws),
            Phase2Roll::Win {
                multiplier: Multiplier::X3,
                payout: 300
            }
        );
        assert_eq!(resolver.resolve_phase2(&wager, &mut draws), Phase2Roll::Lose);
    }

    #[test]
    fn test_phase1_frequencies_track_weights() {
        let resolver = resolver();
        let mut draws = RandomDraws::seeded(1234);
        let rounds = 200_000u32;
        let mut intermediate = 0u32;
        for _ in 0..rounds {
            if let Phase1Roll::Intermediate { .. } =
                resolver.resolve_phase1(10, Modifiers::default(), &mut draws)
            {
                intermediate += 1;
            }
        }
        let observed_bps = intermediate as f64 * FULL_SCALE_BPS as f64 / rounds as f64;
        assert!((observed_bps - 2_200.0).abs() < 100.0, "observed {observed_bps}");
    }
}
