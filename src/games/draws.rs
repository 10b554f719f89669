//! Randomness seam for the resolver and the cooldown manager

use crate::config::FULL_SCALE_BPS;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::collections::VecDeque;

/// Source of uniform draws
pub trait DrawSource: Send {
    /// Uniform draw in `0..FULL_SCALE_BPS`
    fn draw_bps(&mut self) -> u32;

    /// Uniform draw in `min..=max`
    fn draw_range(&mut self, min: u64, max: u64) -> u64;
}

/// Production draws backed by a seeded standard RNG
pub struct RandomDraws {
    rng: StdRng,
}

impl RandomDraws {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl DrawSource for RandomDraws {
    fn draw_bps(&mut self) -> u32 {
        self.rng.gen_range(0..FULL_SCALE_BPS)
    }

    fn draw_range(&mut self, min: u64, max: u64) -> u64 {
        if min >= max {
            return min;
        }
        self.rng.gen_range(min..=max)
    }
}

/// Replays queued draws, then falls back to a seeded RNG.
///
/// A phase-one loss consumes three basis-point draws (bucket, jackpot, near
/// miss); every other phase-one bucket and every phase-two roll consumes one.
pub struct ScriptedDraws {
    bps: VecDeque<u32>,
    ranges: VecDeque<u64>,
    fallback: RandomDraws,
}

impl ScriptedDraws {
    pub fn new() -> Self {
        Self {
            bps: VecDeque::new(),
            ranges: VecDeque::new(),
            fallback: RandomDraws::seeded(7),
        }
    }

    pub fn with_bps<I: IntoIterator<Item = u32>>(mut self, draws: I) -> Self {
        self.bps.extend(draws);
        self
    }

    pub fn with_ranges<I: IntoIterator<Item = u64>>(mut self, draws: I) -> Self {
        self.ranges.extend(draws);
        self
    }

    pub fn remaining(&self) -> usize {
        self.bps.len() + self.ranges.len()
    }
}

impl Default for ScriptedDraws {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawSource for ScriptedDraws {
    fn draw_bps(&mut self) -> u32 {
        match self.bps.pop_front() {
            Some(draw) => draw.min(FULL_SCALE_BPS - 1),
            None => self.fallback.draw_bps(),
        }
    }

    fn draw_range(&mut self, min: u64, max: u64) -> u64 {
        match self.ranges.pop_front() {
            Some(draw) => draw.clamp(min, max.max(min)),
            None => self.fallback.draw_range(min, max),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_draws_stay_in_range() {
        let mut draws = RandomDraws::seeded(42);
        for _ in 0..1_000 {
            assert!(draws.draw_bps() < FULL_SCALE_BPS);
            let secs = draws.draw_range(30, 60);
            assert!((30..=60).contains(&secs));
        }
        assert_eq!(draws.draw_range(5, 5), 5);
    }

    #[test]
    fn test_scripted_draws_replay_then_fall_back() {
        let mut draws = ScriptedDraws::new().with_bps([10, 20_000]).with_ranges([45, 5]);

        assert_eq!(draws.draw_bps(), 10);
        assert_eq!(draws.draw_bps(), FULL_SCALE_BPS - 1);
        assert_eq!(draws.draw_range(30, 60), 45);
        // Out-of-band scripted values are clamped into the band
        assert_eq!(draws.draw_range(30, 60), 30);
        assert_eq!(draws.remaining(), 0);
        assert!(draws.draw_bps() < FULL_SCALE_BPS);
    }
}
