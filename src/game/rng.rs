//! Uniform random source used by every roll in the game core.
//!
//! Rolls are expressed as `next_f64() * 100 < chance` the same way throughout,
//! so any source producing values in `[0, 1)` can drive combat and loot.

use rand::rngs::{StdRng, ThreadRng};
use rand::Rng;
use std::collections::VecDeque;

pub trait RandomSource {
    /// Next uniform value in `[0, 1)`.
    fn next_f64(&mut self) -> f64;

    /// Uniform index in `0..len`. `len` must be non-zero.
    fn pick_index(&mut self, len: usize) -> usize {
        let idx = (self.next_f64() * len as f64) as usize;
        idx.min(len.saturating_sub(1))
    }

    /// Uniform integer in `min..=max`.
    fn range_inclusive(&mut self, min: u32, max: u32) -> u32 {
        if max <= min {
            return min;
        }
        let span = (max - min + 1) as f64;
        min + ((self.next_f64() * span) as u32).min(max - min)
    }

    /// `true` with `percent` / 100 probability.
    fn chance(&mut self, percent: f64) -> bool {
        self.next_f64() * 100.0 < percent
    }
}

impl RandomSource for StdRng {
    fn next_f64(&mut self) -> f64 {
        self.gen::<f64>()
    }
}

impl RandomSource for ThreadRng {
    fn next_f64(&mut self) -> f64 {
        self.gen::<f64>()
    }
}

/// Replays a fixed list of rolls, then repeats `fallback` forever.
///
/// Lets tests force crits, dodges and drops without hunting for seeds.
#[derive(Debug, Clone)]
pub struct ScriptedRolls {
    rolls: VecDeque<f64>,
    fallback: f64,
}

impl ScriptedRolls {
    pub fn new(rolls: impl IntoIterator<Item = f64>) -> Self {
        Self {
            rolls: rolls.into_iter().collect(),
            fallback: 0.99,
        }
    }

    /// Value returned once the scripted rolls run out.
    pub fn with_fallback(mut self, fallback: f64) -> Self {
        self.fallback = fallback.clamp(0.0, 0.999_999);
        self
    }

    pub fn remaining(&self) -> usize {
        self.rolls.len()
    }
}

impl RandomSource for ScriptedRolls {
    fn next_f64(&mut self) -> f64 {
        self.rolls.pop_front().unwrap_or(self.fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn scripted_rolls_replay_then_fallback() {
        let mut r = ScriptedRolls::new([0.1, 0.2]).with_fallback(0.5);
        assert_eq!(r.next_f64(), 0.1);
        assert_eq!(r.next_f64(), 0.2);
        assert_eq!(r.next_f64(), 0.5);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn pick_index_stays_in_range() {
        let mut r = ScriptedRolls::new([0.0, 0.999_999]);
        assert_eq!(r.pick_index(4), 0);
        assert_eq!(r.pick_index(4), 3);
    }

    #[test]
    fn range_inclusive_covers_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let v = rng.range_inclusive(2, 5);
            assert!((2..=5).contains(&v));
        }
        assert_eq!(rng.range_inclusive(9, 3), 9);
    }
}
