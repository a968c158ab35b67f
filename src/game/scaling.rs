//! Progression-level stat scaling.
//!
//! Both curves share one stepped accumulator: each level adds the current step
//! `x`; every fifth level also adds a bonus `z` and then grows `x` and `z` by the
//! curve's increment. Levels below 1 are unscaled.

/// Parameters for one scaling curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleCurve {
    /// Initial bonus added at the first breakpoint.
    pub bonus: f64,
    /// Amount `x` and `z` grow by after each breakpoint.
    pub increment: f64,
}

/// Breakpoint cadence in levels.
pub const BREAKPOINT_EVERY: u32 = 5;

pub const HP_CURVE: ScaleCurve = ScaleCurve {
    bonus: 5.0,
    increment: 0.5,
};

pub const ATK_CURVE: ScaleCurve = ScaleCurve {
    bonus: 1.0,
    increment: 0.25,
};

impl ScaleCurve {
    /// Closed form of the accumulator, so any `i64` level is constant time.
    pub fn multiplier(&self, level: i64) -> f64 {
        if level < 1 {
            return 1.0;
        }
        let every = BREAKPOINT_EVERY as i64;
        // completed breakpoints, then levels into the current block
        let k = (level / every) as f64;
        let rest = (level % every) as f64;
        let blocks = k * (every as f64 + self.bonus)
            + self.increment * (every as f64 + 1.0) * k * (k - 1.0) / 2.0;
        blocks + rest * (1.0 + k * self.increment)
    }
}

/// HP multiplier for a world level / adventure rank.
pub fn hp_scale_multiplier(level: i64) -> f64 {
    HP_CURVE.multiplier(level)
}

/// Attack multiplier for a world level / adventure rank.
pub fn atk_scale_multiplier(level: i64) -> f64 {
    ATK_CURVE.multiplier(level)
}
