//! Directional Label Generation
//!
//! Converts continuous outputs into tri-state direction labels
//! (increase / decrease / no change) for classification models.
//!
//! # Overview
//!
//! For each output column and each adjacent row pair `(t-1, t)` two masks are
//! computed from `delta = v[t] - v[t-1]`:
//!
//! ```text
//! abs_mask = sign(delta)            if |delta| >= min_delta          else 0
//! pct_mask = sign(delta / |v[t-1]|) if |delta / |v[t-1]|| >= min_pct else 0
//! ```
//!
//! The percentage divisor is the magnitude of the prior value (falling back
//! to `1` when that is zero or non-finite), so both masks always share the
//! sign of `delta` whenever both are non-zero.
//!
//! The masks are then combined by a [`CombineRule`]:
//!
//! | abs \ pct | -1 | 0 | +1 |
//! |-----------|----|---|----|
//! | **Both**: -1 | -1 | 0 | 0 |
//! | **Both**: 0  |  0 | 0 | 0 |
//! | **Both**: +1 |  0 | 0 | +1 |
//! | **Either**: -1 | -1 | -1 | 0 |
//! | **Either**: 0  | -1 |  0 | +1 |
//! | **Either**: +1 |  0 | +1 | +1 |
//!
//! Opposite-sign pairs cannot be produced by the masks above; both rules map
//! them to no-change rather than picking a side.
//!
//! # Example
//!
//! ```
//! use grid_sequence_prep::labeling::{CombineRule, TrendLabel};
//!
//! let rule = CombineRule::Both;
//! assert_eq!(rule.combine(TrendLabel::Up, TrendLabel::Stable), TrendLabel::Stable);
//! assert_eq!(CombineRule::Either.combine(TrendLabel::Up, TrendLabel::Stable), TrendLabel::Up);
//! ```

pub mod discretizer;

pub use discretizer::{
    regression_to_classification, DiscretizeConfig, DiscretizedData, Discretizer, MaskPair,
};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Core Types
// ============================================================================

/// Direction of change between adjacent timesteps.
///
/// # Example
///
/// ```
/// use grid_sequence_prep::labeling::TrendLabel;
///
/// let label = TrendLabel::Up;
/// assert_eq!(label.as_int(), 1);
/// assert_eq!(label.as_f64(), 1.0);
/// assert_eq!(TrendLabel::from_sign(label.as_f64()), label);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrendLabel {
    /// Decrease
    Down = -1,

    /// No change (within thresholds)
    Stable = 0,

    /// Increase
    Up = 1,
}

impl TrendLabel {
    /// Convert to integer representation: -1, 0, 1.
    #[inline]
    pub fn as_int(&self) -> i8 {
        *self as i8
    }

    /// Value written into label tables.
    #[inline]
    pub fn as_f64(&self) -> f64 {
        f64::from(self.as_int())
    }

    /// Sign of `x`; zero and NaN are `Stable`.
    #[inline]
    pub fn from_sign(x: f64) -> Self {
        if x > 0.0 {
            TrendLabel::Up
        } else if x < 0.0 {
            TrendLabel::Down
        } else {
            TrendLabel::Stable
        }
    }

    /// True for `Up` or `Down`.
    #[inline]
    pub fn is_directional(&self) -> bool {
        !matches!(self, TrendLabel::Stable)
    }

    /// Get the string name of this label.
    pub fn name(&self) -> &'static str {
        match self {
            TrendLabel::Down => "Down",
            TrendLabel::Stable => "Stable",
            TrendLabel::Up => "Up",
        }
    }
}

impl std::fmt::Display for TrendLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Direction mask for one value against its threshold.
///
/// `sign(x)` when `|x| >= threshold`, otherwise `Stable`. NaN is `Stable`.
#[inline]
pub fn threshold_mask(x: f64, threshold: f64) -> TrendLabel {
    if x.is_nan() || x.abs() < threshold {
        TrendLabel::Stable
    } else {
        TrendLabel::from_sign(x)
    }
}

/// How the absolute and percentage masks combine into one label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombineRule {
    /// Both masks must independently agree on a direction (strict AND).
    Both,

    /// Either mask alone is enough (sign-preserving OR).
    Either,
}

impl CombineRule {
    /// Rule for the `require_both` flag.
    pub fn from_require_both(require_both: bool) -> Self {
        if require_both {
            CombineRule::Both
        } else {
            CombineRule::Either
        }
    }

    /// Combine two masks according to the truth table in the module docs.
    pub fn combine(&self, abs_mask: TrendLabel, pct_mask: TrendLabel) -> TrendLabel {
        use TrendLabel::*;
        match (self, abs_mask, pct_mask) {
            (CombineRule::Both, Up, Up) => Up,
            (CombineRule::Both, Down, Down) => Down,
            (CombineRule::Both, _, _) => Stable,

            (CombineRule::Either, Stable, other) | (CombineRule::Either, other, Stable) => other,
            (CombineRule::Either, a, b) if a == b => a,
            (CombineRule::Either, _, _) => Stable,
        }
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Class counts over a label table.
///
/// # Example
///
/// ```
/// use grid_sequence_prep::labeling::{LabelStats, TrendLabel};
///
/// let stats = LabelStats::from_labels([TrendLabel::Up, TrendLabel::Down, TrendLabel::Stable]);
/// assert_eq!(stats.total, 3);
/// assert_eq!(stats.distribution()["Up"], 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelStats {
    /// Total number of labels
    pub total: usize,

    /// Number of Up labels
    pub up_count: usize,

    /// Number of Down labels
    pub down_count: usize,

    /// Number of Stable labels
    pub stable_count: usize,
}

impl LabelStats {
    /// Count labels.
    pub fn from_labels<I: IntoIterator<Item = TrendLabel>>(labels: I) -> Self {
        let mut stats = Self::default();
        for label in labels {
            stats.record(label);
        }
        stats
    }

    /// Add one label.
    #[inline]
    pub fn record(&mut self, label: TrendLabel) {
        self.total += 1;
        match label {
            TrendLabel::Up => self.up_count += 1,
            TrendLabel::Down => self.down_count += 1,
            TrendLabel::Stable => self.stable_count += 1,
        }
    }

    /// Counts keyed by label name, for metadata.
    pub fn distribution(&self) -> BTreeMap<String, usize> {
        BTreeMap::from([
            ("Down".to_string(), self.down_count),
            ("Stable".to_string(), self.stable_count),
            ("Up".to_string(), self.up_count),
        ])
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use TrendLabel::*;

    const ALL: [TrendLabel; 3] = [Down, Stable, Up];

    #[test]
    fn test_trend_label_sign_round_trip() {
        for label in ALL {
            assert_eq!(TrendLabel::from_sign(label.as_f64()), label);
        }
        assert_eq!(TrendLabel::from_sign(f64::NAN), Stable);
        assert_eq!(Down.as_f64(), -1.0);
    }

    #[test]
    fn test_threshold_mask() {
        assert_eq!(threshold_mask(5.0, 1.0), Up);
        assert_eq!(threshold_mask(-1.0, 1.0), Down); // boundary is inclusive
        assert_eq!(threshold_mask(0.5, 1.0), Stable);
        assert_eq!(threshold_mask(f64::NAN, 1.0), Stable);
        assert_eq!(threshold_mask(f64::NEG_INFINITY, 1.0), Down);
    }

    #[test]
    fn test_combine_both_truth_table() {
        let rule = CombineRule::Both;
        for a in ALL {
            for b in ALL {
                let expected = if a == b { a } else { Stable };
                assert_eq!(rule.combine(a, b), expected, "Both({a}, {b})");
            }
        }
    }

    #[test]
    fn test_combine_either_truth_table() {
        let rule = CombineRule::Either;
        assert_eq!(rule.combine(Stable, Stable), Stable);
        assert_eq!(rule.combine(Up, Stable), Up);
        assert_eq!(rule.combine(Stable, Down), Down);
        assert_eq!(rule.combine(Up, Up), Up);
        assert_eq!(rule.combine(Down, Down), Down);
        // Unreachable from real masks, but never yields a mixed sign
        assert_eq!(rule.combine(Up, Down), Stable);
    }

    #[test]
    fn test_label_stats() {
        let stats = LabelStats::from_labels([Up, Up, Down, Stable]);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.up_count, 2);
        assert_eq!(stats.distribution()["Down"], 1);
        assert_eq!(stats.distribution()["Stable"], 1);
        assert_eq!(LabelStats::default().distribution().values().sum::<usize>(), 0);
    }
}
