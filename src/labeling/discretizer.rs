//! Regression-to-classification discretization of output tables.
//!
//! The first row of any delta series has no predecessor, so both the input
//! and label tables come back one row shorter than they went in. Row
//! indices travel with the rows, keeping inputs and labels aligned.

use super::{threshold_mask, CombineRule, LabelStats, TrendLabel};
use crate::error::{PrepError, Result};
use crate::table::Table;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Thresholds for direction labeling.
///
/// # Example
///
/// ```
/// use grid_sequence_prep::labeling::DiscretizeConfig;
///
/// let config = DiscretizeConfig::default();
/// assert_eq!(config.min_delta, 1.0);
/// assert_eq!(config.min_delta_pct, 0.10);
/// assert!(config.require_both);
/// assert!(DiscretizeConfig::new(0.0, 0.1, true).validate().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiscretizeConfig {
    /// Minimum absolute change to count as a move (> 0)
    pub min_delta: f64,

    /// Minimum relative change to count as a move, in (0, 1]
    pub min_delta_pct: f64,

    /// Require both thresholds to agree (strict AND) instead of either one
    pub require_both: bool,
}

impl DiscretizeConfig {
    /// Create a configuration.
    pub fn new(min_delta: f64, min_delta_pct: f64, require_both: bool) -> Self {
        Self {
            min_delta,
            min_delta_pct,
            require_both,
        }
    }

    /// Combination rule implied by `require_both`.
    pub fn rule(&self) -> CombineRule {
        CombineRule::from_require_both(self.require_both)
    }

    /// Check thresholds are in range.
    pub fn validate(&self) -> Result<()> {
        if !(self.min_delta > 0.0 && self.min_delta.is_finite()) {
            return Err(PrepError::invalid(format!(
                "min_delta must be a positive finite number, got {}",
                self.min_delta
            )));
        }
        if !(self.min_delta_pct > 0.0 && self.min_delta_pct <= 1.0) {
            return Err(PrepError::invalid(format!(
                "min_delta_pct must lie in (0, 1], got {}",
                self.min_delta_pct
            )));
        }
        Ok(())
    }
}

impl Default for DiscretizeConfig {
    fn default() -> Self {
        Self::new(1.0, 0.10, true)
    }
}

/// The two masks for one cell, before combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaskPair {
    /// Absolute-threshold mask
    pub abs: TrendLabel,
    /// Percentage-threshold mask
    pub pct: TrendLabel,
}

/// Output of [`Discretizer::discretize`].
#[derive(Debug, Clone)]
pub struct DiscretizedData {
    /// Inputs without their first row
    pub inputs: Table,

    /// Labels (-1, 0, 1) with the output table's columns, without the first row
    pub labels: Table,

    /// Class counts over all label cells
    pub stats: LabelStats,
}

/// Converts continuous outputs into direction labels.
#[derive(Debug, Clone)]
pub struct Discretizer {
    config: DiscretizeConfig,
}

impl Discretizer {
    /// Create a discretizer, validating thresholds.
    pub fn new(config: DiscretizeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Get the configuration.
    pub fn config(&self) -> &DiscretizeConfig {
        &self.config
    }

    /// Masks for the step `prev → curr`.
    ///
    /// The percentage divisor is `|prev|`, replaced by `1` when zero or
    /// non-finite, so the percentage mask degrades to the raw delta.
    #[inline]
    pub fn masks(&self, prev: f64, curr: f64) -> MaskPair {
        let delta = curr - prev;
        let divisor = match prev.abs() {
            d if d.is_finite() && d != 0.0 => d,
            _ => 1.0,
        };
        MaskPair {
            abs: threshold_mask(delta, self.config.min_delta),
            pct: threshold_mask(delta / divisor, self.config.min_delta_pct),
        }
    }

    /// Label for the step `prev → curr`.
    #[inline]
    pub fn label(&self, prev: f64, curr: f64) -> TrendLabel {
        let masks = self.masks(prev, curr);
        self.config.rule().combine(masks.abs, masks.pct)
    }

    /// Discretize a time-ordered output table.
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` if `inputs` and `outputs` differ in row count.
    pub fn discretize(&self, inputs: &Table, outputs: &Table) -> Result<DiscretizedData> {
        if inputs.n_rows() != outputs.n_rows() {
            return Err(PrepError::shape_mismatch(
                "discretize input/output rows",
                inputs.n_rows(),
                outputs.n_rows(),
            ));
        }

        let n_rows = outputs.n_rows().saturating_sub(1);
        let values = outputs.values();
        let mut labels = Array2::<f64>::zeros((n_rows, outputs.n_cols()));
        let mut stats = LabelStats::default();
        let rule = self.config.rule();

        for (j, column) in values.columns().into_iter().enumerate() {
            for t in 0..n_rows {
                let masks = self.masks(column[t], column[t + 1]);
                let label = rule.combine(masks.abs, masks.pct);
                labels[[t, j]] = label.as_f64();
                stats.record(label);
            }
        }

        let start = outputs.n_rows().min(1);
        let labels = Table::with_index(
            outputs.columns().to_vec(),
            labels,
            outputs.index()[start..].to_vec(),
        )?;

        log::debug!(
            "Discretized {} rows × {} columns: {} up, {} down, {} stable",
            n_rows,
            outputs.n_cols(),
            stats.up_count,
            stats.down_count,
            stats.stable_count
        );

        Ok(DiscretizedData {
            inputs: inputs.slice_rows(1..inputs.n_rows()),
            labels,
            stats,
        })
    }
}

/// Discretize `outputs` into direction labels.
///
/// Returns `(inputs[1..], labels)`.
///
/// # Example
///
/// ```
/// use grid_sequence_prep::labeling::{regression_to_classification, DiscretizeConfig};
/// use grid_sequence_prep::Table;
///
/// let inputs = Table::from_raw_columns(vec![("x", vec![0.0, 0.0, 0.0])]).unwrap();
/// let outputs = Table::from_raw_columns(vec![("y", vec![100.0, 105.0, 90.0])]).unwrap();
///
/// let (inputs, labels) =
///     regression_to_classification(&inputs, &outputs, &DiscretizeConfig::default()).unwrap();
/// assert_eq!(inputs.n_rows(), 2);
/// assert_eq!(labels.values().column(0).to_vec(), vec![0.0, -1.0]);
/// ```
pub fn regression_to_classification(
    inputs: &Table,
    outputs: &Table,
    config: &DiscretizeConfig,
) -> Result<(Table, Table)> {
    let data = Discretizer::new(*config)?.discretize(inputs, outputs)?;
    Ok((data.inputs, data.labels))
}

#[cfg(test)]
mod tests {
    use super::*;
    use TrendLabel::*;

    fn single(values: Vec<f64>) -> Table {
        Table::from_raw_columns(vec![("y", values)]).unwrap()
    }

    #[test]
    fn test_reference_series_strict_and() {
        let d = Discretizer::new(DiscretizeConfig::new(1.0, 0.10, true)).unwrap();

        assert_eq!(d.masks(100.0, 105.0), MaskPair { abs: Up, pct: Stable });
        assert_eq!(d.masks(105.0, 90.0), MaskPair { abs: Down, pct: Down });

        let out = single(vec![100.0, 105.0, 90.0]);
        let data = d.discretize(&out, &out).unwrap();
        assert_eq!(data.labels.values().column(0).to_vec(), vec![0.0, -1.0]);
        assert_eq!(data.labels.index(), &[1, 2]);
        assert_eq!(data.stats.down_count, 1);
        assert_eq!(data.stats.stable_count, 1);
    }

    #[test]
    fn test_reference_series_either() {
        let d = Discretizer::new(DiscretizeConfig::new(1.0, 0.10, false)).unwrap();
        let out = single(vec![100.0, 105.0, 90.0]);
        let data = d.discretize(&out, &out).unwrap();
        assert_eq!(data.labels.values().column(0).to_vec(), vec![1.0, -1.0]);
    }

    #[test]
    fn test_zero_prior_uses_unit_divisor() {
        let d = Discretizer::new(DiscretizeConfig::new(10.0, 0.5, false)).unwrap();
        // |delta| = 0.6 < 10 but 0.6 / 1 >= 0.5
        assert_eq!(d.masks(0.0, 0.6), MaskPair { abs: Stable, pct: Up });
        assert_eq!(d.masks(f64::INFINITY, 1.0).abs, Down);
    }

    #[test]
    fn test_nan_delta_is_stable() {
        let d = Discretizer::new(DiscretizeConfig::default()).unwrap();
        assert_eq!(d.label(f64::NAN, 5.0), Stable);
        assert_eq!(d.label(5.0, f64::NAN), Stable);
    }

    #[test]
    fn test_negative_prior_keeps_sign() {
        let d = Discretizer::new(DiscretizeConfig::new(1.0, 0.1, true)).unwrap();
        // -100 → -50 is an increase of 50%; the divisor is |prior|
        assert_eq!(d.masks(-100.0, -50.0), MaskPair { abs: Up, pct: Up });
    }

    #[test]
    fn test_row_mismatch() {
        let d = Discretizer::new(DiscretizeConfig::default()).unwrap();
        let err = d
            .discretize(&single(vec![1.0, 2.0]), &single(vec![1.0, 2.0, 3.0]))
            .unwrap_err();
        assert!(matches!(err, PrepError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_invalid_thresholds() {
        assert!(Discretizer::new(DiscretizeConfig::new(-1.0, 0.1, true)).is_err());
        assert!(Discretizer::new(DiscretizeConfig::new(1.0, 0.0, true)).is_err());
        assert!(Discretizer::new(DiscretizeConfig::new(1.0, 1.5, true)).is_err());
        assert!(Discretizer::new(DiscretizeConfig::new(1.0, 1.0, true)).is_ok());
    }

    #[test]
    fn test_empty_table() {
        let d = Discretizer::new(DiscretizeConfig::default()).unwrap();
        let empty = single(vec![]);
        let data = d.discretize(&empty, &empty).unwrap();
        assert_eq!(data.labels.n_rows(), 0);
        assert_eq!(data.inputs.n_rows(), 0);
    }
}
