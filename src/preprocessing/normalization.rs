//! Leakage-safe scaling of reshaped inputs.
//!
//! Grid tensors are scaled by a single scalar divisor. The divisor is fitted
//! once, on the training partition, as the maximum absolute spatial value:
//!
//! ```text
//! divisor    = max |x|  over spatial cells of the training inputs
//! normalized = x / divisor
//! ```
//!
//! The fitted value is then threaded through explicitly and reused for every
//! later partition. It is never re-derived from test data unless the caller
//! asks for that by passing [`Divisor::Compute`] again.
//!
//! # Persisting
//!
//! [`NormalizationParams`] records the fitted divisor as JSON so a later run
//! (or the training side) can apply exactly the same scale:
//!
//! ```ignore
//! let params = NormalizationParams::new(output.divisor, "train", n_cells);
//! params.save_json("out/normalization.json")?;
//!
//! let reloaded = NormalizationParams::load_json("out/normalization.json")?;
//! let divisor = reloaded.as_divisor()?;
//! ```

use crate::error::{PrepError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Trait for scalar normalization strategies.
///
/// Implementers accumulate state from observed values with `update`, then
/// map values with `normalize`.
pub trait Normalizer: Send + Sync {
    /// Update normalizer state with a new value.
    fn update(&mut self, value: f64);

    /// Normalize a single value.
    fn normalize(&self, value: f64) -> f64;

    /// Normalize a batch of values.
    fn normalize_batch(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|&v| self.normalize(v)).collect()
    }

    /// Reset normalizer state.
    fn reset(&mut self);

    /// Check if normalizer has seen enough data to normalize.
    fn is_ready(&self) -> bool {
        true
    }
}

// =============================================================================
// Max-Abs Normalizer
// =============================================================================

/// Divides by the largest absolute value observed.
///
/// Non-finite values are skipped by `update`. If nothing non-zero has been
/// observed the scale is `1`, so normalization is the identity.
///
/// # Example
///
/// ```
/// use grid_sequence_prep::preprocessing::{MaxAbsNormalizer, Normalizer};
///
/// let mut norm = MaxAbsNormalizer::new();
/// for v in [3.0, -8.0, 4.0] {
///     norm.update(v);
/// }
/// assert_eq!(norm.max_abs(), 8.0);
/// assert_eq!(norm.normalize(-4.0), -0.5);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MaxAbsNormalizer {
    max_abs: f64,
    count: u64,
}

impl MaxAbsNormalizer {
    /// Create an empty normalizer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit from an iterator of values.
    pub fn fit<I: IntoIterator<Item = f64>>(values: I) -> Self {
        let mut norm = Self::new();
        values.into_iter().for_each(|v| norm.update(v));
        norm
    }

    /// Largest absolute finite value seen (zero before any update).
    pub fn max_abs(&self) -> f64 {
        self.max_abs
    }

    /// Number of finite values seen.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// The divisor this normalizer applies: `max_abs`, or `1` if that is zero.
    pub fn scale(&self) -> f64 {
        if self.max_abs > 0.0 {
            self.max_abs
        } else {
            1.0
        }
    }
}

impl Normalizer for MaxAbsNormalizer {
    fn update(&mut self, value: f64) {
        if value.is_finite() {
            self.max_abs = self.max_abs.max(value.abs());
            self.count += 1;
        }
    }

    #[inline]
    fn normalize(&self, value: f64) -> f64 {
        value / self.scale()
    }

    fn reset(&mut self) {
        *self = Self::default();
    }

    fn is_ready(&self) -> bool {
        self.count > 0
    }
}

// =============================================================================
// Divisor
// =============================================================================

/// How the reshaper obtains its normalization divisor.
///
/// # Example
///
/// ```
/// use grid_sequence_prep::preprocessing::Divisor;
///
/// assert_eq!(Divisor::from_raw(0.0), Divisor::Compute);
/// assert_eq!(Divisor::from_raw(12.5), Divisor::Fixed(12.5));
/// assert_eq!(Divisor::Compute.resolve([2.0, -6.0]).unwrap(), 6.0);
/// assert_eq!(Divisor::Fixed(4.0).resolve([100.0]).unwrap(), 4.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Divisor {
    /// Fit max-abs on the data being reshaped and report the result
    Compute,

    /// Reuse a previously fitted value
    Fixed(f64),
}

impl Divisor {
    /// Interpret a raw scalar where `0` means "compute".
    pub fn from_raw(value: f64) -> Self {
        if value == 0.0 {
            Self::Compute
        } else {
            Self::Fixed(value)
        }
    }

    /// True for [`Divisor::Compute`].
    pub fn is_compute(&self) -> bool {
        matches!(self, Self::Compute)
    }

    /// Check a fixed divisor is usable.
    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::Compute => Ok(()),
            Self::Fixed(d) if d.is_finite() && d != 0.0 => Ok(()),
            Self::Fixed(d) => Err(PrepError::invalid(format!(
                "normalization divisor must be finite and non-zero, got {d}"
            ))),
        }
    }

    /// Resolve to a concrete divisor, fitting on `values` if required.
    ///
    /// A computed divisor of zero (all-zero data) becomes `1`.
    pub fn resolve<I: IntoIterator<Item = f64>>(&self, values: I) -> Result<f64> {
        self.validate()?;
        match *self {
            Self::Fixed(d) => Ok(d),
            Self::Compute => {
                let fitted = MaxAbsNormalizer::fit(values);
                if fitted.max_abs() == 0.0 {
                    log::warn!(
                        "All {} spatial values are zero; using divisor 1",
                        fitted.count()
                    );
                }
                Ok(fitted.scale())
            }
        }
    }
}

impl Default for Divisor {
    fn default() -> Self {
        Self::Compute
    }
}

impl From<Option<f64>> for Divisor {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Self::Compute, Self::from_raw)
    }
}

// =============================================================================
// Persisted parameters
// =============================================================================

/// A fitted divisor and where it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationParams {
    /// Strategy name (always `"max_abs"`)
    pub method: String,

    /// Divisor applied to every tensor value
    pub divisor: f64,

    /// Partition the divisor was fitted on
    pub fitted_on: String,

    /// Number of spatial values seen while fitting
    pub sample_count: usize,
}

impl NormalizationParams {
    /// Record a max-abs divisor.
    pub fn new(divisor: f64, fitted_on: impl Into<String>, sample_count: usize) -> Self {
        Self {
            method: "max_abs".to_string(),
            divisor,
            fitted_on: fitted_on.into(),
            sample_count,
        }
    }

    /// The stored divisor as a fixed [`Divisor`].
    pub fn as_divisor(&self) -> Result<Divisor> {
        let divisor = Divisor::Fixed(self.divisor);
        divisor.validate()?;
        Ok(divisor)
    }

    /// Write as pretty JSON.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref())?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    /// Read from JSON.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let params: Self = serde_json::from_reader(BufReader::new(file))?;
        params.as_divisor()?;
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_abs_skips_non_finite() {
        let norm = MaxAbsNormalizer::fit([1.0, f64::NAN, -3.0, f64::INFINITY]);
        assert_eq!(norm.max_abs(), 3.0);
        assert_eq!(norm.count(), 2);
        assert!(norm.is_ready());
    }

    #[test]
    fn test_max_abs_reset() {
        let mut norm = MaxAbsNormalizer::fit([5.0]);
        norm.reset();
        assert!(!norm.is_ready());
        assert_eq!(norm.scale(), 1.0);
        assert_eq!(norm.normalize_batch(&[2.0, -2.0]), vec![2.0, -2.0]);
    }

    #[test]
    fn test_compute_all_zero_falls_back_to_one() {
        assert_eq!(Divisor::Compute.resolve([0.0, 0.0]).unwrap(), 1.0);
        assert_eq!(Divisor::Compute.resolve(std::iter::empty()).unwrap(), 1.0);
    }

    #[test]
    fn test_fixed_divisor_validation() {
        assert!(Divisor::Fixed(f64::NAN).validate().is_err());
        assert!(Divisor::Fixed(f64::INFINITY).resolve([1.0]).is_err());
        assert!(Divisor::Fixed(-2.0).validate().is_ok());
    }

    #[test]
    fn test_from_option() {
        assert_eq!(Divisor::from(None), Divisor::Compute);
        assert_eq!(Divisor::from(Some(0.0)), Divisor::Compute);
        assert_eq!(Divisor::from(Some(3.0)), Divisor::Fixed(3.0));
    }

    #[test]
    fn test_params_json_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("norm.json");

        let params = NormalizationParams::new(42.0, "train", 1200);
        params.save_json(&path).unwrap();
        let loaded = NormalizationParams::load_json(&path).unwrap();

        assert_eq!(loaded, params);
        assert_eq!(loaded.as_divisor().unwrap(), Divisor::Fixed(42.0));
    }

    #[test]
    fn test_params_reject_zero_divisor_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("norm.json");
        NormalizationParams::new(0.0, "train", 0).save_json(&path).unwrap();
        assert!(NormalizationParams::load_json(&path).is_err());
    }
}
