//! Unified pipeline for grid sequence preparation.
//!
//! Connects every stage in dependency order:
//!
//! ```text
//! Table → validate → WindowBuilder → partition ─┬─ train → split → prune → discretize → reshape (fit divisor)
//!                                               └─ test  → split → prune → discretize → reshape (train divisor)
//! ```
//!
//! The divisor fitted on the training partition is handed to the test
//! reshape as [`Divisor::Fixed`]; it is never recomputed from test data.
//! Forecast injection drops trailing samples from each tensor, and the
//! matching label rows are dropped with them.
//!
//! # Example
//!
//! ```
//! use grid_sequence_prep::prelude::*;
//!
//! let raw = Table::from_raw_columns(vec![
//!     ("c0", (0..40).map(|i| (i % 7) as f64).collect()),
//!     ("c1", (0..40).map(|i| (i % 5) as f64).collect()),
//! ]).unwrap();
//!
//! let pipeline = PipelineBuilder::new()
//!     .window(3, 1)
//!     .grid(1, 2)
//!     .build()
//!     .unwrap();
//!
//! let output = pipeline.process(&raw).unwrap();
//! assert_eq!(output.train.inputs.shape()[1..], [3, 1, 1, 2]);
//! assert_eq!(output.train.n_samples() + output.test.n_samples(), 37);
//! ```
//!
//! # Output Structure
//!
//! | Field | Type | Description |
//! |-------|------|-------------|
//! | `train` / `test` | `PreparedSplit` | tensor + labels per partition |
//! | `divisor` | `f64` | divisor applied to both partitions |
//! | `channel_names` | `Vec<String>` | names along tensor axis 2 |

use crate::config::PipelineConfig;
use crate::error::{PrepError, Result};
use crate::export::tensor_format::TensorReshaper;
use crate::labeling::{Discretizer, LabelStats, TrendLabel};
use crate::preprocessing::{ColumnPruner, Divisor, NormalizationParams};
use crate::sequence_builder::{partition, split_recurrent, WindowBuilder};
use crate::table::Table;
use crate::validation::{validate_table, ValidationConfig};
use ndarray::{s, Array2, Array5};
use std::path::Path;

/// One prepared partition.
#[derive(Debug, Clone)]
pub struct PreparedSplit {
    /// `(samples, timesteps, channels, rows, columns)`
    pub inputs: Array5<f64>,

    /// `(samples, output_dim)`: direction labels (-1/0/1) or raw targets
    pub labels: Array2<f64>,

    /// Wire names of the label columns
    pub label_columns: Vec<String>,

    /// Class counts (classification only)
    pub label_stats: Option<LabelStats>,

    /// Non-finite input cells replaced with zero
    pub replaced_non_finite: usize,

    /// Trailing samples dropped for forecast injection
    pub truncated: usize,

    /// Raw-row position of each sample's present step
    pub index: Vec<usize>,
}

impl PreparedSplit {
    /// Number of samples.
    pub fn n_samples(&self) -> usize {
        self.inputs.shape()[0]
    }
}

/// Output from pipeline processing.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Leading partition
    pub train: PreparedSplit,

    /// Trailing partition
    pub test: PreparedSplit,

    /// Divisor applied to both partitions
    pub divisor: f64,

    /// True if the divisor was fitted in this run (not supplied)
    pub divisor_fitted: bool,

    /// Names along tensor axis 2
    pub channel_names: Vec<String>,

    /// True when labels are discretized directions
    pub classification: bool,
}

impl PipelineOutput {
    /// Divisor record for reuse by later runs.
    pub fn normalization_params(&self) -> NormalizationParams {
        let shape = self.train.inputs.shape();
        let spatial_values = shape[0] * shape[1] * shape[3] * shape[4];
        let fitted_on = if self.divisor_fitted {
            "train"
        } else {
            "external"
        };
        NormalizationParams::new(self.divisor, fitted_on, spatial_values)
    }
}

/// The full preparation pipeline.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    window: WindowBuilder,
    reshaper: TensorReshaper,
    discretizer: Option<Discretizer>,
    pruner: ColumnPruner,
}

impl Pipeline {
    /// Create a pipeline from a validated configuration.
    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        config.validate()?;

        let reshaper = TensorReshaper::new(config.grid, config.globals.clone())?;
        let discretizer = config.discretize.map(Discretizer::new).transpose()?;
        let pruner = if config.prune_globals {
            ColumnPruner::new(config.globals.columns.iter().cloned())
        } else {
            ColumnPruner::default()
        };

        Ok(Self {
            window: WindowBuilder::new(config.window),
            reshaper,
            discretizer,
            pruner,
            config,
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Prepare `table`, fitting (or applying) the configured divisor on train.
    pub fn process(&self, table: &Table) -> Result<PipelineOutput> {
        self.process_with_divisor(table, self.config.normalization.divisor())
    }

    /// Prepare `table` with an explicit training divisor.
    ///
    /// [`Divisor::Fixed`] reuses a divisor from an earlier run (for example
    /// one loaded with [`NormalizationParams::load_json`]).
    pub fn process_with_divisor(&self, table: &Table, divisor: Divisor) -> Result<PipelineOutput> {
        let validation = validate_table(table, &ValidationConfig::for_window(&self.config.window));
        for warning in validation.warnings() {
            log::warn!("{warning}");
        }
        validation.ensure_no_errors()?;

        let windowed = self.window.build(table)?;
        let (train, test) = partition(&windowed, self.config.split.train_fraction)?;
        if train.is_empty() || test.is_empty() {
            return Err(PrepError::invalid(format!(
                "split of {} windows at {} leaves an empty partition ({} train, {} test)",
                windowed.n_rows(),
                self.config.split.train_fraction,
                train.n_rows(),
                test.n_rows()
            )));
        }

        let (train, divisor_used, channel_names) = self.prepare(&train, divisor)?;
        let (test, _, _) = self.prepare(&test, Divisor::Fixed(divisor_used))?;

        log::info!(
            "Prepared {} train / {} test samples, divisor {}{}",
            train.n_samples(),
            test.n_samples(),
            divisor_used,
            if divisor.is_compute() { " (fitted)" } else { "" }
        );

        Ok(PipelineOutput {
            train,
            test,
            divisor: divisor_used,
            divisor_fitted: divisor.is_compute(),
            channel_names,
            classification: self.discretizer.is_some(),
        })
    }

    /// Read a CSV table and prepare it.
    pub fn process_file<P: AsRef<Path>>(&self, path: P) -> Result<PipelineOutput> {
        let table = Table::read_raw_csv(path)?;
        self.process(&table)
    }

    /// Split, prune, label and reshape one partition.
    fn prepare(&self, part: &Table, divisor: Divisor) -> Result<(PreparedSplit, f64, Vec<String>)> {
        let (inputs, outputs) = split_recurrent(part, &self.config.columns)?;
        let outputs = self.pruner.prune(&outputs);

        let (inputs, labels) = match &self.discretizer {
            Some(discretizer) => {
                let data = discretizer.discretize(&inputs, &outputs)?;
                (data.inputs, data.labels)
            }
            None => (inputs, outputs),
        };

        let reshaped = self.reshaper.reshape(&inputs, divisor)?;
        let keep = reshaped.n_samples();

        let kept = labels.values().slice(s![..keep, ..]).to_owned();
        // Recount over the rows that survive forecast truncation
        let label_stats = self
            .discretizer
            .as_ref()
            .map(|_| LabelStats::from_labels(kept.iter().map(|&v| TrendLabel::from_sign(v))));

        let prepared = PreparedSplit {
            labels: kept,
            label_columns: labels.column_names(),
            label_stats,
            replaced_non_finite: reshaped.replaced_non_finite,
            truncated: reshaped.truncated,
            index: labels.index()[..keep].to_vec(),
            inputs: reshaped.tensor,
        };

        Ok((prepared, reshaped.divisor, reshaped.channel_names))
    }
}
