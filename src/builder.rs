//! Fluent builder for pipeline configuration.
//!
//! This module provides a builder pattern for constructing pipeline
//! configurations in a clean, readable manner.
//!
//! # Quick Start
//!
//! ```
//! use grid_sequence_prep::PipelineBuilder;
//!
//! let pipeline = PipelineBuilder::new()
//!     .window(6, 1)
//!     .grid(4, 4)
//!     .build()
//!     .unwrap();
//! assert_eq!(pipeline.config().window.total_inputs, 6);
//! ```
//!
//! # Channel Count Reference
//!
//! | Configuration | Channels |
//! |--------------|----------|
//! | Spatial only | 1 |
//! | + G globals | 1 + G |
//! | + forecast of k steps on one global | 1 + G + k |
//!
//! # Common Configurations
//!
//! ## Direction classification with weather globals
//!
//! ```ignore
//! let pipeline = PipelineBuilder::new()
//!     .window(12, 1)
//!     .grid(8, 8)
//!     .global("temperature")
//!     .global("precipitation")
//!     .forecast("temperature", 3)
//!     .classify(1.0, 0.10, true)
//!     .build()?;
//! ```
//!
//! ## Regression with a persisted divisor
//!
//! ```ignore
//! let params = NormalizationParams::load_json("out/grid_normalization.json")?;
//! let pipeline = PipelineBuilder::new()
//!     .window(6, 1)
//!     .grid(4, 4)
//!     .divisor(params.divisor)
//!     .build()?;
//! ```

use crate::config::{ExperimentMetadata, PipelineConfig};
use crate::error::Result;
use crate::export::tensor_format::{GridConfig, GridLayout};
use crate::labeling::DiscretizeConfig;
use crate::pipeline::Pipeline;
use crate::sequence_builder::WindowConfig;

/// Fluent builder for creating pipeline configurations.
///
/// Settings are collected as given and validated together in
/// [`build_config`](Self::build_config).
#[derive(Debug, Clone)]
pub struct PipelineBuilder {
    config: PipelineConfig,
    forecast: Vec<(String, usize)>,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineBuilder {
    /// Create a builder with default settings (1 lag, 1 output, 1×1 grid,
    /// 0.75 split, regression targets, fitted divisor).
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            forecast: Vec::new(),
        }
    }

    /// Start from an existing configuration.
    pub fn from_config(config: PipelineConfig) -> Self {
        Self {
            config,
            forecast: Vec::new(),
        }
    }

    // =========================================================================
    // Windowing & split
    // =========================================================================

    /// Set window depth.
    pub fn window(mut self, total_inputs: usize, total_outputs: usize) -> Self {
        self.config.window = WindowConfig::new(total_inputs, total_outputs);
        self
    }

    /// Set the leading (training) fraction.
    pub fn train_fraction(mut self, fraction: f64) -> Self {
        self.config.split.train_fraction = fraction;
        self
    }

    /// Use explicit input columns (wire names such as `a_t-1`).
    pub fn input_columns<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.config.columns.inputs = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Use explicit output columns (wire names such as `a_t`).
    pub fn output_columns<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.config.columns.outputs = Some(names.into_iter().map(Into::into).collect());
        self
    }

    // =========================================================================
    // Labels
    // =========================================================================

    /// Discretize outputs into direction labels.
    pub fn classify(mut self, min_delta: f64, min_delta_pct: f64, require_both: bool) -> Self {
        self.config.discretize = Some(DiscretizeConfig::new(min_delta, min_delta_pct, require_both));
        self
    }

    /// Keep continuous outputs.
    pub fn regression(mut self) -> Self {
        self.config.discretize = None;
        self
    }

    // =========================================================================
    // Grid & globals
    // =========================================================================

    /// Set grid dimensions (row-major).
    pub fn grid(mut self, rows: usize, columns: usize) -> Self {
        self.config.grid = GridConfig::new(rows, columns).with_layout(self.config.grid.layout);
        self
    }

    /// Set grid fill order.
    pub fn grid_layout(mut self, layout: GridLayout) -> Self {
        self.config.grid.layout = layout;
        self
    }

    /// Add a global (broadcast) variable.
    pub fn global(mut self, base: &str) -> Self {
        if !self.config.globals.contains(base) {
            self.config.globals.columns.push(base.to_string());
        }
        self
    }

    /// Inject `steps` forecast copies of global `base`.
    pub fn forecast(mut self, base: &str, steps: usize) -> Self {
        self.forecast.push((base.to_string(), steps));
        self
    }

    /// Keep global variables among the outputs.
    pub fn keep_global_outputs(mut self) -> Self {
        self.config.prune_globals = false;
        self
    }

    /// Use a fixed divisor; `0.0` means fit on the training partition.
    pub fn divisor(mut self, divisor: f64) -> Self {
        self.config.normalization.divisor = (divisor != 0.0).then_some(divisor);
        self
    }

    // =========================================================================
    // Metadata
    // =========================================================================

    /// Set experiment metadata for tracking and reproducibility.
    pub fn experiment(mut self, name: &str, description: &str) -> Self {
        let mut metadata = ExperimentMetadata::named(name);
        metadata.description = Some(description.to_string());
        self.config.metadata = Some(metadata);
        self
    }

    /// Set experiment metadata with full control.
    pub fn with_metadata(mut self, metadata: ExperimentMetadata) -> Self {
        self.config.metadata = Some(metadata);
        self
    }

    // =========================================================================
    // Build
    // =========================================================================

    /// Build and validate the pipeline configuration.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for any out-of-range setting, including a forecast
    /// of zero steps or on a variable not added with [`global`](Self::global).
    pub fn build_config(self) -> Result<PipelineConfig> {
        let mut config = self.config;
        let mut forecast = config.globals.forecast.clone();
        for (base, steps) in self.forecast {
            forecast = forecast.with(base, steps)?;
        }
        config.globals.forecast = forecast;

        config.validate()?;
        Ok(config)
    }

    /// Build and return a ready-to-use [`Pipeline`].
    pub fn build(self) -> Result<Pipeline> {
        Pipeline::from_config(self.build_config()?)
    }

    /// Channels the configured reshaper will produce.
    pub fn channel_count(&self) -> usize {
        let pending: usize = self.forecast.iter().map(|(_, steps)| steps).sum();
        1 + self.config.globals.channel_count() + pending
    }

    /// Get a summary of the current configuration.
    pub fn summary(&self) -> String {
        let labels = match &self.config.discretize {
            Some(d) => format!(
                "direction (|Δ| ≥ {}, |Δ%| ≥ {}, {})",
                d.min_delta,
                d.min_delta_pct,
                if d.require_both { "both" } else { "either" }
            ),
            None => "regression".to_string(),
        };
        let divisor = match self.config.normalization.divisor {
            Some(d) => format!("fixed {d}"),
            None => "fit on train".to_string(),
        };

        format!(
            "PipelineBuilder Summary:\n\
             - Window: {} inputs, {} outputs\n\
             - Split: {:.0}% train\n\
             - Grid: {}x{} ({:?})\n\
             - Globals: {} ({} channels total)\n\
             - Labels: {}\n\
             - Divisor: {}",
            self.config.window.total_inputs,
            self.config.window.total_outputs,
            self.config.split.train_fraction * 100.0,
            self.config.grid.rows,
            self.config.grid.columns,
            self.config.grid.layout,
            self.config.globals.columns.len(),
            self.channel_count(),
            labels,
            divisor,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_default() {
        let config = PipelineBuilder::new().build_config().unwrap();
        assert_eq!(config.window, WindowConfig::new(1, 1));
        assert_eq!(config.grid, GridConfig::new(1, 1));
        assert!(config.discretize.is_none());
        assert!(config.normalization.divisor.is_none());
    }

    #[test]
    fn test_builder_globals_and_forecast() {
        let builder = PipelineBuilder::new()
            .grid(2, 2)
            .global("temp")
            .global("rain")
            .global("temp")
            .forecast("temp", 2);
        assert_eq!(builder.channel_count(), 5);

        let config = builder.build_config().unwrap();
        assert_eq!(config.globals.columns, vec!["temp", "rain"]);
        assert_eq!(config.globals.forecast.steps("temp"), 2);
    }

    #[test]
    fn test_builder_forecast_on_unknown_global_fails() {
        let result = PipelineBuilder::new().forecast("wind", 1).build_config();
        assert!(result.unwrap_err().is_invalid_argument());
    }

    #[test]
    fn test_builder_zero_forecast_fails() {
        let result = PipelineBuilder::new().global("temp").forecast("temp", 0).build_config();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_divisor_zero_means_fit() {
        let config = PipelineBuilder::new().divisor(0.0).build_config().unwrap();
        assert!(config.normalization.divisor.is_none());
        let config = PipelineBuilder::new().divisor(8.0).build_config().unwrap();
        assert_eq!(config.normalization.divisor, Some(8.0));
    }

    #[test]
    fn test_builder_grid_keeps_layout() {
        let config = PipelineBuilder::new()
            .grid_layout(GridLayout::ColumnMajor)
            .grid(3, 2)
            .build_config()
            .unwrap();
        assert_eq!(config.grid.layout, GridLayout::ColumnMajor);
        assert_eq!(config.grid.cells(), 6);
    }

    #[test]
    fn test_builder_invalid_settings() {
        assert!(PipelineBuilder::new().window(0, 1).build().is_err());
        assert!(PipelineBuilder::new().train_fraction(1.2).build().is_err());
        assert!(PipelineBuilder::new().classify(0.0, 0.1, true).build().is_err());
    }

    #[test]
    fn test_summary_mentions_labels() {
        let summary = PipelineBuilder::new().classify(1.0, 0.1, false).summary();
        assert!(summary.contains("direction"));
        assert!(summary.contains("either"));
    }
}
