//! Prelude module for convenient imports.
//!
//! # Usage
//!
//! ```
//! use grid_sequence_prep::prelude::*;
//!
//! let config = PipelineBuilder::new().window(4, 1).grid(2, 2).build_config().unwrap();
//! let pipeline = Pipeline::from_config(config).unwrap();
//! assert_eq!(pipeline.config().grid.cells(), 4);
//! ```
//!
//! # What's Included
//!
//! ## Core Pipeline
//! - [`Pipeline`], [`PipelineBuilder`], [`PipelineConfig`], [`PipelineOutput`]
//!
//! ## Data
//! - [`Table`], [`ColumnTag`], [`GlobalVariables`], [`ForecastHorizons`]
//!
//! ## Stages
//! - [`WindowBuilder`], [`partition`], [`split_recurrent`]
//! - [`Discretizer`], [`TrendLabel`], [`LabelStats`]
//! - [`TensorReshaper`], [`GridConfig`], [`GridLayout`], [`Divisor`]
//!
//! ## Export
//! - [`NumpyExporter`], [`NormalizationParams`]

// ============================================================================
// Core Pipeline
// ============================================================================

pub use crate::builder::PipelineBuilder;
pub use crate::config::{DatasetConfig, ExperimentMetadata, PipelineConfig};
pub use crate::pipeline::{Pipeline, PipelineOutput, PreparedSplit};

// ============================================================================
// Data
// ============================================================================

pub use crate::schema::{ColumnTag, ForecastHorizons, GlobalVariables};
pub use crate::table::Table;

// ============================================================================
// Stages
// ============================================================================

pub use crate::export::tensor_format::{GridConfig, GridLayout, ReshapeOutput, TensorReshaper};
pub use crate::labeling::{CombineRule, DiscretizeConfig, Discretizer, LabelStats, TrendLabel};
pub use crate::preprocessing::{ColumnPruner, Divisor, NormalizationParams};
pub use crate::sequence_builder::{
    make_recurrent, partition, split_recurrent, ColumnSelection, WindowBuilder, WindowConfig,
};

// ============================================================================
// Export & Validation
// ============================================================================

pub use crate::export::NumpyExporter;
pub use crate::validation::{validate_table, ValidationConfig, ValidationResult};

// ============================================================================
// Error Handling
// ============================================================================

pub use crate::error::{PrepError, Result};
