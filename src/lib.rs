//! Grid Sequence Prep
//!
//! Windowing, directional labeling and grid tensor reshaping of
//! time-ordered tables for recurrent/convolutional sequence models.
//!
//! # Overview
//!
//! A flat table of per-timestep measurements (one column per grid cell plus
//! optional scalar "global" readings) becomes a dense 5-axis tensor
//! `(samples, timesteps, channels, rows, columns)` and an aligned label
//! matrix:
//!
//! - **Windowing**: every column copied at lags `t-I..t-1` and horizons `t..t+O-1`
//! - **Partitioning**: chronological train/test split, no shuffling
//! - **Labeling**: optional tri-state direction labels (-1/0/1) from
//!   absolute and percentage change thresholds
//! - **Reshaping**: spatial columns laid out on the grid, globals broadcast
//!   to every cell, optional forecast channels, divisor fitted on train only
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Grid Sequence Prep                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  schema/          - Column tags (base, offset), global variables│
//! │  table            - Tagged table + CSV I/O                      │
//! │  sequence_builder/- Windowing, partition, input/output split    │
//! │  labeling/        - Direction labels and class statistics       │
//! │  preprocessing/   - Divisor fitting, output column pruning      │
//! │  export/          - Grid tensor reshaping, NumPy export         │
//! │  pipeline         - All stages composed, divisor threaded       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Memory
//!
//! Windowing multiplies the column count by `I + O`, and reshaping expands
//! each spatial column to a full grid per channel. Both stages hold
//! `O(rows × columns × timesteps × channels)` values in memory; there is no
//! streaming variant.
//!
//! # Example
//!
//! ```
//! use grid_sequence_prep::{make_recurrent, partition, split_recurrent, ColumnSelection, Table};
//!
//! let raw = Table::from_raw_columns(vec![
//!     ("a", vec![1.0, 2.0, 3.0, 4.0, 5.0]),
//!     ("b", vec![10.0, 20.0, 30.0, 40.0, 50.0]),
//! ]).unwrap();
//!
//! let windowed = make_recurrent(&raw, 2, 1).unwrap();
//! assert_eq!(windowed.column_names(), ["a_t-2", "b_t-2", "a_t-1", "b_t-1", "a_t", "b_t"]);
//! assert_eq!(windowed.n_rows(), 3);
//!
//! let (train, _test) = partition(&windowed, 0.67).unwrap();
//! let (inputs, outputs) = split_recurrent(&train, &ColumnSelection::by_tag()).unwrap();
//! assert_eq!(inputs.n_cols(), 4);
//! assert_eq!(outputs.n_cols(), 2);
//! ```

pub mod builder;
pub mod config;
pub mod error;
pub mod export;
pub mod labeling;
pub mod pipeline;
pub mod prelude;
pub mod preprocessing;
pub mod schema;
pub mod sequence_builder;
pub mod table;
pub mod validation;

#[cfg(feature = "parallel")]
pub mod batch;

// Re-exports - Errors
pub use error::{PrepError, Result};

// Re-exports - Schema & table
pub use schema::{ColumnTag, ForecastHorizons, GlobalVariables};
pub use table::Table;

// Re-exports - Config
pub use builder::PipelineBuilder;
pub use config::{DatasetConfig, ExperimentMetadata, NormalizationConfig, PipelineConfig};

// Re-exports - Sequence building
pub use sequence_builder::{
    make_recurrent, partition, split_recurrent, ColumnSelection, SplitConfig, WindowBuilder,
    WindowConfig,
};

// Re-exports - Labeling
pub use labeling::{
    regression_to_classification, CombineRule, DiscretizeConfig, Discretizer, LabelStats,
    TrendLabel,
};

// Re-exports - Preprocessing
pub use preprocessing::{
    remove_global_columns, ColumnPruner, Divisor, MaxAbsNormalizer, NormalizationParams,
    Normalizer,
};

// Re-exports - Export
pub use export::{
    export_to_numpy, reshape_recurrent_input, ExportMetadata, GridConfig, GridLayout,
    NumpyExporter, ReshapeOutput, TensorReshaper,
};

// Re-exports - Validation
pub use validation::{validate_table, ValidationConfig, ValidationLevel, ValidationResult};

// Re-exports - Pipeline
pub use pipeline::{Pipeline, PipelineOutput, PreparedSplit};
