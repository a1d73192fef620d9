//! Grid tensor reshaping for convolution-aware recurrent models.
//!
//! Turns a flat `(samples × lag-tagged columns)` input table into a 5-axis
//! tensor:
//!
//! | Axis | Extent | Meaning |
//! |------|--------|---------|
//! | 0 | samples | window rows (minus forecast truncation) |
//! | 1 | timesteps | distinct input lags, most distant first |
//! | 2 | channels | 1 spatial + one per global (and per forecast copy) |
//! | 3 | rows | grid rows |
//! | 4 | columns | grid columns |
//!
//! # Spatial vs global
//!
//! Columns whose base name is not a listed global are *spatial*: each one is
//! a single grid cell, laid out in table order over the `(rows, columns)`
//! plane ([`GridLayout`] decides row- or column-major). Global columns are
//! scalars broadcast over the whole plane, one channel each.
//!
//! # Forecast injection
//!
//! A global with forecast horizon `k` gets `k` extra channels: channel `h`
//! (1-based) holds the value `h` rows ahead. The last `max(k)` samples have
//! no such future row and are dropped; [`ReshapeOutput::truncated`] reports
//! how many so labels can be trimmed to match.
//!
//! # Memory
//!
//! The tensor holds `samples × timesteps × channels × rows × columns` `f64`
//! values and is allocated in one piece.
//!
//! # Example
//!
//! ```
//! use grid_sequence_prep::export::tensor_format::{GridConfig, TensorReshaper};
//! use grid_sequence_prep::preprocessing::Divisor;
//! use grid_sequence_prep::schema::GlobalVariables;
//! use grid_sequence_prep::{make_recurrent, split_recurrent, ColumnSelection, Table};
//!
//! // 2×2 grid plus one global, 6 timesteps
//! let raw = Table::from_raw_columns(vec![
//!     ("c0", vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
//!     ("c1", vec![1.0; 6]),
//!     ("c2", vec![2.0; 6]),
//!     ("c3", vec![4.0; 6]),
//!     ("temp", vec![8.0; 6]),
//! ]).unwrap();
//! let windowed = make_recurrent(&raw, 2, 1).unwrap();
//! let (inputs, _) = split_recurrent(&windowed, &ColumnSelection::by_tag()).unwrap();
//!
//! let reshaper = TensorReshaper::new(GridConfig::new(2, 2), GlobalVariables::new(["temp"])).unwrap();
//! let out = reshaper.reshape(&inputs, Divisor::Compute).unwrap();
//!
//! assert_eq!(out.tensor.shape(), &[4, 2, 2, 2, 2]);
//! assert_eq!(out.divisor, 5.0); // spatial max only; the global is ignored
//! assert_eq!(out.tensor[[0, 0, 1, 1, 1]], 8.0 / 5.0);
//! ```

use crate::error::{PrepError, Result};
use crate::preprocessing::Divisor;
use crate::schema::{ColumnTag, GlobalVariables};
use crate::table::Table;
use ndarray::{s, Array2, Array5};
use serde::{Deserialize, Serialize};

/// Name of the spatial channel in [`ReshapeOutput::channel_names`].
pub const SPATIAL_CHANNEL: &str = "spatial";

// ============================================================================
// Grid Specification
// ============================================================================

/// Order in which flattened spatial columns fill the grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridLayout {
    /// Cell `k` goes to `(k / columns, k % columns)`
    #[default]
    RowMajor,

    /// Cell `k` goes to `(k % rows, k / rows)`
    ColumnMajor,
}

impl GridLayout {
    /// Grid position of flattened cell `k`.
    #[inline]
    pub fn position(&self, k: usize, rows: usize, columns: usize) -> (usize, usize) {
        match self {
            Self::RowMajor => (k / columns, k % columns),
            Self::ColumnMajor => (k % rows, k / rows),
        }
    }
}

/// Grid dimensions and layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridConfig {
    /// Grid rows (> 0)
    pub rows: usize,

    /// Grid columns (> 0)
    pub columns: usize,

    /// Fill order
    #[serde(default)]
    pub layout: GridLayout,
}

impl GridConfig {
    /// Row-major grid.
    pub fn new(rows: usize, columns: usize) -> Self {
        Self {
            rows,
            columns,
            layout: GridLayout::RowMajor,
        }
    }

    /// Set the fill order.
    pub fn with_layout(mut self, layout: GridLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Cells per plane.
    #[inline]
    pub fn cells(&self) -> usize {
        self.rows * self.columns
    }

    /// Check both dimensions are positive.
    pub fn validate(&self) -> Result<()> {
        if self.rows == 0 || self.columns == 0 {
            return Err(PrepError::invalid(format!(
                "grid dimensions must be positive, got {}x{}",
                self.rows, self.columns
            )));
        }
        Ok(())
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

// ============================================================================
// Reshape Output
// ============================================================================

/// Result of [`TensorReshaper::reshape`].
#[derive(Debug, Clone)]
pub struct ReshapeOutput {
    /// `(samples, timesteps, channels, rows, columns)`
    pub tensor: Array5<f64>,

    /// Divisor applied (fitted or passed through); reuse it on later partitions
    pub divisor: f64,

    /// Missing/non-finite cells replaced with zero
    pub replaced_non_finite: usize,

    /// Trailing samples dropped for forecast injection
    pub truncated: usize,

    /// Channel names along axis 2
    pub channel_names: Vec<String>,
}

impl ReshapeOutput {
    /// Samples along axis 0.
    pub fn n_samples(&self) -> usize {
        self.tensor.shape()[0]
    }

    /// Timesteps along axis 1.
    pub fn timesteps(&self) -> usize {
        self.tensor.shape()[1]
    }

    /// Channels along axis 2.
    pub fn n_channels(&self) -> usize {
        self.tensor.shape()[2]
    }
}

// ============================================================================
// Column Plan
// ============================================================================

/// Source column for one global channel at one timestep.
#[derive(Debug, Clone, Copy)]
struct GlobalSource {
    channel: usize,
    column: usize,
    lead: usize,
}

/// Column positions resolved once per call.
#[derive(Debug)]
struct ColumnPlan {
    /// Lags, most distant first
    lags: Vec<usize>,
    /// `spatial[t][k]`: column of cell `k` at timestep `t`
    spatial: Vec<Vec<usize>>,
    /// `globals[t]`: global channel sources at timestep `t`
    globals: Vec<Vec<GlobalSource>>,
    channel_names: Vec<String>,
}

impl ColumnPlan {
    fn resolve(table: &Table, grid: &GridConfig, globals: &GlobalVariables) -> Result<Self> {
        if let Some(tag) = table.columns().iter().find(|t| !t.is_input()) {
            return Err(PrepError::invalid(format!(
                "reshaper input must only hold lag-tagged columns, found '{tag}'"
            )));
        }

        let mut lags: Vec<usize> = table.columns().iter().filter_map(ColumnTag::lag).collect();
        lags.sort_unstable_by(|a, b| b.cmp(a));
        lags.dedup();

        if lags.is_empty() {
            return Err(PrepError::invalid("reshaper input has no columns"));
        }

        // Spatial bases in table order at the most distant lag
        let spatial_bases: Vec<&str> = table
            .columns()
            .iter()
            .filter(|t| t.lag() == Some(lags[0]) && !globals.contains(t.base()))
            .map(ColumnTag::base)
            .collect();

        let mut spatial = Vec::with_capacity(lags.len());
        let mut global_sources = Vec::with_capacity(lags.len());

        for &lag in &lags {
            let per_step = table
                .columns()
                .iter()
                .filter(|t| t.lag() == Some(lag) && !globals.contains(t.base()))
                .count();
            if per_step != spatial_bases.len() {
                return Err(PrepError::shape_mismatch(
                    format!("spatial columns at lag {lag}"),
                    spatial_bases.len(),
                    per_step,
                ));
            }

            let cells = spatial_bases
                .iter()
                .map(|base| locate(table, base, lag))
                .collect::<Result<Vec<_>>>()?;
            spatial.push(cells);

            let mut sources = Vec::with_capacity(globals.channel_count());
            let mut channel = 1;
            for base in &globals.columns {
                let column = locate(table, base, lag)?;
                for lead in 0..=globals.forecast.steps(base) {
                    sources.push(GlobalSource {
                        channel,
                        column,
                        lead,
                    });
                    channel += 1;
                }
            }
            global_sources.push(sources);
        }

        if spatial_bases.len() != grid.cells() {
            return Err(PrepError::invalid(format!(
                "{} spatial columns per timestep do not fill a {}x{} grid with one channel",
                spatial_bases.len(),
                grid.rows,
                grid.columns
            )));
        }

        let mut channel_names = vec![SPATIAL_CHANNEL.to_string()];
        for base in &globals.columns {
            channel_names.push(base.clone());
            channel_names.extend(
                (1..=globals.forecast.steps(base)).map(|h| format!("{base}_forecast_{h}")),
            );
        }

        Ok(Self {
            lags,
            spatial,
            globals: global_sources,
            channel_names,
        })
    }
}

fn locate(table: &Table, base: &str, lag: usize) -> Result<usize> {
    let tag = ColumnTag::at(base, -(lag as i64));
    table
        .position(&tag)
        .ok_or_else(|| PrepError::invalid(format!("column '{tag}' missing from reshaper input")))
}

// ============================================================================
// Tensor Reshaper
// ============================================================================

/// Reshapes lag-tagged input tables into grid tensors.
///
/// Stateless across calls: the divisor is the only value that flows from one
/// call to the next, and it flows explicitly through [`Divisor`].
#[derive(Debug, Clone)]
pub struct TensorReshaper {
    grid: GridConfig,
    globals: GlobalVariables,
}

impl TensorReshaper {
    /// Create a reshaper.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a non-positive grid or inconsistent globals.
    pub fn new(grid: GridConfig, globals: GlobalVariables) -> Result<Self> {
        grid.validate()?;
        globals.validate()?;
        Ok(Self { grid, globals })
    }

    /// Get the grid configuration.
    pub fn grid(&self) -> &GridConfig {
        &self.grid
    }

    /// Get the global variables.
    pub fn globals(&self) -> &GlobalVariables {
        &self.globals
    }

    /// Number of channels in every tensor this reshaper produces.
    pub fn n_channels(&self) -> usize {
        1 + self.globals.channel_count()
    }

    /// Reshape `table` into a 5-axis tensor.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if a column is not lag-tagged, a global is missing
    ///   at some lag, the spatial column count per timestep is not
    ///   `rows * columns`, the divisor is unusable, or the forecast horizon
    ///   consumes every sample
    /// - `ShapeMismatch` if timesteps carry different spatial column counts
    pub fn reshape(&self, table: &Table, divisor: Divisor) -> Result<ReshapeOutput> {
        divisor.validate()?;
        let plan = ColumnPlan::resolve(table, &self.grid, &self.globals)?;

        let (values, replaced) = replace_non_finite(table.values());
        if replaced > 0 {
            log::warn!(
                "Replaced {} missing/non-finite cells with 0 ({} rows × {} columns)",
                replaced,
                table.n_rows(),
                table.n_cols()
            );
        }

        let divisor = divisor.resolve(
            plan.spatial
                .iter()
                .flatten()
                .flat_map(|&j| values.column(j).into_iter().copied()),
        )?;

        let n_rows = table.n_rows();
        let truncated = self.globals.forecast.max_steps();
        if truncated > 0 && truncated >= n_rows {
            return Err(PrepError::invalid(format!(
                "forecast horizon {truncated} leaves no samples out of {n_rows}"
            )));
        }
        let n_samples = n_rows - truncated;

        let timesteps = plan.lags.len();
        let mut tensor = Array5::<f64>::zeros((
            n_samples,
            timesteps,
            plan.channel_names.len(),
            self.grid.rows,
            self.grid.columns,
        ));

        for (t, cells) in plan.spatial.iter().enumerate() {
            for (k, &j) in cells.iter().enumerate() {
                let (r, c) = self.grid.layout.position(k, self.grid.rows, self.grid.columns);
                let src = values.slice(s![..n_samples, j]);
                tensor
                    .slice_mut(s![.., t, 0, r, c])
                    .zip_mut_with(&src, |dst, &v| *dst = v / divisor);
            }
        }

        for (t, sources) in plan.globals.iter().enumerate() {
            for src in sources {
                for sample in 0..n_samples {
                    let v = values[[sample + src.lead, src.column]] / divisor;
                    tensor.slice_mut(s![sample, t, src.channel, .., ..]).fill(v);
                }
            }
        }

        log::debug!(
            "Reshaped {}×{} table into {:?} (divisor {}, {} truncated)",
            n_rows,
            table.n_cols(),
            tensor.shape(),
            divisor,
            truncated
        );

        Ok(ReshapeOutput {
            tensor,
            divisor,
            replaced_non_finite: replaced,
            truncated,
            channel_names: plan.channel_names,
        })
    }
}

fn replace_non_finite(values: &Array2<f64>) -> (Array2<f64>, usize) {
    let mut replaced = 0;
    let cleaned = values.mapv(|v| {
        if v.is_finite() {
            v
        } else {
            replaced += 1;
            0.0
        }
    });
    (cleaned, replaced)
}

/// Reshape `table` into `(samples, timesteps, channels, rows, columns)`.
///
/// `divisor == 0` fits max-abs over the spatial values of `table`; any other
/// value is applied as given. Returns the tensor and the divisor used.
///
/// # Example
///
/// ```
/// use grid_sequence_prep::export::tensor_format::reshape_recurrent_input;
/// use grid_sequence_prep::schema::GlobalVariables;
/// use grid_sequence_prep::{make_recurrent, split_recurrent, ColumnSelection, Table};
///
/// let raw = Table::from_raw_columns(vec![
///     ("a", vec![0.0, 2.0, 4.0, 6.0]),
///     ("b", vec![1.0, 3.0, 5.0, 7.0]),
/// ]).unwrap();
/// let (inputs, _) = split_recurrent(&make_recurrent(&raw, 1, 1).unwrap(), &ColumnSelection::by_tag()).unwrap();
///
/// let (tensor, divisor) = reshape_recurrent_input(&inputs, 1, 2, &GlobalVariables::none(), 0.0).unwrap();
/// assert_eq!(tensor.shape(), &[3, 1, 1, 1, 2]);
/// assert_eq!(divisor, 5.0);
///
/// let (_, reused) = reshape_recurrent_input(&inputs, 1, 2, &GlobalVariables::none(), divisor).unwrap();
/// assert_eq!(reused, 5.0);
/// ```
pub fn reshape_recurrent_input(
    table: &Table,
    rows: usize,
    columns: usize,
    globals: &GlobalVariables,
    divisor: f64,
) -> Result<(Array5<f64>, f64)> {
    let output = TensorReshaper::new(GridConfig::new(rows, columns), globals.clone())?
        .reshape(table, Divisor::from_raw(divisor))?;
    Ok((output.tensor, output.divisor))
}

// ============================================================================
// Unit Tests
// ============================================================================
