//! Recurrent windowing of raw tables.
//!
//! Turns a flat table (one row per timestep) into a table where every row
//! bundles `total_inputs` lagged copies and `total_outputs` current/future
//! copies of the original columns.
//!
//! # Layout
//!
//! For columns `{a, b}`, `total_inputs = 2`, `total_outputs = 2`:
//!
//! ```text
//! a_t-2  b_t-2  a_t-1  b_t-1 | a_t  b_t  a_t+1  b_t+1
//! ─────────── inputs ──────── ──────── outputs ───────
//! ```
//!
//! Window row `j` is anchored at raw row `p = j + total_inputs`; the column
//! at offset `o` holds raw row `p + o`. The first `total_inputs` raw rows
//! (insufficient history) and the last `total_outputs - 1` (insufficient
//! future) never anchor a window.
//!
//! # Memory
//!
//! Output size is `(N - I - O + 1) × (I + O) × C` values, i.e. roughly
//! `I + O` times the raw table.

use crate::error::{PrepError, Result};
use crate::schema::ColumnTag;
use crate::table::Table;
use ndarray::{s, Array2};
use serde::{Deserialize, Serialize};

/// Window depth on each side of the present row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Lagged input steps (`_t-K` for K = 1..=total_inputs)
    pub total_inputs: usize,

    /// Output steps (`_t`, then `_t+K` for K = 1..total_outputs)
    pub total_outputs: usize,
}

impl WindowConfig {
    /// Create a window configuration.
    pub fn new(total_inputs: usize, total_outputs: usize) -> Self {
        Self {
            total_inputs,
            total_outputs,
        }
    }

    /// Columns produced per raw column.
    #[inline]
    pub fn width(&self) -> usize {
        self.total_inputs + self.total_outputs
    }

    /// Rows a raw table of `n_rows` produces.
    #[inline]
    pub fn output_rows(&self, n_rows: usize) -> usize {
        n_rows.saturating_sub(self.width().saturating_sub(1))
    }

    /// Offsets in column order: `-I..=-1` then `0..O`.
    pub fn offsets(&self) -> impl Iterator<Item = i64> {
        let lags = (1..=self.total_inputs as i64).rev().map(|k| -k);
        let leads = 0..self.total_outputs as i64;
        lags.chain(leads)
    }

    /// Check both counts are at least one.
    pub fn validate(&self) -> Result<()> {
        if self.total_inputs == 0 {
            return Err(PrepError::invalid("total_inputs must be >= 1"));
        }
        if self.total_outputs == 0 {
            return Err(PrepError::invalid("total_outputs must be >= 1"));
        }
        Ok(())
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

/// Builds recurrent (windowed) tables from raw tables.
#[derive(Debug, Clone, Default)]
pub struct WindowBuilder {
    config: WindowConfig,
}

impl WindowBuilder {
    /// Create a builder.
    pub fn new(config: WindowConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    /// Window a raw table.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if either window count is zero, the table is empty,
    /// or the table is already windowed.
    ///
    /// A table shorter than `total_inputs + total_outputs` yields a table with
    /// the full column set and zero rows.
    pub fn build(&self, table: &Table) -> Result<Table> {
        self.config.validate()?;
        if table.is_empty() {
            return Err(PrepError::invalid("cannot window an empty table"));
        }
        if let Some(tag) = table.columns().iter().find(|t| !t.is_raw()) {
            return Err(PrepError::invalid(format!(
                "table is already windowed (column '{tag}')"
            )));
        }

        let n_rows = table.n_rows();
        let n_cols = table.n_cols();
        let lead_in = self.config.total_inputs;
        let out_rows = self.config.output_rows(n_rows);

        if out_rows == 0 {
            log::warn!(
                "Window ({} in, {} out) is deeper than the table ({} rows); no rows produced",
                self.config.total_inputs,
                self.config.total_outputs,
                n_rows
            );
        }

        let mut columns = Vec::with_capacity(self.config.width() * n_cols);
        let mut values = Array2::<f64>::zeros((out_rows, self.config.width() * n_cols));

        for (block, offset) in self.config.offsets().enumerate() {
            columns.extend(table.columns().iter().map(|t| t.with_offset(offset)));

            if out_rows > 0 {
                // offset >= -lead_in, so the source start is never negative
                let src_start = (lead_in as i64 + offset) as usize;
                let src = table
                    .values()
                    .slice(s![src_start..src_start + out_rows, ..]);
                values
                    .slice_mut(s![.., block * n_cols..(block + 1) * n_cols])
                    .assign(&src);
            }
        }

        let index = table.index()[lead_in.min(n_rows)..lead_in.min(n_rows) + out_rows].to_vec();

        log::debug!(
            "Windowed {}×{} table into {}×{} ({} in, {} out)",
            n_rows,
            n_cols,
            out_rows,
            columns.len(),
            self.config.total_inputs,
            self.config.total_outputs
        );

        Table::with_index(columns, values, index)
    }
}

/// Window `table` with `total_inputs` lags and `total_outputs` outputs.
///
/// # Example
///
/// ```
/// use grid_sequence_prep::{make_recurrent, Table};
///
/// let raw = Table::from_raw_columns(vec![
///     ("a", (0..10).map(f64::from).collect()),
///     ("b", (0..10).map(f64::from).collect()),
/// ]).unwrap();
///
/// let windowed = make_recurrent(&raw, 2, 1).unwrap();
/// assert_eq!(windowed.n_rows(), 8);
/// assert_eq!(windowed.column_names(), vec!["a_t-2", "b_t-2", "a_t-1", "b_t-1", "a_t", "b_t"]);
/// assert_eq!(windowed.values().row(0).to_vec(), vec![0.0, 0.0, 1.0, 1.0, 2.0, 2.0]);
/// ```
pub fn make_recurrent(table: &Table, total_inputs: usize, total_outputs: usize) -> Result<Table> {
    WindowBuilder::new(WindowConfig::new(total_inputs, total_outputs)).build(table)
}

/// Tag of every column a window over `columns` produces, in output order.
pub fn windowed_columns(columns: &[ColumnTag], config: &WindowConfig) -> Vec<ColumnTag> {
    config
        .offsets()
        .flat_map(|o| columns.iter().map(move |t| t.with_offset(o)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counting(n: usize) -> Table {
        Table::from_raw_columns(vec![
            ("a", (0..n).map(|x| x as f64).collect()),
            ("b", (0..n).map(|x| 100.0 + x as f64).collect()),
        ])
        .unwrap()
    }

    #[test]
    fn test_offsets_order() {
        let config = WindowConfig::new(3, 2);
        assert_eq!(config.offsets().collect::<Vec<_>>(), vec![-3, -2, -1, 0, 1]);
    }

    #[test]
    fn test_window_values_and_index() {
        let windowed = make_recurrent(&counting(10), 2, 2).unwrap();
        // 10 - 2 - (2 - 1)
        assert_eq!(windowed.n_rows(), 7);
        assert_eq!(windowed.n_cols(), 8);
        assert_eq!(
            windowed.column_names(),
            vec!["a_t-2", "b_t-2", "a_t-1", "b_t-1", "a_t", "b_t", "a_t+1", "b_t+1"]
        );

        let first = windowed.values().row(0).to_vec();
        assert_eq!(first, vec![0.0, 100.0, 1.0, 101.0, 2.0, 102.0, 3.0, 103.0]);

        let last = windowed.values().row(6).to_vec();
        assert_eq!(last, vec![6.0, 106.0, 7.0, 107.0, 8.0, 108.0, 9.0, 109.0]);

        // Row index points at the present (`_t`) raw row
        assert_eq!(windowed.index(), &[2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_zero_counts_rejected() {
        let table = counting(5);
        assert!(make_recurrent(&table, 0, 1).unwrap_err().is_invalid_argument());
        assert!(make_recurrent(&table, 1, 0).unwrap_err().is_invalid_argument());
    }

    #[test]
    fn test_empty_table_rejected() {
        let table = counting(0);
        assert!(make_recurrent(&table, 1, 1).is_err());
    }

    #[test]
    fn test_already_windowed_rejected() {
        let windowed = make_recurrent(&counting(5), 1, 1).unwrap();
        assert!(make_recurrent(&windowed, 1, 1).is_err());
    }

    #[test]
    fn test_window_deeper_than_table() {
        let windowed = make_recurrent(&counting(3), 3, 2).unwrap();
        assert_eq!(windowed.n_rows(), 0);
        assert_eq!(windowed.n_cols(), 10);
    }

    #[test]
    fn test_exact_fit_produces_one_row() {
        let windowed = make_recurrent(&counting(5), 3, 2).unwrap();
        assert_eq!(windowed.n_rows(), 1);
        assert_eq!(windowed.index(), &[3]);
    }

    #[test]
    fn test_windowed_columns_helper() {
        let tags = vec![ColumnTag::raw("x")];
        let names: Vec<String> = windowed_columns(&tags, &WindowConfig::new(1, 2))
            .iter()
            .map(|t| t.to_string())
            .collect();
        assert_eq!(names, vec!["x_t-1", "x_t", "x_t+1"]);
    }
}
