//! Chronological partitioning and input/output column splitting.

use crate::error::{PrepError, Result};
use crate::table::Table;
use serde::{Deserialize, Serialize};

/// Train/test split by leading fraction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Fraction of rows in the leading (training) partition, in (0, 1)
    pub train_fraction: f64,
}

impl SplitConfig {
    /// Create a split configuration.
    pub fn new(train_fraction: f64) -> Self {
        Self { train_fraction }
    }

    /// Check the fraction lies strictly inside (0, 1).
    pub fn validate(&self) -> Result<()> {
        let p = self.train_fraction;
        if !(p > 0.0 && p < 1.0) {
            return Err(PrepError::invalid(format!(
                "split fraction must lie in (0, 1) exclusive, got {p}"
            )));
        }
        Ok(())
    }

    /// Rows in the leading partition for a table of `n_rows`.
    #[inline]
    pub fn leading_rows(&self, n_rows: usize) -> usize {
        (n_rows as f64 * self.train_fraction).floor() as usize
    }
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self::new(0.75)
    }
}

/// Split `table` into its leading `floor(N * fraction)` rows and the rest.
///
/// Order is preserved; nothing is shuffled.
///
/// # Example
///
/// ```
/// use grid_sequence_prep::{partition, Table};
///
/// let table = Table::from_raw_columns(vec![("x", vec![0.0; 100])]).unwrap();
/// let (train, test) = partition(&table, 0.75).unwrap();
/// assert_eq!((train.n_rows(), test.n_rows()), (75, 25));
/// ```
pub fn partition(table: &Table, fraction: f64) -> Result<(Table, Table)> {
    let config = SplitConfig::new(fraction);
    config.validate()?;
    let k = config.leading_rows(table.n_rows());
    Ok((table.slice_rows(0..k), table.slice_rows(k..table.n_rows())))
}

/// Explicit column choice for [`split_recurrent`].
///
/// `None` (or an empty list) falls back to the tag rule: negative offsets
/// are inputs, zero and positive offsets are outputs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSelection {
    /// Wire names of input columns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Vec<String>>,

    /// Wire names of output columns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Vec<String>>,
}

impl ColumnSelection {
    /// Default tag-based selection.
    pub fn by_tag() -> Self {
        Self::default()
    }

    /// Explicit lists for both sides.
    pub fn explicit<S: Into<String>>(
        inputs: impl IntoIterator<Item = S>,
        outputs: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            inputs: Some(inputs.into_iter().map(Into::into).collect()),
            outputs: Some(outputs.into_iter().map(Into::into).collect()),
        }
    }
}

fn resolve(table: &Table, names: &Option<Vec<String>>, side: &str) -> Result<Option<Vec<usize>>> {
    let Some(names) = names.as_ref().filter(|n| !n.is_empty()) else {
        return Ok(None);
    };
    names
        .iter()
        .map(|name| {
            table.position_by_name(name).ok_or_else(|| {
                PrepError::invalid(format!("{side} column '{name}' not found in table"))
            })
        })
        .collect::<Result<Vec<_>>>()
        .map(Some)
}

/// Split a windowed table into `(inputs, outputs)`.
///
/// Default selection uses the parsed tag offset, never substring matching,
/// so a base name such as `rate_total` cannot be mistaken for a tag.
///
/// # Errors
///
/// `InvalidArgument` if an explicitly named column is absent.
///
/// # Example
///
/// ```
/// use grid_sequence_prep::{make_recurrent, split_recurrent, ColumnSelection, Table};
///
/// let raw = Table::from_raw_columns(vec![("a", vec![1.0, 2.0, 3.0, 4.0])]).unwrap();
/// let windowed = make_recurrent(&raw, 2, 1).unwrap();
/// let (inputs, outputs) = split_recurrent(&windowed, &ColumnSelection::by_tag()).unwrap();
/// assert_eq!(inputs.column_names(), vec!["a_t-2", "a_t-1"]);
/// assert_eq!(outputs.column_names(), vec!["a_t"]);
/// ```
pub fn split_recurrent(table: &Table, selection: &ColumnSelection) -> Result<(Table, Table)> {
    let input_positions = match resolve(table, &selection.inputs, "input")? {
        Some(p) => p,
        None => tagged_positions(table, |o| o < 0),
    };
    let output_positions = match resolve(table, &selection.outputs, "output")? {
        Some(p) => p,
        None => tagged_positions(table, |o| o >= 0),
    };

    log::debug!(
        "Split {} columns into {} inputs and {} outputs",
        table.n_cols(),
        input_positions.len(),
        output_positions.len()
    );

    Ok((
        table.select_columns(&input_positions)?,
        table.select_columns(&output_positions)?,
    ))
}

fn tagged_positions<F: Fn(i64) -> bool>(table: &Table, want: F) -> Vec<usize> {
    table
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, t)| t.offset().is_some_and(&want))
        .map(|(j, _)| j)
        .collect()
}
