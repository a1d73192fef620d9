//! Removal of global (non-spatial) variables from output tables.
//!
//! Globals are useful as inputs but are usually not prediction targets, so
//! after splitting, their output columns are pruned before labels are built.

use crate::table::Table;

/// Drops every column whose base name is in a fixed list.
///
/// # Example
///
/// ```
/// use grid_sequence_prep::preprocessing::ColumnPruner;
/// use grid_sequence_prep::{make_recurrent, Table};
///
/// let raw = Table::from_raw_columns(vec![
///     ("cell_0", vec![1.0, 2.0, 3.0]),
///     ("temp", vec![20.0, 21.0, 22.0]),
/// ]).unwrap();
/// let windowed = make_recurrent(&raw, 1, 2).unwrap();
///
/// let pruned = ColumnPruner::new(["temp"]).prune(&windowed);
/// assert_eq!(pruned.column_names(), vec!["cell_0_t-1", "cell_0_t", "cell_0_t+1"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ColumnPruner {
    globals: Vec<String>,
}

impl ColumnPruner {
    /// Create a pruner for the given global base names.
    pub fn new<I, S>(globals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            globals: globals.into_iter().map(Into::into).collect(),
        }
    }

    /// Base names this pruner removes.
    pub fn globals(&self) -> &[String] {
        &self.globals
    }

    /// Copy of `table` without the global columns.
    ///
    /// Names that match nothing are ignored; the input is never modified.
    pub fn prune(&self, table: &Table) -> Table {
        if self.globals.is_empty() {
            return table.clone();
        }
        let pruned = table.filter_columns(|tag| !self.globals.iter().any(|g| g == tag.base()));
        log::debug!(
            "Pruned {} global columns ({} remain)",
            table.n_cols() - pruned.n_cols(),
            pruned.n_cols()
        );
        pruned
    }
}

/// Copy of `table` without any column whose base name is in `globals`.
pub fn remove_global_columns<S: AsRef<str>>(table: &Table, globals: &[S]) -> Table {
    ColumnPruner::new(globals.iter().map(|g| g.as_ref().to_string())).prune(table)
}
