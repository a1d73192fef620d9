//! In-memory tables of time-ordered measurements.
//!
//! A [`Table`] is a dense `rows × columns` block of `f64` with a
//! [`ColumnTag`] per column and the original raw-row position of every row.
//! Row order is time order. Every operation here returns a new table; the
//! receiver is never mutated.
//!
//! # Memory
//!
//! Values are stored contiguously in an `Array2<f64>`: `8 × rows × columns`
//! bytes. Windowing multiplies the column count by `total_inputs +
//! total_outputs`, so size the raw table accordingly.
//!
//! # CSV
//!
//! The header row gives the column names; suffixes `_t-K`, `_t`, `_t+K` are
//! parsed into tags so saved windowed tables load back with their structure.
//! Empty or unparsable cells load as `NaN` and are handled by the
//! data-quality path downstream.

use crate::error::{PrepError, Result};
use crate::schema::ColumnTag;
use ndarray::{Array2, ArrayView1, Axis};
use std::collections::{BTreeSet, HashSet};
use std::fs::File;
use std::io::{Read, Write};
use std::ops::Range;
use std::path::Path;

/// Ordered rows sharing a fixed set of tagged columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<ColumnTag>,
    values: Array2<f64>,
    index: Vec<usize>,
}

impl Table {
    /// Create a table with row index `0..rows`.
    pub fn new(columns: Vec<ColumnTag>, values: Array2<f64>) -> Result<Self> {
        let index = (0..values.nrows()).collect();
        Self::with_index(columns, values, index)
    }

    /// Create a table with an explicit row index.
    ///
    /// # Errors
    ///
    /// - `ShapeMismatch` if the column or index count does not match `values`
    /// - `InvalidArgument` if two columns share a tag
    pub fn with_index(
        columns: Vec<ColumnTag>,
        values: Array2<f64>,
        index: Vec<usize>,
    ) -> Result<Self> {
        if columns.len() != values.ncols() {
            return Err(PrepError::shape_mismatch(
                "table columns",
                values.ncols(),
                columns.len(),
            ));
        }
        if index.len() != values.nrows() {
            return Err(PrepError::shape_mismatch(
                "table row index",
                values.nrows(),
                index.len(),
            ));
        }

        let mut seen = HashSet::with_capacity(columns.len());
        for tag in &columns {
            if !seen.insert(tag) {
                return Err(PrepError::invalid(format!("duplicate column '{tag}'")));
            }
        }

        Ok(Self {
            columns,
            values,
            index,
        })
    }

    /// Build a raw (untagged) table from named column vectors.
    ///
    /// # Example
    ///
    /// ```
    /// use grid_sequence_prep::Table;
    ///
    /// let table = Table::from_raw_columns(vec![
    ///     ("a", vec![0.0, 1.0, 2.0]),
    ///     ("b", vec![10.0, 11.0, 12.0]),
    /// ]).unwrap();
    /// assert_eq!(table.n_rows(), 3);
    /// assert_eq!(table.column_names(), vec!["a", "b"]);
    /// ```
    pub fn from_raw_columns<S: Into<String>>(columns: Vec<(S, Vec<f64>)>) -> Result<Self> {
        let tagged = columns
            .into_iter()
            .map(|(name, values)| (ColumnTag::raw(name), values))
            .collect();
        Self::from_tagged_columns(tagged)
    }

    /// Build a table from tagged column vectors of equal length.
    pub fn from_tagged_columns(columns: Vec<(ColumnTag, Vec<f64>)>) -> Result<Self> {
        let n_rows = columns.first().map_or(0, |(_, v)| v.len());
        let mut values = Array2::<f64>::zeros((n_rows, columns.len()));
        let mut tags = Vec::with_capacity(columns.len());

        for (j, (tag, data)) in columns.into_iter().enumerate() {
            if data.len() != n_rows {
                return Err(PrepError::shape_mismatch(
                    format!("length of column '{tag}'"),
                    n_rows,
                    data.len(),
                ));
            }
            values
                .column_mut(j)
                .iter_mut()
                .zip(data)
                .for_each(|(dst, v)| *dst = v);
            tags.push(tag);
        }

        Self::new(tags, values)
    }

    /// Number of rows.
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    /// Number of columns.
    #[inline]
    pub fn n_cols(&self) -> usize {
        self.values.ncols()
    }

    /// True if the table has no rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n_rows() == 0
    }

    /// Column tags in order.
    pub fn columns(&self) -> &[ColumnTag] {
        &self.columns
    }

    /// Dense values, `rows × columns`.
    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Original raw-row position of every row.
    pub fn index(&self) -> &[usize] {
        &self.index
    }

    /// Wire names of all columns.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(ToString::to_string).collect()
    }

    /// Position of a column by tag.
    pub fn position(&self, tag: &ColumnTag) -> Option<usize> {
        self.columns.iter().position(|t| t == tag)
    }

    /// Position of a column by wire name.
    pub fn position_by_name(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|t| t.to_string() == name)
    }

    /// Values of one column.
    pub fn column(&self, tag: &ColumnTag) -> Option<ArrayView1<'_, f64>> {
        self.position(tag).map(|j| self.values.column(j))
    }

    /// Distinct base names in first-seen order.
    pub fn base_names(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.columns
            .iter()
            .map(ColumnTag::base)
            .filter(|b| seen.insert(*b))
            .collect()
    }

    /// Distinct offsets present, ascending. Raw columns contribute nothing.
    pub fn offsets(&self) -> BTreeSet<i64> {
        self.columns.iter().filter_map(ColumnTag::offset).collect()
    }

    /// True if any column carries a timestep offset.
    pub fn is_windowed(&self) -> bool {
        self.columns.iter().any(|t| !t.is_raw())
    }

    /// Copy of a contiguous row range. The range is clamped to the table.
    pub fn slice_rows(&self, range: Range<usize>) -> Table {
        let end = range.end.min(self.n_rows());
        let start = range.start.min(end);
        Table {
            columns: self.columns.clone(),
            values: self.values.slice(ndarray::s![start..end, ..]).to_owned(),
            index: self.index[start..end].to_vec(),
        }
    }

    /// Copy of the selected columns, in the given order.
    ///
    /// Positions must be in range; duplicates are rejected.
    pub fn select_columns(&self, positions: &[usize]) -> Result<Table> {
        if let Some(&bad) = positions.iter().find(|&&j| j >= self.n_cols()) {
            return Err(PrepError::invalid(format!(
                "column position {bad} out of range for {} columns",
                self.n_cols()
            )));
        }
        let columns = positions.iter().map(|&j| self.columns[j].clone()).collect();
        let values = self.values.select(Axis(1), positions);
        Table::with_index(columns, values, self.index.clone())
    }

    /// Copy keeping only columns whose tag satisfies `keep`.
    pub fn filter_columns<F>(&self, mut keep: F) -> Table
    where
        F: FnMut(&ColumnTag) -> bool,
    {
        let positions: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, t)| keep(*t))
            .map(|(j, _)| j)
            .collect();
        Table {
            columns: positions.iter().map(|&j| self.columns[j].clone()).collect(),
            values: self.values.select(Axis(1), &positions),
            index: self.index.clone(),
        }
    }

    /// Number of NaN or infinite cells.
    pub fn non_finite_count(&self) -> usize {
        self.values.iter().filter(|v| !v.is_finite()).count()
    }

    /// Decompose into `(columns, values, index)`.
    pub fn into_parts(self) -> (Vec<ColumnTag>, Array2<f64>, Vec<usize>) {
        (self.columns, self.values, self.index)
    }

    // ------------------------------------------------------------------------
    // CSV I/O
    // ------------------------------------------------------------------------

    /// Load a table from a CSV file, parsing `_t`/`_t-K`/`_t+K` header suffixes.
    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Table> {
        Self::load_csv(path.as_ref(), ColumnTag::parse)
    }

    /// Load an un-windowed table from a CSV file; every header is a raw name.
    pub fn read_raw_csv<P: AsRef<Path>>(path: P) -> Result<Table> {
        Self::load_csv(path.as_ref(), |name| ColumnTag::raw(name))
    }

    fn load_csv(path: &Path, tag: fn(&str) -> ColumnTag) -> Result<Table> {
        let file = File::open(path)?;
        let table = Self::parse_csv(file, tag)?;
        log::debug!(
            "Loaded {} rows × {} columns from {}",
            table.n_rows(),
            table.n_cols(),
            path.display()
        );
        Ok(table)
    }

    /// Parse CSV with tagged headers from any reader.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Table> {
        Self::parse_csv(reader, ColumnTag::parse)
    }

    /// Parse CSV with raw headers from any reader.
    pub fn from_raw_csv_reader<R: Read>(reader: R) -> Result<Table> {
        Self::parse_csv(reader, |name| ColumnTag::raw(name))
    }

    fn parse_csv<R: Read>(reader: R, tag: fn(&str) -> ColumnTag) -> Result<Table> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let columns: Vec<ColumnTag> = reader.headers()?.iter().map(tag).collect();
        let n_cols = columns.len();

        let mut flat = Vec::new();
        let mut n_rows = 0usize;
        let mut unparsed = 0usize;
        for record in reader.records() {
            let record = record?;
            if record.len() != n_cols {
                return Err(PrepError::shape_mismatch(
                    format!("CSV row {}", n_rows + 1),
                    n_cols,
                    record.len(),
                ));
            }
            for cell in record.iter() {
                let value = if cell.is_empty() {
                    f64::NAN
                } else {
                    cell.parse::<f64>().unwrap_or_else(|_| {
                        unparsed += 1;
                        f64::NAN
                    })
                };
                flat.push(value);
            }
            n_rows += 1;
        }

        if unparsed > 0 {
            log::warn!("{unparsed} non-numeric CSV cells loaded as NaN");
        }

        let values = Array2::from_shape_vec((n_rows, n_cols), flat)?;
        Table::new(columns, values)
    }

    /// Write the table as CSV with wire-name headers.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        self.to_csv_writer(file)
    }

    /// Write CSV to any writer.
    pub fn to_csv_writer<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(self.column_names())?;
        for row in self.values.rows() {
            writer.write_record(row.iter().map(|v| v.to_string()))?;
        }
        writer.flush()?;
        Ok(())
    }
}
