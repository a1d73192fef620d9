//! Table Validation Module
//!
//! Data-quality checks run on raw tables before any windowing, so problems
//! surface once, with the column names still readable, instead of as odd
//! values deep inside a 5-axis tensor.
//!
//! # Validation Categories
//!
//! 1. **Shape**: empty tables, too few rows for the configured window
//! 2. **Values**: NaN/Inf cells (zero-filled later, reported here)
//! 3. **Columns**: constant columns that carry no signal
//!
//! # Usage
//!
//! ```
//! use grid_sequence_prep::validation::{validate_table, ValidationConfig};
//! use grid_sequence_prep::Table;
//!
//! let table = Table::from_raw_columns(vec![("a", vec![1.0, f64::NAN, 3.0])]).unwrap();
//! let result = validate_table(&table, &ValidationConfig::default());
//!
//! assert!(!result.has_errors());
//! assert!(result.has_warnings());
//! ```

use crate::error::{PrepError, Result};
use crate::sequence_builder::WindowConfig;
use crate::table::Table;
use std::fmt;

/// Validation result for a single check.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationLevel {
    /// Data is valid
    Valid,
    /// Data has minor issues (warnings)
    Warning(String),
    /// Data has serious issues (errors)
    Error(String),
}

impl ValidationLevel {
    /// Check if this result indicates valid data.
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationLevel::Valid)
    }

    /// Check if this result is a warning.
    pub fn is_warning(&self) -> bool {
        matches!(self, ValidationLevel::Warning(_))
    }

    /// Check if this result is an error.
    pub fn is_error(&self) -> bool {
        matches!(self, ValidationLevel::Error(_))
    }
}

impl fmt::Display for ValidationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationLevel::Valid => write!(f, "Valid"),
            ValidationLevel::Warning(msg) => write!(f, "Warning: {msg}"),
            ValidationLevel::Error(msg) => write!(f, "Error: {msg}"),
        }
    }
}

/// Aggregated validation result.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    results: Vec<(String, ValidationLevel)>,
}

impl ValidationResult {
    /// Create a new empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a validation result.
    pub fn add(&mut self, check_name: &str, level: ValidationLevel) {
        self.results.push((check_name.to_string(), level));
    }

    /// Check if all validations passed (no errors or warnings).
    pub fn is_valid(&self) -> bool {
        self.results.iter().all(|(_, level)| level.is_valid())
    }

    /// Check if there are any errors.
    pub fn has_errors(&self) -> bool {
        self.results.iter().any(|(_, level)| level.is_error())
    }

    /// Check if there are any warnings.
    pub fn has_warnings(&self) -> bool {
        self.results.iter().any(|(_, level)| level.is_warning())
    }

    /// Get all warnings as `check: message`.
    pub fn warnings(&self) -> Vec<String> {
        self.results
            .iter()
            .filter_map(|(name, level)| match level {
                ValidationLevel::Warning(msg) => Some(format!("{name}: {msg}")),
                _ => None,
            })
            .collect()
    }

    /// Get all errors as `check: message`.
    pub fn errors(&self) -> Vec<String> {
        self.results
            .iter()
            .filter_map(|(name, level)| match level {
                ValidationLevel::Error(msg) => Some(format!("{name}: {msg}")),
                _ => None,
            })
            .collect()
    }

    /// Get all results.
    pub fn all_results(&self) -> &[(String, ValidationLevel)] {
        &self.results
    }

    /// Get the number of checks performed.
    pub fn check_count(&self) -> usize {
        self.results.len()
    }

    /// Get the number of passed checks.
    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|(_, l)| l.is_valid()).count()
    }

    /// Turn errors into an `InvalidArgument`; warnings pass.
    pub fn ensure_no_errors(&self) -> Result<()> {
        if self.has_errors() {
            return Err(PrepError::invalid(format!(
                "table failed validation: {}",
                self.errors().join("; ")
            )));
        }
        Ok(())
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let passed = self.passed_count();
        let total = self.check_count();
        writeln!(f, "Validation: {passed}/{total} checks passed")?;

        for (name, level) in &self.results {
            if !level.is_valid() {
                writeln!(f, "  - {name}: {level}")?;
            }
        }

        Ok(())
    }
}

/// Configuration for table validation.
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    /// Rows needed to produce at least one window
    pub min_rows: usize,

    /// Check for NaN/Inf values
    pub check_non_finite: bool,

    /// Share of non-finite cells above which the table is rejected
    pub max_non_finite_ratio: f64,

    /// Warn about columns holding a single value
    pub check_constant_columns: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_rows: 1,
            check_non_finite: true,
            max_non_finite_ratio: 0.5,
            check_constant_columns: true,
        }
    }
}

impl ValidationConfig {
    /// Defaults with `min_rows` set to one full window.
    pub fn for_window(window: &WindowConfig) -> Self {
        Self {
            min_rows: window.width(),
            ..Self::default()
        }
    }
}

/// Run every enabled check on `table`.
pub fn validate_table(table: &Table, config: &ValidationConfig) -> ValidationResult {
    let mut result = ValidationResult::new();

    if table.n_rows() == 0 || table.n_cols() == 0 {
        result.add(
            "non_empty",
            ValidationLevel::Error(format!(
                "table is empty ({} rows × {} columns)",
                table.n_rows(),
                table.n_cols()
            )),
        );
        return result;
    }
    result.add("non_empty", ValidationLevel::Valid);

    let level = if table.n_rows() < config.min_rows {
        ValidationLevel::Error(format!(
            "{} rows, at least {} needed for one window",
            table.n_rows(),
            config.min_rows
        ))
    } else {
        ValidationLevel::Valid
    };
    result.add("min_rows", level);

    if config.check_non_finite {
        result.add("non_finite", check_non_finite(table, config.max_non_finite_ratio));
    }

    if config.check_constant_columns {
        result.add("constant_columns", check_constant_columns(table));
    }

    result
}

fn check_non_finite(table: &Table, max_ratio: f64) -> ValidationLevel {
    let count = table.non_finite_count();
    if count == 0 {
        return ValidationLevel::Valid;
    }
    let ratio = count as f64 / table.values().len() as f64;
    let msg = format!("{count} missing/non-finite cells ({:.2}%)", ratio * 100.0);
    if ratio > max_ratio {
        ValidationLevel::Error(msg)
    } else {
        ValidationLevel::Warning(format!("{msg}; they will be replaced with 0"))
    }
}

fn check_constant_columns(table: &Table) -> ValidationLevel {
    if table.n_rows() < 2 {
        return ValidationLevel::Valid;
    }
    let constant: Vec<String> = table
        .columns()
        .iter()
        .zip(table.values().columns())
        .filter(|(_, col)| {
            let first = col[0];
            col.iter().all(|&v| v == first)
        })
        .map(|(tag, _)| tag.to_string())
        .collect();

    match constant.len() {
        0 => ValidationLevel::Valid,
        n if n <= 5 => ValidationLevel::Warning(format!("constant columns: {}", constant.join(", "))),
        n => ValidationLevel::Warning(format!(
            "{n} constant columns, including {}",
            constant[..5].join(", ")
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_table_is_valid() {
        let table =
            Table::from_raw_columns(vec![("a", vec![1.0, 2.0, 3.0]), ("b", vec![3.0, 1.0, 2.0])])
                .unwrap();
        let result = validate_table(&table, &ValidationConfig::default());
        assert!(result.is_valid(), "{result}");
        assert_eq!(result.check_count(), 4);
        assert!(result.ensure_no_errors().is_ok());
    }

    #[test]
    fn test_empty_table_is_error() {
        let table = Table::from_raw_columns(vec![("a", vec![])]).unwrap();
        let result = validate_table(&table, &ValidationConfig::default());
        assert!(result.has_errors());
        assert!(result.ensure_no_errors().unwrap_err().is_invalid_argument());
    }

    #[test]
    fn test_too_few_rows_for_window() {
        let table = Table::from_raw_columns(vec![("a", vec![1.0, 2.0, 3.0])]).unwrap();
        let config = ValidationConfig::for_window(&WindowConfig::new(3, 2));
        let result = validate_table(&table, &config);
        assert!(result.has_errors());
        assert!(result.errors()[0].starts_with("min_rows"));
    }

    #[test]
    fn test_non_finite_warning_and_error() {
        let mostly_nan = Table::from_raw_columns(vec![("a", vec![f64::NAN, f64::NAN, 1.0])]).unwrap();
        assert!(validate_table(&mostly_nan, &ValidationConfig::default()).has_errors());

        let some_nan = Table::from_raw_columns(vec![("a", vec![f64::NAN, 2.0, 1.0])]).unwrap();
        let result = validate_table(&some_nan, &ValidationConfig::default());
        assert!(!result.has_errors());
        assert!(result.warnings()[0].starts_with("non_finite"));
    }

    #[test]
    fn test_constant_columns_warn() {
        let table =
            Table::from_raw_columns(vec![("a", vec![1.0, 1.0, 1.0]), ("b", vec![1.0, 2.0, 3.0])])
                .unwrap();
        let result = validate_table(&table, &ValidationConfig::default());
        assert_eq!(result.warnings(), vec!["constant_columns: constant columns: a"]);
    }
}
