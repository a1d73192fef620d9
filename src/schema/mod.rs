//! Column Schema Module
//!
//! Structured naming for tabular time-series data.
//!
//! - [`ColumnTag`]: a column's `(base_name, offset)` identity, parsed once from
//!   the `_t-K` / `_t` / `_t+K` wire suffix and rendered back identically
//! - [`GlobalVariables`]: scalar variables broadcast across the spatial grid
//! - [`ForecastHorizons`]: forward-shifted copies to inject per global
//!
//! # Example
//!
//! ```
//! use grid_sequence_prep::schema::ColumnTag;
//!
//! let tags: Vec<ColumnTag> = ["a_t-2", "a_t-1", "a_t", "a_t+1"]
//!     .iter()
//!     .map(|s| ColumnTag::parse(s))
//!     .collect();
//! assert_eq!(tags.iter().filter(|t| t.is_input()).count(), 2);
//! ```

mod column_tag;
mod globals;

pub use column_tag::{ColumnTag, TIME_MARKER};
pub use globals::{ForecastHorizons, GlobalVariables};
