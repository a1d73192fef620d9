//! Recurrent sample construction.
//!
//! Turns a flat, time-ordered table into labeled training windows:
//!
//! - [`WindowBuilder`] / [`make_recurrent`]: lagged + leading copies of every column
//! - [`partition`]: leading/trailing chronological split
//! - [`split_recurrent`]: input (`_t-K`) vs output (`_t`, `_t+K`) columns
//!
//! # Example
//!
//! ```
//! use grid_sequence_prep::sequence_builder::{
//!     partition, split_recurrent, ColumnSelection, WindowBuilder, WindowConfig,
//! };
//! use grid_sequence_prep::Table;
//!
//! let raw = Table::from_raw_columns(vec![("x", (0..20).map(f64::from).collect())]).unwrap();
//! let windowed = WindowBuilder::new(WindowConfig::new(3, 1)).build(&raw).unwrap();
//! let (train, test) = partition(&windowed, 0.5).unwrap();
//! let (train_in, train_out) = split_recurrent(&train, &ColumnSelection::by_tag()).unwrap();
//!
//! assert_eq!(train.n_rows() + test.n_rows(), 17);
//! assert_eq!(train_in.n_cols(), 3);
//! assert_eq!(train_out.n_cols(), 1);
//! ```

mod split;
mod window;

pub use split::{partition, split_recurrent, ColumnSelection, SplitConfig};
pub use window::{make_recurrent, windowed_columns, WindowBuilder, WindowConfig};
