//! Preprocessing applied around tensor reshaping.
//!
//! - **Normalization**: leakage-safe max-abs divisor
//!   - Fitted once on the training partition
//!   - Reused unchanged on every later partition
//!   - Persisted as JSON via [`NormalizationParams`]
//!
//! - **Pruning**: drop global variables from output tables
//!
//! # Example
//!
//! ```
//! use grid_sequence_prep::preprocessing::Divisor;
//!
//! let train_divisor = Divisor::Compute.resolve([4.0, -10.0, 2.0]).unwrap();
//! let test = Divisor::Fixed(train_divisor);
//! assert_eq!(test.resolve([1000.0]).unwrap(), 10.0);
//! ```

pub mod normalization;
pub mod pruning;

pub use normalization::{Divisor, MaxAbsNormalizer, NormalizationParams, Normalizer};
pub use pruning::{remove_global_columns, ColumnPruner};
