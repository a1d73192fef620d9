//! Parallel batch processing for independent datasets.
//!
//! Runs the same [`Pipeline`] over many tables (or CSV files) on a local
//! Rayon thread pool. Each source is windowed, split and reshaped on its
//! own; nothing is shared between sources except the immutable pipeline,
//! so every source keeps its own training divisor.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                   BatchProcessor                      │
//! │  ┌─────────────────────────────────────────────────┐  │
//! │  │              Rayon Thread Pool                  │  │
//! │  │                                                 │  │
//! │  │  site_a.csv      site_b.csv      site_n.csv     │  │
//! │  │      │               │               │          │  │
//! │  │      ▼               ▼               ▼          │  │
//! │  │  Pipeline::process (shared, read-only)          │  │
//! │  │      │               │               │          │  │
//! │  │  SourceResult    SourceResult    SourceResult   │  │
//! │  └──────────────────────┬──────────────────────────┘  │
//! │                         ▼                             │
//! │                    BatchOutput                        │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use grid_sequence_prep::batch::{BatchConfig, BatchProcessor, ErrorMode};
//!
//! let processor = BatchProcessor::new(
//!     pipeline_config,
//!     BatchConfig::new().with_threads(4).with_error_mode(ErrorMode::CollectErrors),
//! )?;
//! let output = processor.process_files(&["site_a.csv", "site_b.csv"])?;
//! println!("{} ok, {} failed in {:?}", output.successful_count(), output.failed_count(), output.elapsed);
//! ```

use crate::config::PipelineConfig;
use crate::error::{PrepError, Result};
use crate::pipeline::{Pipeline, PipelineOutput};
use crate::table::Table;
use rayon::prelude::*;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

// ============================================================================
// Configuration
// ============================================================================

/// Error handling mode for batch processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Return the first failure as an error (default).
    #[default]
    FailFast,

    /// Keep processing and report failures in [`BatchOutput::errors`].
    CollectErrors,
}

/// Configuration for batch processing.
#[derive(Debug, Clone, Default)]
pub struct BatchConfig {
    /// Worker threads; `None` uses Rayon's default (typically the CPU count).
    pub num_threads: Option<usize>,

    /// How to handle per-source failures.
    pub error_mode: ErrorMode,
}

impl BatchConfig {
    /// Create a new batch configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of threads to use (`0` falls back to the default).
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.num_threads = (threads > 0).then_some(threads);
        self
    }

    /// Set the error handling mode.
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Configured threads or Rayon's default.
    pub fn effective_threads(&self) -> usize {
        self.num_threads.unwrap_or_else(rayon::current_num_threads)
    }
}

// ============================================================================
// Results
// ============================================================================

/// Result from processing one source.
#[derive(Debug, Clone)]
pub struct SourceResult {
    /// Source name (table name or file path).
    pub name: String,

    /// Prepared tensors and labels.
    pub output: PipelineOutput,

    /// Processing time for this source.
    pub elapsed: Duration,
}

impl SourceResult {
    /// Train + test samples.
    pub fn samples(&self) -> usize {
        self.output.train.n_samples() + self.output.test.n_samples()
    }
}

/// Failure information for one source.
#[derive(Debug, Clone)]
pub struct SourceError {
    /// Source name.
    pub name: String,

    /// Error message.
    pub error: String,
}

/// Aggregated results from batch processing, in input order.
#[derive(Debug)]
pub struct BatchOutput {
    /// Successfully processed sources.
    pub results: Vec<SourceResult>,

    /// Failed sources (only populated with [`ErrorMode::CollectErrors`]).
    pub errors: Vec<SourceError>,

    /// Wall-clock time.
    pub elapsed: Duration,

    /// Number of threads used.
    pub threads_used: usize,
}

impl BatchOutput {
    /// Count of successfully processed sources.
    pub fn successful_count(&self) -> usize {
        self.results.len()
    }

    /// Count of failed sources.
    pub fn failed_count(&self) -> usize {
        self.errors.len()
    }

    /// Samples across all successful sources.
    pub fn total_samples(&self) -> usize {
        self.results.iter().map(SourceResult::samples).sum()
    }

    /// True if no source failed.
    pub fn all_successful(&self) -> bool {
        self.errors.is_empty()
    }
}

// ============================================================================
// Batch Processor
// ============================================================================

/// Parallel processor for many independent sources.
pub struct BatchProcessor {
    pipeline: Arc<Pipeline>,
    batch_config: BatchConfig,
}

impl BatchProcessor {
    /// Create a processor; the pipeline configuration is validated once here.
    pub fn new(pipeline_config: PipelineConfig, batch_config: BatchConfig) -> Result<Self> {
        Ok(Self {
            pipeline: Arc::new(Pipeline::from_config(pipeline_config)?),
            batch_config,
        })
    }

    /// Get the batch configuration.
    pub fn batch_config(&self) -> &BatchConfig {
        &self.batch_config
    }

    /// Process named in-memory tables.
    pub fn process_tables(&self, tables: &[(String, Table)]) -> Result<BatchOutput> {
        self.run(tables, |(name, table)| {
            (name.clone(), self.pipeline.process(table))
        })
    }

    /// Read and process CSV files.
    pub fn process_files<P: AsRef<Path> + Sync>(&self, files: &[P]) -> Result<BatchOutput> {
        self.run(files, |file| {
            let path = file.as_ref();
            (path.display().to_string(), self.pipeline.process_file(path))
        })
    }

    fn run<T, F>(&self, sources: &[T], process: F) -> Result<BatchOutput>
    where
        T: Sync,
        F: Fn(&T) -> (String, Result<PipelineOutput>) + Sync,
    {
        let start = Instant::now();
        let threads_used = self.batch_config.effective_threads();

        // A local pool so different processors can use different thread counts
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads_used)
            .build()
            .map_err(|e| PrepError::Batch(format!("failed to create thread pool: {e}")))?;

        let outcomes: Vec<std::result::Result<SourceResult, SourceError>> = pool.install(|| {
            sources
                .par_iter()
                .map(|source| {
                    let started = Instant::now();
                    match process(source) {
                        (name, Ok(output)) => Ok(SourceResult {
                            name,
                            output,
                            elapsed: started.elapsed(),
                        }),
                        (name, Err(e)) => {
                            log::warn!("{name}: {e}");
                            Err(SourceError {
                                name,
                                error: e.to_string(),
                            })
                        }
                    }
                })
                .collect()
        });

        let mut results = Vec::new();
        let mut errors = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(result) => results.push(result),
                Err(failure) => {
                    if self.batch_config.error_mode == ErrorMode::FailFast {
                        return Err(PrepError::Batch(format!(
                            "failed to process {}: {}",
                            failure.name, failure.error
                        )));
                    }
                    errors.push(failure);
                }
            }
        }

        let output = BatchOutput {
            results,
            errors,
            elapsed: start.elapsed(),
            threads_used,
        };
        log::info!(
            "Batch: {} ok, {} failed on {} threads in {:?}",
            output.successful_count(),
            output.failed_count(),
            threads_used,
            output.elapsed
        );
        Ok(output)
    }
}

/// Process CSV files with default batch settings.
pub fn process_files_parallel<P: AsRef<Path> + Sync>(
    pipeline_config: &PipelineConfig,
    files: &[P],
) -> Result<BatchOutput> {
    BatchProcessor::new(pipeline_config.clone(), BatchConfig::default())?.process_files(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::PipelineBuilder;

    fn table(seed: usize, rows: usize) -> Table {
        Table::from_raw_columns(vec![
            ("a", (0..rows).map(|i| ((i + seed) % 6) as f64).collect()),
            ("b", (0..rows).map(|i| ((i * seed + 1) % 5) as f64).collect()),
        ])
        .unwrap()
    }

    fn config() -> PipelineConfig {
        PipelineBuilder::new().window(2, 1).grid(1, 2).build_config().unwrap()
    }

    #[test]
    fn test_tables_processed_in_order() {
        let processor = BatchProcessor::new(config(), BatchConfig::new().with_threads(2)).unwrap();
        let tables: Vec<(String, Table)> =
            (1..=4).map(|s| (format!("t{s}"), table(s, 30))).collect();
        let output = processor.process_tables(&tables).unwrap();

        assert!(output.all_successful());
        assert_eq!(output.threads_used, 2);
        let names: Vec<_> = output.results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["t1", "t2", "t3", "t4"]);
        assert_eq!(output.total_samples(), 4 * 28);
    }

    #[test]
    fn test_each_source_fits_its_own_divisor() {
        let processor = BatchProcessor::new(config(), BatchConfig::new()).unwrap();
        let small = table(1, 30);
        let big = Table::new(small.columns().to_vec(), small.values().mapv(|v| v * 10.0)).unwrap();
        let output = processor
            .process_tables(&[("small".to_string(), small), ("big".to_string(), big)])
            .unwrap();
        assert_eq!(output.results[1].output.divisor, output.results[0].output.divisor * 10.0);
    }

    #[test]
    fn test_error_modes() {
        let tables = vec![
            ("ok".to_string(), table(1, 30)),
            ("short".to_string(), table(1, 2)),
        ];

        let fail_fast = BatchProcessor::new(config(), BatchConfig::new()).unwrap();
        assert!(matches!(
            fail_fast.process_tables(&tables),
            Err(PrepError::Batch(_))
        ));

        let collect = BatchProcessor::new(
            config(),
            BatchConfig::new().with_error_mode(ErrorMode::CollectErrors),
        )
        .unwrap();
        let output = collect.process_tables(&tables).unwrap();
        assert_eq!(output.successful_count(), 1);
        assert_eq!(output.failed_count(), 1);
        assert_eq!(output.errors[0].name, "short");
        assert!(!output.all_successful());
        assert_eq!(output.total_samples(), 28);
    }

    #[test]
    fn test_process_files_reads_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site.csv");
        table(3, 30).write_csv(&path).unwrap();

        let output = process_files_parallel(&config(), &[&path]).unwrap();
        assert_eq!(output.successful_count(), 1);
        assert!(output.results[0].name.ends_with("site.csv"));
    }
}
