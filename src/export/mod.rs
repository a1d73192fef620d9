//! Data Export Module
//!
//! Export prepared tensors and labels for ML training.
//!
//! # Modules
//!
//! - **tensor_format**: grid tensor reshaping (spatial + broadcast channels)
//! - Core exports: NumPy (.npy) and JSON metadata
//!
//! # Files
//!
//! For a dataset named `grid`:
//!
//! | File | Shape / content |
//! |------|-----------------|
//! | `grid_train_inputs.npy` | `(N, T, C, R, W)` f64 |
//! | `grid_train_labels.npy` | `(N, D)` i8 (classification) or f64 (regression) |
//! | `grid_test_inputs.npy` | `(M, T, C, R, W)` f64 |
//! | `grid_test_labels.npy` | `(M, D)` |
//! | `grid_metadata.json` | shapes, channel and label names, class distribution |
//! | `grid_normalization.json` | training divisor ([`NormalizationParams`]) |
//!
//! # Example
//!
//! ```ignore
//! use grid_sequence_prep::export::NumpyExporter;
//!
//! let output = pipeline.process(&table)?;
//! let metadata = NumpyExporter::new("out", "grid").export(&output)?;
//! println!("{} train samples", metadata.train_samples);
//! ```

pub mod tensor_format;

use crate::error::Result;
use crate::pipeline::{PipelineOutput, PreparedSplit};
use crate::preprocessing::NormalizationParams;
use ndarray::{Array2, ArrayBase, Data, Dimension};
use ndarray_npy::{WritableElement, WriteNpyExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

// Re-export tensor formatting types
pub use tensor_format::{
    reshape_recurrent_input, GridConfig, GridLayout, ReshapeOutput, TensorReshaper,
};

/// Metadata about an exported dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportMetadata {
    /// Dataset name (file prefix)
    pub name: String,

    /// Training samples
    pub train_samples: usize,

    /// Testing samples
    pub test_samples: usize,

    /// Input tensor shape without the sample axis: `[T, C, R, W]`
    pub input_shape: Vec<usize>,

    /// Names along the channel axis
    pub channel_names: Vec<String>,

    /// Label column names
    pub label_columns: Vec<String>,

    /// Whether labels are direction classes
    pub classification: bool,

    /// Training label counts by class name (classification only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub train_label_distribution: Option<BTreeMap<String, usize>>,

    /// Testing label counts by class name (classification only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_label_distribution: Option<BTreeMap<String, usize>>,

    /// Divisor applied to both partitions
    pub divisor: f64,

    /// Non-finite input cells replaced with zero (train + test)
    pub replaced_non_finite: usize,

    /// Export timestamp
    pub export_timestamp: String,
}

/// NumPy exporter - writes `.npy` tensors and JSON sidecars.
#[derive(Debug, Clone)]
pub struct NumpyExporter {
    output_dir: PathBuf,
    name: String,
}

impl NumpyExporter {
    /// Create a new NumPy exporter.
    pub fn new<P: AsRef<Path>>(output_dir: P, name: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            name: name.into(),
        }
    }

    /// Output directory.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Path of `{name}_{suffix}` in the output directory.
    pub fn path(&self, suffix: &str) -> PathBuf {
        self.output_dir.join(format!("{}_{suffix}", self.name))
    }

    /// Export pipeline output.
    ///
    /// Creates the output directory if needed and overwrites existing files.
    pub fn export(&self, output: &PipelineOutput) -> Result<ExportMetadata> {
        fs::create_dir_all(&self.output_dir)?;

        self.export_split("train", &output.train, output.classification)?;
        self.export_split("test", &output.test, output.classification)?;

        let params = output.normalization_params();
        params.save_json(self.path("normalization.json"))?;

        let metadata = ExportMetadata {
            name: self.name.clone(),
            train_samples: output.train.n_samples(),
            test_samples: output.test.n_samples(),
            input_shape: output.train.inputs.shape()[1..].to_vec(),
            channel_names: output.channel_names.clone(),
            label_columns: output.train.label_columns.clone(),
            classification: output.classification,
            train_label_distribution: output.train.label_stats.as_ref().map(|s| s.distribution()),
            test_label_distribution: output.test.label_stats.as_ref().map(|s| s.distribution()),
            divisor: output.divisor,
            replaced_non_finite: output.train.replaced_non_finite + output.test.replaced_non_finite,
            export_timestamp: chrono::Utc::now().to_rfc3339(),
        };
        self.export_metadata(&metadata)?;

        log::info!(
            "Exported '{}' to {}: {} train / {} test samples, input {:?}",
            self.name,
            self.output_dir.display(),
            metadata.train_samples,
            metadata.test_samples,
            metadata.input_shape
        );

        Ok(metadata)
    }

    fn export_split(&self, split: &str, data: &PreparedSplit, classification: bool) -> Result<()> {
        self.write_npy(&format!("{split}_inputs.npy"), &data.inputs)?;

        let labels_file = format!("{split}_labels.npy");
        if classification {
            let labels: Array2<i8> = data.labels.mapv(|v| v as i8);
            self.write_npy(&labels_file, &labels)
        } else {
            self.write_npy(&labels_file, &data.labels)
        }
    }

    fn write_npy<A, S, D>(&self, suffix: &str, array: &ArrayBase<S, D>) -> Result<()>
    where
        A: WritableElement,
        S: Data<Elem = A>,
        D: Dimension,
    {
        let path = self.path(suffix);
        let file = BufWriter::new(File::create(&path)?);
        array.write_npy(file)?;
        log::debug!("Wrote {} {:?}", path.display(), array.shape());
        Ok(())
    }

    fn export_metadata(&self, metadata: &ExportMetadata) -> Result<()> {
        let file = BufWriter::new(File::create(self.path("metadata.json"))?);
        serde_json::to_writer_pretty(file, metadata)?;
        Ok(())
    }
}

/// Load the divisor written by an earlier export.
pub fn load_normalization<P: AsRef<Path>>(path: P) -> Result<NormalizationParams> {
    NormalizationParams::load_json(path)
}

/// Convenience function for direct export.
pub fn export_to_numpy<P: AsRef<Path>>(
    output: &PipelineOutput,
    output_dir: P,
    name: &str,
) -> Result<ExportMetadata> {
    NumpyExporter::new(output_dir, name).export(output)
}
