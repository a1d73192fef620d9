//! Pipeline configuration management.
//!
//! This module provides unified configuration for the whole preparation
//! pipeline (windowing, split, labeling, reshaping), with serialization
//! support for experiment reproducibility.
//!
//! # Features
//!
//! - **Unified Configuration**: Single struct combining all pipeline stages
//! - **Serialization**: Save/load configurations to TOML or JSON
//! - **Validation**: Ensure configurations are valid before use
//!
//! # Example
//!
//! ```toml
//! prune_globals = true
//!
//! [window]
//! total_inputs = 6
//! total_outputs = 1
//!
//! [split]
//! train_fraction = 0.75
//!
//! [discretize]
//! min_delta = 1.0
//! min_delta_pct = 0.1
//! require_both = true
//!
//! [grid]
//! rows = 4
//! columns = 4
//! layout = "row_major"
//!
//! [globals]
//! columns = ["temperature", "precipitation"]
//!
//! [globals.forecast]
//! temperature = 2
//! ```

use crate::error::{PrepError, Result};
use crate::export::tensor_format::GridConfig;
use crate::labeling::DiscretizeConfig;
use crate::preprocessing::Divisor;
use crate::schema::{ColumnTag, GlobalVariables};
use crate::sequence_builder::{ColumnSelection, SplitConfig, WindowConfig};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Unified pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Drop global variables from the output (label) side
    #[serde(default = "default_true")]
    pub prune_globals: bool,

    /// Window depth
    pub window: WindowConfig,

    /// Train/test split
    #[serde(default)]
    pub split: SplitConfig,

    /// Explicit input/output columns (tag rule when absent)
    #[serde(default)]
    pub columns: ColumnSelection,

    /// Direction labeling; `None` keeps regression targets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discretize: Option<DiscretizeConfig>,

    /// Spatial grid
    pub grid: GridConfig,

    /// Broadcast (non-spatial) variables
    #[serde(default)]
    pub globals: GlobalVariables,

    /// Divisor handling
    #[serde(default)]
    pub normalization: NormalizationConfig,

    /// Experiment metadata (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ExperimentMetadata>,
}

fn default_true() -> bool {
    true
}

/// Normalization divisor settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizationConfig {
    /// Fixed divisor; `None` or `0` fits max-abs on the training partition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub divisor: Option<f64>,
}

impl NormalizationConfig {
    /// Divisor to use for the training partition.
    pub fn divisor(&self) -> Divisor {
        Divisor::from(self.divisor)
    }
}

/// Experiment metadata for tracking and reproducibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentMetadata {
    /// Experiment name
    pub name: String,

    /// Description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Creation timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    /// Version or git commit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Custom tags
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl ExperimentMetadata {
    /// Metadata with just a name, stamped with the current time.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            created_at: Some(chrono::Utc::now().to_rfc3339()),
            version: None,
            tags: None,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            prune_globals: true,
            window: WindowConfig::default(),
            split: SplitConfig::default(),
            columns: ColumnSelection::default(),
            discretize: None,
            grid: GridConfig::default(),
            globals: GlobalVariables::default(),
            normalization: NormalizationConfig::default(),
            metadata: None,
        }
    }
}

impl PipelineConfig {
    /// Create a new pipeline configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set experiment metadata.
    pub fn with_metadata(mut self, metadata: ExperimentMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Validate every stage's settings.
    pub fn validate(&self) -> Result<()> {
        self.window.validate()?;
        self.split.validate()?;
        if let Some(discretize) = &self.discretize {
            discretize.validate()?;
        }
        self.grid.validate()?;
        self.globals.validate()?;
        self.normalization.divisor().validate()?;

        if self.prune_globals {
            for name in self.columns.outputs.iter().flatten() {
                if self.globals.contains(ColumnTag::parse(name).base()) {
                    log::warn!("Explicit output column '{name}' is a global and will be pruned");
                }
            }
        }

        Ok(())
    }

    /// Save configuration to TOML file.
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        save_toml(self, path)
    }

    /// Load and validate configuration from TOML file.
    pub fn load_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config: Self = load_toml(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to JSON file.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        save_json(self, path)
    }

    /// Load and validate configuration from JSON file.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config: Self = load_json(path)?;
        config.validate()?;
        Ok(config)
    }
}

// ============================================================================
// Dataset Configuration
// ============================================================================

/// Everything the `prepare_dataset` tool needs for one run.
///
/// ```toml
/// input = "data/grid_counts.csv"
/// output_dir = "out"
/// name = "grid_counts"
///
/// [pipeline.window]
/// total_inputs = 6
/// total_outputs = 1
///
/// [pipeline.grid]
/// rows = 4
/// columns = 4
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Raw CSV table (header row + one row per timestep)
    pub input: PathBuf,

    /// Directory receiving `.npy` and `.json` files
    pub output_dir: PathBuf,

    /// File name prefix
    pub name: String,

    /// Divisor file from an earlier run; when set, the training divisor is reused
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalization_params: Option<PathBuf>,

    /// Stage settings
    pub pipeline: PipelineConfig,
}

impl DatasetConfig {
    /// Create a dataset configuration.
    pub fn new<P1: AsRef<Path>, P2: AsRef<Path>>(
        input: P1,
        output_dir: P2,
        name: impl Into<String>,
        pipeline: PipelineConfig,
    ) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output_dir: output_dir.as_ref().to_path_buf(),
            name: name.into(),
            normalization_params: None,
            pipeline,
        }
    }

    /// Reuse a persisted divisor.
    pub fn with_normalization_params<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.normalization_params = Some(path.as_ref().to_path_buf());
        self
    }

    /// Validate names and pipeline settings (paths are not touched).
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(PrepError::invalid("dataset name must not be empty"));
        }
        if self.name.contains(['/', '\\']) {
            return Err(PrepError::invalid(format!(
                "dataset name '{}' must not contain path separators",
                self.name
            )));
        }
        self.pipeline.validate()
    }

    /// Check the input (and divisor file, if any) exist.
    pub fn validate_paths(&self) -> Result<()> {
        if !self.input.is_file() {
            return Err(PrepError::invalid(format!(
                "input file {} does not exist",
                self.input.display()
            )));
        }
        if let Some(path) = &self.normalization_params {
            if !path.is_file() {
                return Err(PrepError::invalid(format!(
                    "normalization file {} does not exist",
                    path.display()
                )));
            }
        }
        Ok(())
    }

    /// Save configuration to TOML file.
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        save_toml(self, path)
    }

    /// Load and validate configuration from TOML file.
    pub fn load_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config: Self = load_toml(path)?;
        config.validate()?;
        Ok(config)
    }
}

fn save_toml<T: Serialize, P: AsRef<Path>>(value: &T, path: P) -> Result<()> {
    let toml_string = toml::to_string_pretty(value)?;
    fs::write(path, toml_string)?;
    Ok(())
}

fn load_toml<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let contents = fs::read_to_string(path)?;
    Ok(toml::from_str(&contents)?)
}

fn save_json<T: Serialize, P: AsRef<Path>>(value: &T, path: P) -> Result<()> {
    let json_string = serde_json::to_string_pretty(value)?;
    fs::write(path, json_string)?;
    Ok(())
}

fn load_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ForecastHorizons;

    fn full_config() -> PipelineConfig {
        PipelineConfig {
            window: WindowConfig::new(4, 2),
            discretize: Some(DiscretizeConfig::default()),
            grid: GridConfig::new(3, 3),
            globals: GlobalVariables::new(["temp", "rain"])
                .with_forecast(ForecastHorizons::new().with("temp", 2).unwrap()),
            normalization: NormalizationConfig {
                divisor: Some(250.0),
            },
            ..PipelineConfig::default()
        }
        .with_metadata(ExperimentMetadata {
            name: "test_experiment".to_string(),
            description: Some("Test configuration".to_string()),
            created_at: None,
            version: Some("0.1.0".to_string()),
            tags: Some(vec!["test".to_string()]),
        })
    }

    #[test]
    fn test_pipeline_config_default() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.prune_globals);
        assert_eq!(config.normalization.divisor(), Divisor::Compute);
    }

    #[test]
    fn test_save_load_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = full_config();
        config.save_toml(&path).unwrap();
        let loaded = PipelineConfig::load_toml(&path).unwrap();

        assert_eq!(loaded, config);
        assert_eq!(loaded.globals.forecast.steps("temp"), 2);
    }

    #[test]
    fn test_save_load_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let config = full_config();
        config.save_json(&path).unwrap();
        let loaded = PipelineConfig::load_json(&path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let config: PipelineConfig = toml::from_str(
            r#"
            [window]
            total_inputs = 3
            total_outputs = 1

            [grid]
            rows = 2
            columns = 5
            "#,
        )
        .unwrap();

        assert!(config.validate().is_ok());
        assert!(config.prune_globals);
        assert!(config.discretize.is_none());
        assert_eq!(config.split.train_fraction, 0.75);
        assert!(config.globals.is_empty());
    }

    #[test]
    fn test_invalid_stages_rejected() {
        let mut config = PipelineConfig::default();
        config.split.train_fraction = 1.0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.grid.rows = 0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.normalization.divisor = Some(f64::NAN);
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.discretize = Some(DiscretizeConfig::new(1.0, 2.0, true));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_dataset_config_validation() {
        let config = DatasetConfig::new("in.csv", "out", "grid", PipelineConfig::default());
        assert!(config.validate().is_ok());
        // input does not exist
        assert!(config.validate_paths().is_err());

        let bad = DatasetConfig::new("in.csv", "out", "a/b", PipelineConfig::default());
        assert!(bad.validate().is_err());
        let empty = DatasetConfig::new("in.csv", "out", " ", PipelineConfig::default());
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_dataset_config_toml_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dataset.toml");

        let config = DatasetConfig::new("data/in.csv", "out", "grid", full_config())
            .with_normalization_params("out/grid_normalization.json");
        config.save_toml(&path).unwrap();

        let loaded = DatasetConfig::load_toml(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
