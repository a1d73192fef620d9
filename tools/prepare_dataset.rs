//! Grid Dataset Preparation Tool
//!
//! Configuration-driven export of grid sequence datasets from a CSV table.
//!
//! # Output Format
//!
//! - **Inputs**: `{name}_train_inputs.npy` / `{name}_test_inputs.npy` -
//!   shape `[N, timesteps, channels, rows, columns]`
//! - **Labels**: `{name}_train_labels.npy` / `{name}_test_labels.npy` -
//!   shape `[N, outputs]` (i8 directions or f64 targets)
//! - **Metadata**: `{name}_metadata.json`
//! - **Normalization**: `{name}_normalization.json` - training divisor
//!
//! # Usage
//!
//! ```bash
//! # From TOML config
//! cargo run --release --bin prepare_dataset -- --config configs/grid.toml
//!
//! # Generate sample config
//! cargo run --release --bin prepare_dataset -- --generate-config configs/grid.toml
//! ```
//!
//! Set `RUST_LOG=debug` for per-stage shapes.

use grid_sequence_prep::export::NumpyExporter;
use grid_sequence_prep::preprocessing::{Divisor, NormalizationParams};
use grid_sequence_prep::{DatasetConfig, ExportMetadata, Pipeline, PipelineBuilder, Result};
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("prepare_dataset");

    let result = match (args.get(1).map(String::as_str), args.get(2)) {
        (Some("--config"), Some(path)) => run_from_config(path),
        (Some("--generate-config"), Some(path)) => generate_sample_config(path),
        (Some("--help" | "-h"), _) => {
            print_usage(program);
            return ExitCode::SUCCESS;
        }
        (Some(flag @ ("--config" | "--generate-config")), None) => {
            eprintln!("Error: {flag} requires a path argument");
            return ExitCode::FAILURE;
        }
        _ => {
            print_usage(program);
            return ExitCode::FAILURE;
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn print_usage(program: &str) {
    eprintln!(
        r#"
Grid Dataset Preparation Tool

Usage:
    {program} --config <path.toml>       Prepare dataset from config file
    {program} --generate-config <path>   Generate sample config file
    {program} --help                     Show this help
"#
    );
}

/// Write a sample configuration file.
fn generate_sample_config(path: &str) -> Result<()> {
    let pipeline = PipelineBuilder::new()
        .window(6, 1)
        .grid(4, 4)
        .global("temperature")
        .forecast("temperature", 2)
        .classify(1.0, 0.10, true)
        .experiment("grid-sample", "4x4 grid, 6 lags, direction labels")
        .build_config()?;

    DatasetConfig::new("/path/to/table.csv", "/path/to/exports", "grid", pipeline)
        .save_toml(path)?;

    println!("Generated sample config: {path}");
    println!("\nEdit the following fields before running:");
    println!("  - input: CSV with one column per grid cell plus global columns");
    println!("  - output_dir: directory for .npy/.json files");
    println!("  - pipeline.grid: rows x columns must equal the spatial column count");
    Ok(())
}

/// Run preparation and export from a configuration file.
fn run_from_config(config_path: &str) -> Result<()> {
    let config = DatasetConfig::load_toml(config_path)?;
    config.validate_paths()?;
    log::info!("Loaded configuration: {config_path}");

    let pipeline = Pipeline::from_config(config.pipeline.clone())?;
    let output = match &config.normalization_params {
        Some(path) => {
            let params = NormalizationParams::load_json(path)?;
            log::info!("Reusing divisor {} from {}", params.divisor, path.display());
            let table = grid_sequence_prep::Table::read_raw_csv(&config.input)?;
            pipeline.process_with_divisor(&table, Divisor::Fixed(params.divisor))?
        }
        None => pipeline.process_file(&config.input)?,
    };

    let metadata = NumpyExporter::new(&config.output_dir, config.name.as_str()).export(&output)?;
    print_summary(&metadata);
    Ok(())
}

fn print_summary(metadata: &ExportMetadata) {
    println!();
    println!("Dataset '{}'", metadata.name);
    println!("  Train samples: {}", metadata.train_samples);
    println!("  Test samples:  {}", metadata.test_samples);
    println!("  Input shape:   {:?}", metadata.input_shape);
    println!("  Channels:      {}", metadata.channel_names.join(", "));
    println!("  Divisor:       {}", metadata.divisor);
    if let Some(distribution) = &metadata.train_label_distribution {
        println!("  Train labels:  {distribution:?}");
    }
    if metadata.replaced_non_finite > 0 {
        println!("  Non-finite cells replaced: {}", metadata.replaced_non_finite);
    }
}
