//! End-to-end pipeline tests.
//!
//! CSV in, tensors and labels out, exported to `.npy` and read back. Also
//! checks that a persisted divisor reproduces an earlier run exactly.

use grid_sequence_prep::export::NumpyExporter;
use grid_sequence_prep::prelude::*;
use ndarray::{Array2, Array5};
use ndarray_npy::ReadNpyExt;
use std::fs::File;
use std::io::Write;

/// 4 spatial cells plus two globals, 80 rows.
fn sensor_table() -> Table {
    let n = 80;
    let mut columns: Vec<(String, Vec<f64>)> = (0..4)
        .map(|k| {
            let values = (0..n)
                .map(|i| 50.0 + ((i * (k + 2)) % 13) as f64 * 2.5 - k as f64)
                .collect();
            (format!("cell_{k}"), values)
        })
        .collect();
    columns.push(("temperature".to_string(), (0..n).map(|i| 12.0 + (i % 9) as f64).collect()));
    columns.push(("humidity".to_string(), (0..n).map(|i| 0.4 + (i % 5) as f64 * 0.1).collect()));
    Table::from_raw_columns(columns).unwrap()
}

fn builder() -> PipelineBuilder {
    PipelineBuilder::new()
        .window(4, 1)
        .grid(2, 2)
        .global("temperature")
        .global("humidity")
        .forecast("temperature", 2)
        .classify(1.0, 0.05, true)
}

#[test]
fn test_full_pipeline_shapes() {
    let output = builder().build().unwrap().process(&sensor_table()).unwrap();

    // 80 - 4 = 76 windows -> 57 / 19; one label row dropped, then 2 for the forecast
    assert_eq!(output.train.inputs.shape(), &[54, 4, 5, 2, 2]);
    assert_eq!(output.test.inputs.shape(), &[16, 4, 5, 2, 2]);
    assert_eq!(output.train.labels.dim(), (54, 4));
    assert_eq!(output.test.labels.nrows(), 16);
    assert_eq!(
        output.channel_names,
        vec!["spatial", "temperature", "temperature_forecast_1", "temperature_forecast_2", "humidity"]
    );
    // Globals pruned from the targets
    assert_eq!(output.train.label_columns, vec!["cell_0_t", "cell_1_t", "cell_2_t", "cell_3_t"]);
    assert!(output.train.labels.iter().all(|v| [-1.0, 0.0, 1.0].contains(v)));

    let stats = output.train.label_stats.as_ref().unwrap();
    assert_eq!(stats.total, output.train.labels.len());
    assert_eq!(stats.total, 54 * 4);
    let counted = |class: f64| output.train.labels.iter().filter(|&&v| v == class).count();
    assert_eq!(stats.up_count, counted(1.0));
    assert_eq!(stats.down_count, counted(-1.0));
    assert_eq!(stats.stable_count, counted(0.0));
}

#[test]
fn test_csv_to_numpy_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("sensors.csv");
    sensor_table().write_csv(&csv_path).unwrap();

    let pipeline = builder().build().unwrap();
    let output = pipeline.process_file(&csv_path).unwrap();
    let metadata = NumpyExporter::new(dir.path().join("out"), "sensors")
        .export(&output)
        .unwrap();

    let train_inputs = Array5::<f64>::read_npy(
        File::open(dir.path().join("out/sensors_train_inputs.npy")).unwrap(),
    )
    .unwrap();
    assert_eq!(train_inputs, output.train.inputs);

    let test_labels = Array2::<i8>::read_npy(
        File::open(dir.path().join("out/sensors_test_labels.npy")).unwrap(),
    )
    .unwrap();
    assert_eq!(test_labels.mapv(f64::from), output.test.labels);

    assert_eq!(metadata.train_samples, 54);
    assert_eq!(metadata.input_shape, vec![4, 5, 2, 2]);

    let exported: usize = metadata.test_label_distribution.unwrap().values().sum();
    assert_eq!(exported, test_labels.len());
}

#[test]
fn test_persisted_divisor_reproduces_run() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = builder().build().unwrap();
    let first = pipeline.process(&sensor_table()).unwrap();
    NumpyExporter::new(dir.path(), "run1").export(&first).unwrap();

    let params = NormalizationParams::load_json(dir.path().join("run1_normalization.json")).unwrap();
    let second = pipeline
        .process_with_divisor(&sensor_table(), params.as_divisor().unwrap())
        .unwrap();

    assert_eq!(second.divisor, first.divisor);
    assert!(!second.divisor_fitted);
    assert_eq!(second.train.inputs, first.train.inputs);
    assert_eq!(second.test.inputs, first.test.inputs);
}

#[test]
fn test_test_partition_never_refits() {
    // Spike confined to the trailing rows
    let mut table = sensor_table();
    let (columns, mut values, _) = table.clone().into_parts();
    values[[78, 0]] = 10_000.0;
    table = Table::new(columns, values).unwrap();

    let output = PipelineBuilder::new()
        .window(2, 1)
        .grid(2, 2)
        .global("temperature")
        .global("humidity")
        .build()
        .unwrap()
        .process(&table)
        .unwrap();

    assert!(output.divisor < 100.0);
    let max_test = output.test.inputs.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    assert!(max_test > 100.0);
}

#[test]
fn test_config_file_drives_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let config = builder().experiment("sensors", "2x2 grid").build_config().unwrap();
    let path = dir.path().join("pipeline.toml");
    config.save_toml(&path).unwrap();

    let loaded = PipelineConfig::load_toml(&path).unwrap();
    assert_eq!(loaded.globals, config.globals);
    assert_eq!(loaded.grid, config.grid);

    let a = Pipeline::from_config(config).unwrap().process(&sensor_table()).unwrap();
    let b = Pipeline::from_config(loaded).unwrap().process(&sensor_table()).unwrap();
    assert_eq!(a.train.inputs, b.train.inputs);
    assert_eq!(a.train.labels, b.train.labels);
}

#[test]
fn test_csv_missing_cells_are_zero_filled() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gaps.csv");
    let mut file = File::create(&path).unwrap();
    writeln!(file, "a,b").unwrap();
    for i in 0..20 {
        if i == 5 {
            writeln!(file, "{i},").unwrap();
        } else {
            writeln!(file, "{i},{}", 20 - i).unwrap();
        }
    }
    drop(file);

    let table = Table::read_csv(&path).unwrap();
    assert_eq!(table.non_finite_count(), 1);

    let output = PipelineBuilder::new()
        .window(2, 1)
        .grid(1, 2)
        .build()
        .unwrap()
        .process(&table)
        .unwrap();
    // Raw row 5 appears at lag 2 and lag 1 of two training windows
    assert_eq!(output.train.replaced_non_finite, 2);
    assert!(output.train.inputs.iter().all(|v| v.is_finite()));
}

#[test]
fn test_csv_headers_resembling_tags_load_raw() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wind.csv");
    let mut file = File::create(&path).unwrap();
    writeln!(file, "wind_t,gust").unwrap();
    for i in 0..20 {
        writeln!(file, "{},{}", i % 7, (i * 3) % 5).unwrap();
    }
    drop(file);

    let output = PipelineBuilder::new()
        .window(2, 1)
        .grid(1, 2)
        .build()
        .unwrap()
        .process_file(&path)
        .unwrap();
    assert_eq!(output.train.label_columns, vec!["wind_t_t", "gust_t"]);
    assert_eq!(output.train.inputs.shape()[1..], [2, 1, 1, 2]);
}

#[test]
fn test_invalid_configuration_rejected() {
    let table = sensor_table();
    // 5 spatial columns (humidity not declared global) on a 2x2 grid
    let result = PipelineBuilder::new()
        .window(3, 1)
        .grid(2, 2)
        .global("temperature")
        .build()
        .unwrap()
        .process(&table);
    assert!(result.unwrap_err().is_invalid_argument());
}
