//! End-to-end pipeline tests over flow files on disk.

use std::fs;
use std::path::{Path, PathBuf};
use stream_feature_extractor::{
    FeatureError, Pipeline, PipelineBuilder, PipelineConfig, FEATURE_COLUMNS,
};
use tempfile::{tempdir, TempDir};

// ============================================================================
// Test Fixtures
// ============================================================================

/// Write `(time, size, dir)` rows as a preprocessed flow file.
fn write_flow(dir: &Path, name: &str, rows: &[(i64, i64, i64)]) -> PathBuf {
    let path = dir.join(name);
    let mut body = String::from(",time,size,dir\n");
    for (i, (time, size, d)) in rows.iter().enumerate() {
        body.push_str(&format!("{i},{time},{size},{d}\n"));
    }
    fs::write(&path, body).unwrap();
    path
}

/// 100 packets, 10 ms apart, alternating sent/received, 500 bytes each.
fn alternating_rows(offset: i64) -> Vec<(i64, i64, i64)> {
    (0..100)
        .map(|i| (offset + i * 10, 500, if i % 2 == 0 { 1 } else { 2 }))
        .collect()
}

/// Two minutes of downlink bursts every 4 s with sparse uplink acks.
fn bursty_rows() -> Vec<(i64, i64, i64)> {
    let mut rows = Vec::new();
    for burst in 0..30 {
        let base = burst * 4_000;
        rows.push((base, 90, 1));
        for k in 0..20 {
            rows.push((base + 5 + k * 3, 1400, 2));
        }
        rows.push((base + 2_000, 120, 1));
        rows.push((base + 2_010, 300, 2));
    }
    rows
}

struct Fixture {
    _source: TempDir,
    _out: TempDir,
    config: PipelineConfig,
}

fn fixture() -> Fixture {
    let source = tempdir().unwrap();
    let out = tempdir().unwrap();

    write_flow(source.path(), "preprocessed_video_01.csv", &alternating_rows(0));
    write_flow(source.path(), "preprocessed_video_02.csv", &bursty_rows());
    write_flow(
        source.path(),
        "preprocessed_novideo_01.csv",
        &alternating_rows(1_000),
    );
    // Not matched by the prefix
    write_flow(source.path(), "raw_capture.csv", &alternating_rows(0));

    let config = PipelineBuilder::new()
        .source_dir(source.path())
        .output(out.path(), "features.csv")
        .threads(2)
        .build_config()
        .unwrap();

    Fixture {
        _source: source,
        _out: out,
        config,
    }
}

fn read_matrix(path: &Path) -> (Vec<String>, Vec<Vec<f64>>) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let header = reader.headers().unwrap().iter().map(String::from).collect();
    let rows = reader
        .records()
        .map(|r| r.unwrap().iter().map(|v| v.parse::<f64>().unwrap()).collect())
        .collect();
    (header, rows)
}

fn no_output_files(dir: &Path) -> bool {
    fs::read_dir(dir).map(|mut it| it.next().is_none()).unwrap_or(true)
}

// ============================================================================
// Successful runs
// ============================================================================

#[test]
fn test_run_writes_labelled_matrix() {
    let fx = fixture();
    let output = Pipeline::from_config(fx.config.clone()).unwrap().run().unwrap();

    assert_eq!(output.flows, 3);
    assert_eq!(output.threads, 2);
    assert!(output.rows >= 3);
    assert_eq!(output.windows, output.skipped + output.dropped_incomplete + output.rows);

    let path = output.output_path.clone().unwrap();
    assert_eq!(path, fx.config.output_path());

    let (header, rows) = read_matrix(&path);
    assert_eq!(header, FEATURE_COLUMNS);
    assert_eq!(rows.len(), output.rows);

    let streaming: Vec<f64> = rows.iter().map(|r| r[13]).collect();
    assert!(streaming.iter().all(|&v| v == 0.0 || v == 1.0));
    assert_eq!(streaming.iter().filter(|&&v| v == 0.0).count(), 1);
    assert!(rows.iter().flatten().all(|v| v.is_finite()));
}

#[test]
fn test_alternating_flow_row_values() {
    let source = tempdir().unwrap();
    let out = tempdir().unwrap();
    write_flow(source.path(), "preprocessed_a.csv", &alternating_rows(0));

    let output = PipelineBuilder::new()
        .source_dir(source.path())
        .output(out.path(), "features.csv")
        .build()
        .unwrap()
        .run()
        .unwrap();
    assert_eq!(output.rows, 1);

    let (_, rows) = read_matrix(&output.output_path.unwrap());
    let row = &rows[0];
    assert_eq!(row[0], 1.0); // bytes_sr_ratio
    assert_eq!(row[1], 1.0); // count_sr_ratio
    assert_eq!(row[2], 10.0); // smoothed_mean_delay_10s
    assert_eq!(row[3], 10.0); // smoothed_mean_delay_60s
    assert_eq!(row[4], 500.0);
    assert_eq!(row[5], 500.0);
    assert_eq!(&row[6..10], &[0.0, 0.0, 0.0, 0.0]);
    assert_eq!(row[10], 1.0);
    assert_eq!(row[11], 1.0);
    assert_eq!(row[13], 1.0);
}

#[test]
fn test_repeated_runs_produce_same_rows() {
    let fx = fixture();

    let first = Pipeline::from_config(fx.config.clone()).unwrap();
    let out1 = first.run().unwrap().output_path.unwrap();
    let (_, mut rows1) = read_matrix(&out1);

    let second_config = fx
        .config
        .clone()
        .with_output(&fx.config.out_dir, "features_again.csv");
    let out2 = Pipeline::from_config(second_config)
        .unwrap()
        .run()
        .unwrap()
        .output_path
        .unwrap();
    let (_, mut rows2) = read_matrix(&out2);

    let key = |a: &Vec<f64>, b: &Vec<f64>| {
        a.iter()
            .zip(b)
            .map(|(x, y)| x.total_cmp(y))
            .find(|o| o.is_ne())
            .unwrap_or(std::cmp::Ordering::Equal)
    };
    rows1.sort_by(key);
    rows2.sort_by(key);
    assert_eq!(rows1, rows2);
}

#[test]
fn test_dropped_input_rows_are_counted() {
    let source = tempdir().unwrap();
    let out = tempdir().unwrap();
    let path = source.path().join("preprocessed_gaps.csv");
    let mut body = String::from("time,size,dir\n");
    for (time, size, dir) in alternating_rows(0) {
        body.push_str(&format!("{time},{size},{dir}\n"));
    }
    body.push_str("1000,,2\n");
    body.push_str(",500,1\n");
    fs::write(&path, body).unwrap();

    let output = PipelineBuilder::new()
        .source_dir(source.path())
        .output(out.path(), "features.csv")
        .build()
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(output.dropped_input_rows, 2);
    assert_eq!(output.packets, 100);
    assert_eq!(output.rows, 1);
}

#[test]
fn test_numpy_export_alongside_csv() {
    let fx = fixture();
    let config = fx.config.clone().with_numpy_export(true);
    let output = Pipeline::from_config(config.clone()).unwrap().run().unwrap();

    assert!(config.out_dir.join("features.npy").exists());
    assert!(config.out_dir.join("labels.npy").exists());

    let metadata: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(config.out_dir.join("metadata.json")).unwrap())
            .unwrap();
    assert_eq!(metadata["n_rows"], output.rows);
    assert_eq!(metadata["n_features"], 13);
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_missing_source_dir() {
    let out = tempdir().unwrap();
    let result = PipelineBuilder::new()
        .source_dir(out.path().join("does_not_exist"))
        .output(out.path(), "features.csv")
        .build()
        .unwrap()
        .run();

    assert!(matches!(result, Err(FeatureError::SourceDirMissing(_))));
    assert!(!out.path().join("features.csv").exists());
}

#[test]
fn test_no_matching_flows() {
    let source = tempdir().unwrap();
    let out = tempdir().unwrap();
    write_flow(source.path(), "other_a.csv", &alternating_rows(0));

    let result = PipelineBuilder::new()
        .source_dir(source.path())
        .output(out.path(), "features.csv")
        .build()
        .unwrap()
        .run();

    assert!(matches!(result, Err(FeatureError::NoFlows { .. })));
}

#[test]
fn test_malformed_flow_aborts_without_output() {
    let fx = fixture();
    write_flow(
        &fx.config.source_dir,
        "preprocessed_broken.csv",
        &[(0, 100, 1), (10, 200, 3), (20, 100, 2)],
    );

    let result = Pipeline::from_config(fx.config.clone()).unwrap().run();
    assert!(matches!(
        result,
        Err(FeatureError::MalformedRecord { row: 2, .. })
    ));
    assert!(no_output_files(&fx.config.out_dir));
}

#[test]
fn test_uplink_only_flows_yield_empty_matrix() {
    let source = tempdir().unwrap();
    let out = tempdir().unwrap();
    let rows: Vec<(i64, i64, i64)> = (0..50).map(|i| (i * 100, 80, 1)).collect();
    write_flow(source.path(), "preprocessed_uplink.csv", &rows);

    let result = PipelineBuilder::new()
        .source_dir(source.path())
        .output(out.path(), "features.csv")
        .build()
        .unwrap()
        .run();

    assert!(matches!(
        result,
        Err(FeatureError::EmptyMatrix { windows: 1 })
    ));
    assert!(no_output_files(out.path()));
}

/// Names in `dir`, sorted.
fn entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn test_failed_numpy_write_leaves_no_csv() {
    let fx = fixture();
    let config = fx.config.clone().with_numpy_export(true);
    // The NumPy staging file cannot be created over a directory
    fs::create_dir(config.out_dir.join("features.npy.partial")).unwrap();

    let result = Pipeline::from_config(config.clone()).unwrap().run();

    assert!(matches!(result, Err(FeatureError::Io(_))));
    assert!(!config.output_path().exists());
    assert_eq!(entries(&config.out_dir), ["features.npy.partial"]);
}

#[test]
fn test_failed_numpy_commit_rolls_back_csv() {
    let fx = fixture();
    let config = fx.config.clone().with_numpy_export(true);
    // A non-empty directory cannot be replaced by the renamed array file
    let blocked = config.out_dir.join("labels.npy");
    fs::create_dir(&blocked).unwrap();
    fs::write(blocked.join("keep"), "x").unwrap();

    let result = Pipeline::from_config(config.clone()).unwrap().run();

    assert!(result.is_err());
    assert!(!config.output_path().exists());
    assert!(!config.out_dir.join("features.npy").exists());
    assert_eq!(entries(&config.out_dir), ["labels.npy"]);
}
