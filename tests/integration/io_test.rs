//! Tests for table IO and file-based configuration

use std::path::Path;

use spc_pipeline::{
    Frequency, MeasureCatalog, PipelineConfig, SpcError, SpcPipeline, SpcRecord,
    prepare_hospital_records, read_table, write_table,
};
use tempfile::TempDir;

use crate::utils::{config_with_month_window, monthly_records, raw_batch, run_pipeline};

fn scenario() -> Vec<spc_pipeline::RawRecord> {
    monthly_records("HAPI", 2024, &[10, 12, 11, 13, 9, 14], 100)
        .into_iter()
        .chain(monthly_records("Falls with Injury", 2024, &[2, 0, 1, 3, 1, 2], 4000))
        .map(|r| r.with_expected_events(1.4))
        .collect()
}

#[test]
fn test_csv_input_matches_in_memory_run() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("records.csv");
    write_table(&input, &raw_batch(&scenario())).unwrap();

    let raw = read_table(&input).unwrap();
    assert_eq!(raw.num_rows(), 12);

    let config = config_with_month_window(3);
    let prepared = prepare_hospital_records(&raw, &MeasureCatalog::hospital()).unwrap();
    let output = SpcPipeline::new(config.clone()).unwrap().run(&prepared).unwrap();

    assert_eq!(SpcRecord::from_batch(&output).unwrap(), run_pipeline(&scenario(), &config));
}

#[test]
fn test_parquet_output_round_trip() {
    let dir = TempDir::new().unwrap();
    let output_path = dir.path().join("spc.parquet");

    let config = config_with_month_window(3);
    let prepared = crate::utils::prepared_batch(&scenario());
    let output = SpcPipeline::new(config).unwrap().run(&prepared).unwrap();
    write_table(&output_path, &output).unwrap();

    let restored = read_table(&output_path).unwrap();
    assert_eq!(restored.num_rows(), output.num_rows());
    assert_eq!(
        SpcRecord::from_batch(&restored).unwrap(),
        SpcRecord::from_batch(&output).unwrap()
    );
}

#[test]
fn test_csv_output_keeps_columns() {
    let dir = TempDir::new().unwrap();
    let output_path = dir.path().join("spc.csv");

    let prepared = crate::utils::prepared_batch(&scenario());
    let output = SpcPipeline::new(config_with_month_window(3))
        .unwrap()
        .run(&prepared)
        .unwrap();
    write_table(&output_path, &output).unwrap();

    let restored = read_table(&output_path).unwrap();
    assert_eq!(restored.num_rows(), output.num_rows());
    let names = |batch: &arrow::record_batch::RecordBatch| {
        batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect::<Vec<_>>()
    };
    assert_eq!(names(&restored), names(&output));
}

#[test]
fn test_unsupported_extension() {
    let err = read_table(Path::new("measures.xlsx")).unwrap_err();
    assert!(matches!(err, SpcError::UnsupportedFormat(_)));

    let batch = raw_batch(&scenario());
    let dir = TempDir::new().unwrap();
    let err = write_table(&dir.path().join("out.json"), &batch).unwrap_err();
    assert!(matches!(err, SpcError::UnsupportedFormat(_)));
}

#[test]
fn test_config_and_catalog_files() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.json");
    std::fs::write(
        &config_path,
        r#"{"granularities": [{"frequency": "Quarter", "window_size": 4}], "flag_anomalies": true}"#,
    )
    .unwrap();
    let config = PipelineConfig::from_json_file(&config_path).unwrap();
    assert!(config.flag_anomalies);
    assert_eq!(config.enabled_granularities().len(), 1);
    assert_eq!(config.granularity(Frequency::Quarter).unwrap().window_size, 4);

    let bad_path = dir.path().join("bad.json");
    std::fs::write(&bad_path, r#"{"key_columns": []}"#).unwrap();
    assert!(matches!(
        PipelineConfig::from_json_file(&bad_path),
        Err(SpcError::Config(_))
    ));

    let catalog_path = dir.path().join("catalog.json");
    std::fs::write(
        &catalog_path,
        r#"{"SSI": {"multiplier": 100, "definition": "Per 100 procedures"}}"#,
    )
    .unwrap();
    let catalog = MeasureCatalog::from_json_file(&catalog_path).unwrap();
    assert_eq!(catalog.len(), 1);
    assert_eq!(catalog.get("SSI").unwrap().multiplier, 100);
}
