//! Tests for the typed record views

use std::sync::Arc;

use arrow::array::{Int32Array, LargeStringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use spc_pipeline::schema::spc_columns;
use spc_pipeline::{RawRecord, SpcRecord};

use crate::utils::{config_with_month_window, monthly_records, run_pipeline};

#[test]
fn test_spc_records_from_pipeline_output() {
    let mut config = config_with_month_window(2);
    config.flag_anomalies = true;
    let records: Vec<RawRecord> = monthly_records("CLABSI", 2023, &[1, 2, 3], 2000)
        .into_iter()
        .map(|r| r.with_expected_events(0.6))
        .collect();
    let rows = run_pipeline(&records, &config);

    assert_eq!(rows.len(), 3 + 1 + 1);
    let first = &rows[0];
    assert_eq!(first.measure.as_deref(), Some("CLABSI"));
    assert_eq!(first.definitions.as_deref(), Some("Per 1000 device days"));
    assert_eq!(first.multiplier, Some(1000));
    assert_eq!(first.expected_events, Some(1.0));
    assert_eq!(first.rate, Some(0.5));
    assert_eq!(first.frequency, "Month");
    assert_eq!(first.row_number, 3);

    let third = &rows[2];
    assert_eq!(third.rolling_cl, Some(0.75));
    assert!(third.is_anomaly.is_some());
}

#[test]
fn test_spc_records_accept_other_encodings() {
    let mut fields = vec![
        Field::new("Measure", DataType::LargeUtf8, false),
        Field::new("frequency", DataType::LargeUtf8, false),
        Field::new("RowNumber", DataType::Int32, false),
    ];
    let mut columns: Vec<arrow::array::ArrayRef> = vec![
        Arc::new(LargeStringArray::from(vec!["HAPI"])),
        Arc::new(LargeStringArray::from(vec!["Year"])),
        Arc::new(Int32Array::from(vec![1])),
    ];
    for name in spc_columns() {
        fields.push(Field::new(name, DataType::Float64, true));
        columns.push(Arc::new(arrow::array::Float64Array::from(vec![None::<f64>])));
    }
    let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).unwrap();

    let rows = SpcRecord::from_batch(&batch).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].measure.as_deref(), Some("HAPI"));
    assert_eq!(rows[0].row_number, 1);
    assert!(rows[0].date.is_none());
    assert!(rows[0].rate.is_none());
    assert!(!rows[0].has_limits());
}
