//! Tests for temporal aggregation

use spc_pipeline::algorithm::{AggregationRequest, aggregate_by_period};
use spc_pipeline::{Frequency, PipelineConfig, RawRecord, SpcError};

use crate::utils::{decorated_batch, floats, ints, strings};

fn request(frequency: Frequency) -> AggregationRequest {
    let config = PipelineConfig::default();
    AggregationRequest::new(frequency, config.key_columns, config.sum_columns)
}

#[test]
fn test_monthly_groups_sum_and_rank() {
    let records = vec![
        RawRecord::new("HAPI", "2024-01-15", 2, 100),
        RawRecord::new("HAPI", "2024-02-03", 1, 50),
        RawRecord::new("HAPI", "2024-01-20", 3, 100),
        RawRecord::new("CAUTI", "2024-01-09", 1, 1000),
    ];
    let aggregated = aggregate_by_period(&decorated_batch(&records), &request(Frequency::Month)).unwrap();

    assert_eq!(aggregated.num_rows(), 3);
    let names: Vec<_> = aggregated
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    assert_eq!(
        names,
        vec![
            "Measure",
            "Definitions",
            "Multiplier",
            "Numerator",
            "Denominator",
            "Expected Events",
            "frequency",
            "Rate",
            "Date",
            "RowNumber",
        ]
    );

    assert_eq!(
        strings(&aggregated, "Measure"),
        vec![Some("CAUTI".to_string()), Some("HAPI".to_string()), Some("HAPI".to_string())]
    );
    assert_eq!(
        strings(&aggregated, "Date"),
        vec![Some("2024-01".to_string()), Some("2024-01".to_string()), Some("2024-02".to_string())]
    );
    assert_eq!(ints(&aggregated, "Numerator"), vec![Some(1), Some(5), Some(1)]);
    assert_eq!(ints(&aggregated, "Denominator"), vec![Some(1000), Some(200), Some(50)]);
    assert_eq!(floats(&aggregated, "Rate"), vec![Some(1.0), Some(2.5), Some(2.0)]);
    assert_eq!(ints(&aggregated, "RowNumber"), vec![Some(1), Some(2), Some(1)]);
    assert!(
        strings(&aggregated, "frequency")
            .iter()
            .all(|f| f.as_deref() == Some("Month"))
    );
}

#[test]
fn test_quarter_and_year_storage_labels() {
    let records = vec![
        RawRecord::new("CLABSI", "2024-07-01", 1, 100),
        RawRecord::new("CLABSI", "2023-11-30", 1, 100),
        RawRecord::new("CLABSI", "2024-02-14", 1, 100),
        RawRecord::new("CLABSI", "2024-03-14", 1, 100),
    ];
    let batch = decorated_batch(&records);

    let quarters = aggregate_by_period(&batch, &request(Frequency::Quarter)).unwrap();
    assert_eq!(
        strings(&quarters, "Date"),
        vec![Some("2023-4".to_string()), Some("2024-1".to_string()), Some("2024-3".to_string())]
    );
    assert_eq!(ints(&quarters, "Numerator"), vec![Some(1), Some(2), Some(1)]);
    assert_eq!(ints(&quarters, "RowNumber"), vec![Some(3), Some(2), Some(1)]);

    let years = aggregate_by_period(&batch, &request(Frequency::Year)).unwrap();
    assert_eq!(strings(&years, "Date"), vec![Some("2023".to_string()), Some("2024".to_string())]);
    assert_eq!(ints(&years, "Denominator"), vec![Some(100), Some(300)]);
}

#[test]
fn test_zero_denominator_is_not_guarded() {
    let records = vec![
        RawRecord::new("HAPI", "2024-01-15", 3, 0),
        RawRecord::new("HAPI", "2024-02-15", 0, 0),
    ];
    let aggregated = aggregate_by_period(&decorated_batch(&records), &request(Frequency::Month)).unwrap();
    let rates = floats(&aggregated, "Rate");

    assert_eq!(rates[0], Some(f64::INFINITY));
    assert!(rates[1].unwrap().is_nan());
}

#[test]
fn test_unknown_measure_has_null_rate() {
    let records = vec![RawRecord::new("SSI", "2024-01-15", 3, 100)];
    let aggregated = aggregate_by_period(&decorated_batch(&records), &request(Frequency::Month)).unwrap();

    assert_eq!(strings(&aggregated, "Definitions"), vec![Some("Unknown".to_string())]);
    assert_eq!(ints(&aggregated, "Multiplier"), vec![None]);
    assert_eq!(floats(&aggregated, "Rate"), vec![None]);
}

#[test]
fn test_unparseable_dates_form_unknown_period() {
    let records = vec![
        RawRecord::new("HAPI", "2024-01-15", 1, 100),
        RawRecord::new("HAPI", "not a date", 4, 100),
        RawRecord::new("HAPI", "", 2, 100),
    ];
    let aggregated = aggregate_by_period(&decorated_batch(&records), &request(Frequency::Month)).unwrap();

    assert_eq!(aggregated.num_rows(), 2);
    assert_eq!(strings(&aggregated, "Date"), vec![None, Some("2024-01".to_string())]);
    assert_eq!(ints(&aggregated, "Numerator"), vec![Some(6), Some(1)]);
    assert_eq!(ints(&aggregated, "RowNumber"), vec![Some(2), Some(1)]);
}

#[test]
fn test_missing_column_is_reported() {
    let records = vec![RawRecord::new("HAPI", "2024-01-15", 1, 100)];
    let mut request = request(Frequency::Month);
    request.sum_columns.push("Patient Days".to_string());

    let err = aggregate_by_period(&decorated_batch(&records), &request).unwrap_err();
    assert!(matches!(err, SpcError::ColumnNotFound { column } if column == "Patient Days"));
}

#[test]
fn test_integer_overflow_is_reported() {
    let records = vec![
        RawRecord::new("HAPI", "2024-01-15", i64::MAX, 100),
        RawRecord::new("HAPI", "2024-01-20", 1, 100),
    ];
    let err = aggregate_by_period(&decorated_batch(&records), &request(Frequency::Month)).unwrap_err();
    assert!(matches!(err, SpcError::SumOverflow { column } if column == "Numerator"));
}
