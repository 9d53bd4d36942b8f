//! End-to-end tests for the multi-granularity SPC dataset

use spc_pipeline::schema::spc_columns;
use spc_pipeline::{
    Frequency, PipelineConfig, RawRecord, SpcError, SpcPipeline, build_spc_dataset,
};

use crate::utils::{
    assert_close, config_with_month_window, monthly_records, prepared_batch, raw_batch,
    rows_for, run_pipeline, strings,
};

/// Rates 10, 12, 11, 13, 9, 14 per 100 for January to June 2024
fn scenario() -> Vec<RawRecord> {
    monthly_records("HAPI", 2024, &[10, 12, 11, 13, 9, 14], 100)
}

#[test]
fn test_output_layout() {
    let output = build_spc_dataset(&prepared_batch(&scenario()), &config_with_month_window(3)).unwrap();

    let mut expected = vec![
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
    .into_iter()
    .map(str::to_string)
    .collect::<Vec<_>>();
    expected.extend(spc_columns());
    let names: Vec<_> = output
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    assert_eq!(names, expected);

    // six months, two quarters, one year, in that order
    assert_eq!(output.num_rows(), 9);
    let frequencies: Vec<_> = strings(&output, "frequency").into_iter().flatten().collect();
    assert_eq!(
        frequencies,
        vec![
            "Month", "Month", "Month", "Month", "Month", "Month", "Quarter", "Quarter", "Year"
        ]
    );
}

#[test]
fn test_scenario_limits_and_labels() {
    let rows = run_pipeline(&scenario(), &config_with_month_window(3));

    let months = rows_for(&rows, Frequency::Month, "HAPI");
    assert_eq!(months.len(), 6);
    assert!(months[..3].iter().all(|r| !r.has_limits()));
    assert_close(months[3].rolling_cl, 11.0);
    assert_close(months[4].rolling_cl, 12.0);
    assert_close(months[5].rolling_cl, 11.0);
    assert_eq!(months[0].date.as_deref(), Some("2024-01"));
    assert_eq!(months[5].row_number, 1);
    assert_eq!(months[0].row_number, 6);
    assert_eq!(months[0].definitions.as_deref(), Some("Per 100 surveyed patients"));
    assert_eq!(months[0].multiplier, Some(100));

    let quarters = rows_for(&rows, Frequency::Quarter, "HAPI");
    let labels: Vec<_> = quarters.iter().map(|r| r.date.clone()).collect();
    assert_eq!(labels, vec![Some("2024-Q1".to_string()), Some("2024-Q2".to_string())]);
    assert_close(quarters[0].rate, 11.0);
    assert_close(quarters[1].rate, 12.0);

    let years = rows_for(&rows, Frequency::Year, "HAPI");
    assert_eq!(years.len(), 1);
    assert_eq!(years[0].date.as_deref(), Some("2024"));
    assert!(!years[0].has_limits());
    assert!(years[0].rolling_lcl_3std.is_none());
}

#[test]
fn test_years_have_no_limits_with_long_history() {
    let records: Vec<RawRecord> = (2015..2025)
        .map(|year| RawRecord::new("CLABSI", &format!("{year}-06-01"), year - 2010, 1000))
        .collect();
    let rows = run_pipeline(&records, &PipelineConfig::default());

    let years = rows_for(&rows, Frequency::Year, "CLABSI");
    assert_eq!(years.len(), 10);
    assert!(years.iter().all(|r| !r.has_limits() && r.rolling_std.is_none()));

    // quarters have eight preceding values from the ninth row on
    let quarters = rows_for(&rows, Frequency::Quarter, "CLABSI");
    assert!(quarters[..8].iter().all(|r| !r.has_limits()));
    assert!(quarters[8].has_limits());
}

#[test]
fn test_unknown_period_rows() {
    let mut records = monthly_records("CAUTI", 2024, &[1, 2, 3], 1000);
    records.push(RawRecord::new("CAUTI", "31/31/2024", 7, 1000));
    let rows = run_pipeline(&records, &config_with_month_window(1));

    for frequency in Frequency::ALL {
        let rows = rows_for(&rows, frequency, "CAUTI");
        let unknown = rows[0];
        assert!(unknown.date.is_none(), "{frequency}");
        assert_eq!(unknown.numerator, Some(7.0));
        assert!(!unknown.has_limits());
        assert_ne!(unknown.row_number, 1);
    }

    let months = rows_for(&rows, Frequency::Month, "CAUTI");
    assert!(!months[1].has_limits());
    assert_close(months[2].rolling_cl, 1.0);
}

#[test]
fn test_zero_denominator_propagates() {
    let records = monthly_records("HAPI", 2024, &[5, 6, 7, 8], 100)
        .into_iter()
        .chain([RawRecord::new("HAPI", "2024-05-15", 1, 0)])
        .chain(monthly_records("HAPI", 2023, &[1], 100))
        .collect::<Vec<_>>();
    let rows = run_pipeline(&records, &config_with_month_window(2));
    let months = rows_for(&rows, Frequency::Month, "HAPI");

    assert_eq!(months[0].date.as_deref(), Some("2023-01"));
    assert_eq!(months[5].rate, Some(f64::INFINITY));
    assert!(months[5].rolling_cl.unwrap().is_finite());

    // a quarter containing the zero-denominator month keeps a finite rate
    let quarters = rows_for(&rows, Frequency::Quarter, "HAPI");
    assert!(quarters.iter().all(|q| q.rate.unwrap().is_finite()));
}

#[test]
fn test_disabled_granularity_is_skipped() {
    let mut config = config_with_month_window(3);
    config
        .granularities
        .iter_mut()
        .filter(|g| g.frequency == Frequency::Year)
        .for_each(|g| g.enabled = false);
    let rows = run_pipeline(&scenario(), &config);

    assert_eq!(rows.len(), 8);
    assert!(rows.iter().all(|r| r.frequency != "Year"));
}

#[test]
fn test_input_unchanged_and_idempotent() {
    let input = prepared_batch(&scenario());
    let snapshot = input.clone();
    let pipeline = SpcPipeline::new(config_with_month_window(2)).unwrap();

    let first = pipeline.run(&input).unwrap();
    let second = pipeline.run(&input).unwrap();

    assert_eq!(input, snapshot);
    assert_eq!(first, second);
}

#[test]
fn test_missing_date_column_fails_run() {
    let mut config = PipelineConfig::default();
    config.date_column = "Admission Month".to_string();

    let err = build_spc_dataset(&prepared_batch(&scenario()), &config).unwrap_err();
    assert!(matches!(err, SpcError::ColumnNotFound { .. }));
}

#[test]
fn test_missing_catalog_columns_fail_run() {
    let err = build_spc_dataset(&raw_batch(&scenario()), &PipelineConfig::default()).unwrap_err();
    assert!(matches!(err, SpcError::ColumnNotFound { column } if column == "Definitions"));
}

#[test]
fn test_invalid_config_rejected() {
    let mut config = PipelineConfig::default();
    config.set_window_size(Frequency::Year, 0);
    assert!(matches!(SpcPipeline::new(config), Err(SpcError::Config(_))));
}

#[test]
fn test_anomaly_column_opt_in() {
    let mut config = config_with_month_window(3);
    config.flag_anomalies = true;
    let records = monthly_records("HAPI", 2024, &[10, 10, 11, 10, 50], 100);
    let rows = run_pipeline(&records, &config);

    let months = rows_for(&rows, Frequency::Month, "HAPI");
    assert_eq!(months[3].is_anomaly, Some(false));
    assert_eq!(months[4].is_anomaly, Some(true));
    assert!(months[0].is_anomaly.is_none());
    assert!(
        rows_for(&rows, Frequency::Year, "HAPI")
            .iter()
            .all(|r| r.is_anomaly.is_none())
    );
}

#[test]
fn test_ancient_dates_fall_into_unknown_period() {
    let records = vec![
        RawRecord::new("HAPI", "-0044-03-15", 1, 100),
        RawRecord::new("HAPI", "2024-03-15", 2, 100),
    ];
    let rows = run_pipeline(&records, &PipelineConfig::default());

    for frequency in Frequency::ALL {
        let dates: Vec<_> = rows_for(&rows, frequency, "HAPI")
            .iter()
            .map(|r| r.date.clone())
            .collect();
        assert_eq!(dates.len(), 2, "{frequency}");
        assert_eq!(dates[0], None, "{frequency}");
    }
}
