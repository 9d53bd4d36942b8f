//! Period decomposition of raw record dates
//!
//! Adds `Year`, `Quarter` and `Month` storage-label columns derived from a
//! single date column. Values that cannot be read as dates become null in
//! all three columns, which downstream stages treat as the unknown period.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Date32Array, StringArray};
use arrow::compute::kernels::cast::cast;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Datelike, NaiveDate};

use super::{Frequency, TimePeriod};
use crate::error::{Result, SpcError};
use crate::schema::{DateFormatConfig, parse_date_string};
use crate::utils::arrow::array_utils::{downcast_array, get_column, is_string, string_column};
use crate::utils::logging::log_warning;

/// Years a period label can be written for
pub const SUPPORTED_YEARS: std::ops::RangeInclusive<i32> = 0..=9999;

/// Read every value of the date column as an optional date
///
/// Returns the parsed dates and the number of non-null values that could
/// not be parsed.
fn parse_dates(
    batch: &RecordBatch,
    date_column: &str,
    config: &DateFormatConfig,
) -> Result<(Vec<Option<NaiveDate>>, usize)> {
    let array = get_column(batch, date_column)?;

    match array.data_type() {
        dt if is_string(dt) => {
            let strings = string_column(batch, date_column)?;
            let mut unparseable = 0;
            let dates = strings
                .iter()
                .map(|value| {
                    let value = value?;
                    let parsed = parse_date_string(value, config);
                    if parsed.is_none() {
                        unparseable += 1;
                    }
                    parsed
                })
                .collect();
            Ok((dates, unparseable))
        }
        DataType::Date32 | DataType::Date64 | DataType::Timestamp(_, _) => {
            let days: ArrayRef = cast(&array, &DataType::Date32)?;
            let days = downcast_array::<Date32Array>(&days, date_column)?;
            let dates = (0..days.len())
                .map(|i| {
                    if days.is_null(i) {
                        None
                    } else {
                        days.value_as_date(i)
                    }
                })
                .collect();
            Ok((dates, 0))
        }
        other => Err(SpcError::InvalidColumnType {
            column: date_column.to_string(),
            expected: "a string, date or timestamp type".to_string(),
            actual: format!("{other:?}"),
        }),
    }
}

fn labels(dates: &[Option<NaiveDate>], frequency: Frequency) -> ArrayRef {
    let values: StringArray = dates
        .iter()
        .map(|date| date.map(|d| TimePeriod::from_date(&d, frequency).label()))
        .collect();
    Arc::new(values)
}

/// Add `Year`, `Quarter` and `Month` period columns to a copy of the batch
///
/// Existing columns with those names are replaced. The input batch is not
/// modified.
///
/// # Arguments
/// * `batch` - The raw records
/// * `date_column` - Name of the column holding the record date
/// * `config` - Accepted string date formats
pub fn add_period_columns(
    batch: &RecordBatch,
    date_column: &str,
    config: &DateFormatConfig,
) -> Result<RecordBatch> {
    let (mut dates, unparseable) = parse_dates(batch, date_column, config)?;

    let mut out_of_range = 0;
    for date in dates.iter_mut() {
        if date.is_some_and(|d| !SUPPORTED_YEARS.contains(&d.year())) {
            *date = None;
            out_of_range += 1;
        }
    }
    if out_of_range > 0 {
        log_warning(
            "Period decomposition",
            &format!("{out_of_range} dates in '{date_column}' fall outside years 0 to 9999"),
        );
    }
    if unparseable > 0 {
        log_warning(
            "Period decomposition",
            &format!("{unparseable} values in '{date_column}' could not be parsed as dates"),
        );
    }
    let unknown = dates.iter().filter(|d| d.is_none()).count();
    if unknown > 0 {
        log::debug!("{unknown} rows assigned to the unknown period");
    }

    let period_names = [Frequency::Year, Frequency::Quarter, Frequency::Month];
    let schema = batch.schema();

    let mut fields: Vec<Field> = Vec::with_capacity(schema.fields().len() + 3);
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(schema.fields().len() + 3);
    for (field, column) in schema.fields().iter().zip(batch.columns()) {
        if period_names.iter().any(|f| f.period_column() == field.name()) {
            continue;
        }
        fields.push(field.as_ref().clone());
        columns.push(column.clone());
    }

    for frequency in period_names {
        fields.push(Field::new(frequency.period_column(), DataType::Utf8, true));
        columns.push(labels(&dates, frequency));
    }

    let schema = Schema::new_with_metadata(fields, schema.metadata().clone());
    Ok(RecordBatch::try_new(Arc::new(schema), columns)?)
}
