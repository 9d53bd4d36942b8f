//! Temporal aggregation of raw records into category × period rows
//!
//! Records are grouped by the category key columns plus one period column,
//! the count columns are summed per group, and a per-N rate is derived. The
//! grouped rows are then ordered chronologically per category and ranked
//! from the most recent period backwards.

use std::sync::Arc;
use std::time::Instant;

use arrow::array::{Array, ArrayRef, Float64Array, Int64Array, StringArray, UInt32Array};
use arrow::compute::kernels::cast::cast;
use arrow::compute::take;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::row::OwnedRow;
use itertools::Itertools;
use rustc_hash::FxHashMap;

use crate::config::RateColumns;
use crate::error::{Result, SpcError};
use crate::period::{Frequency, sort_by_period};
use crate::schema::{DATE, FREQUENCY, RATE, ROW_NUMBER};
use crate::utils::arrow::array_utils::{
    category_rows, downcast_array, float64_array, float64_column, get_column, partition_by_key,
    require_columns,
};
use crate::utils::logging::{log_operation_complete, log_operation_start};

/// Parameters of one aggregation run
#[derive(Debug, Clone)]
pub struct AggregationRequest {
    /// Period column to group by (`Year`, `Quarter` or `Month`)
    pub period_column: String,
    /// Category key columns
    pub key_columns: Vec<String>,
    /// Columns summed per group
    pub sum_columns: Vec<String>,
    /// Tag written to the `frequency` column
    pub frequency: Frequency,
    /// Columns the rate is derived from
    pub rate: RateColumns,
}

impl AggregationRequest {
    /// Group by the decomposer's period column for `frequency`
    #[must_use]
    pub fn new(frequency: Frequency, key_columns: Vec<String>, sum_columns: Vec<String>) -> Self {
        Self {
            period_column: frequency.period_column().to_string(),
            key_columns,
            sum_columns,
            frequency,
            rate: RateColumns::default(),
        }
    }

    /// Use different rate columns
    #[must_use]
    pub fn with_rate_columns(mut self, rate: RateColumns) -> Self {
        self.rate = rate;
        self
    }

    /// Group by a differently named period column
    #[must_use]
    pub fn with_period_column(mut self, period_column: impl Into<String>) -> Self {
        self.period_column = period_column.into();
        self
    }

    /// Key columns without the period column
    #[must_use]
    pub fn category_keys(&self) -> Vec<String> {
        self.key_columns
            .iter()
            .filter(|c| **c != self.period_column)
            .cloned()
            .collect()
    }
}

/// Running per-group sums for one column
enum ColumnSums {
    Integer(Int64Array, Vec<i64>),
    Float(Float64Array, Vec<f64>),
}

impl ColumnSums {
    fn new(array: &ArrayRef, column: &str) -> Result<Self> {
        if array.data_type().is_integer() {
            let ints = cast(array, &DataType::Int64)?;
            Ok(Self::Integer(downcast_array::<Int64Array>(&ints, column)?.clone(), Vec::new()))
        } else {
            let floats = float64_array(array, column)?;
            Ok(Self::Float(floats, Vec::new()))
        }
    }

    fn open_group(&mut self) {
        match self {
            Self::Integer(_, sums) => sums.push(0),
            Self::Float(_, sums) => sums.push(0.0),
        }
    }

    /// Add row `row` to group `group`; nulls contribute nothing
    fn add(&mut self, group: usize, row: usize, column: &str) -> Result<()> {
        match self {
            Self::Integer(values, sums) => {
                if values.is_valid(row) {
                    sums[group] = sums[group]
                        .checked_add(values.value(row))
                        .ok_or_else(|| SpcError::SumOverflow {
                            column: column.to_string(),
                        })?;
                }
            }
            Self::Float(values, sums) => {
                if values.is_valid(row) {
                    sums[group] += values.value(row);
                }
            }
        }
        Ok(())
    }

    fn finish(self) -> ArrayRef {
        match self {
            Self::Integer(_, sums) => Arc::new(Int64Array::from(sums)),
            Self::Float(_, sums) => Arc::new(Float64Array::from(sums)),
        }
    }
}

/// Compute `numerator / denominator * multiplier` for every row
///
/// A zero denominator yields an infinite or NaN rate, which is kept as is.
/// A null in any input yields a null rate.
pub fn compute_rate(batch: &RecordBatch, rate: &RateColumns) -> Result<Float64Array> {
    let numerator = float64_column(batch, &rate.numerator)?;
    let denominator = float64_column(batch, &rate.denominator)?;
    let multiplier = float64_column(batch, &rate.multiplier)?;

    Ok(numerator
        .iter()
        .zip(denominator.iter())
        .zip(multiplier.iter())
        .map(|((n, d), m)| Some(n? / d? * m?))
        .collect())
}

/// Rank rows from the most recent period backwards within each category
///
/// The batch must already be in ascending chronological order per category.
pub fn reverse_row_numbers<S: AsRef<str>>(batch: &RecordBatch, key_columns: &[S]) -> Result<Int64Array> {
    let mut numbers = vec![0_i64; batch.num_rows()];
    for partition in partition_by_key(batch, key_columns)? {
        for (rank, idx) in partition.iter().rev().enumerate() {
            numbers[*idx] = rank as i64 + 1;
        }
    }
    Ok(Int64Array::from(numbers))
}

/// Aggregate records at one granularity
///
/// Output columns, in order: key columns, summed columns, `frequency`,
/// `Rate`, `Date`, `RowNumber`. Rows are sorted by category and period.
/// Null period values form their own group with a null `Date`.
///
/// # Arguments
/// * `batch` - Records decorated with period columns
/// * `request` - Grouping, summing and rate parameters
///
/// # Errors
/// Returns an error if a named column is missing or not numeric where a
/// number is required.
pub fn aggregate_by_period(batch: &RecordBatch, request: &AggregationRequest) -> Result<RecordBatch> {
    let start = Instant::now();
    let stage = format!("{} aggregation", request.frequency);
    log_operation_start(&stage, batch.num_rows());

    let keys = request.category_keys();
    require_columns(batch, &keys)?;
    require_columns(batch, &request.sum_columns)?;
    require_columns(batch, &[&request.period_column])?;

    let group_columns = keys
        .iter()
        .cloned()
        .chain(std::iter::once(request.period_column.clone()))
        .collect_vec();
    let group_rows = category_rows(batch, &group_columns)?;

    let mut sums = request
        .sum_columns
        .iter()
        .map(|column| ColumnSums::new(&get_column(batch, column)?, column))
        .collect::<Result<Vec<_>>>()?;

    // first row of every group, in order of first appearance
    let mut groups: FxHashMap<OwnedRow, usize> = FxHashMap::default();
    let mut first_rows: Vec<u32> = Vec::new();
    for row in 0..batch.num_rows() {
        let group = *groups.entry(group_rows.row(row).owned()).or_insert_with(|| {
            first_rows.push(row as u32);
            for column in &mut sums {
                column.open_group();
            }
            first_rows.len() - 1
        });
        for (column, name) in sums.iter_mut().zip(&request.sum_columns) {
            column.add(group, row, name)?;
        }
    }

    let first_rows = UInt32Array::from(first_rows);
    let group_count = first_rows.len();
    let schema = batch.schema();

    let mut fields: Vec<Field> = Vec::new();
    let mut columns: Vec<ArrayRef> = Vec::new();
    for key in &keys {
        let field = schema.field_with_name(key)?;
        fields.push(field.clone());
        columns.push(take(batch.column(schema.index_of(key)?).as_ref(), &first_rows, None)?);
    }
    for (name, column) in request.sum_columns.iter().zip(sums) {
        let array = column.finish();
        fields.push(Field::new(name, array.data_type().clone(), false));
        columns.push(array);
    }
    fields.push(Field::new(FREQUENCY, DataType::Utf8, false));
    columns.push(Arc::new(StringArray::from(vec![request.frequency.as_str(); group_count])));

    let partial = RecordBatch::try_new(Arc::new(Schema::new(fields.clone())), columns.clone())?;
    let rate = compute_rate(&partial, &request.rate)?;
    let non_finite = rate.iter().flatten().filter(|r| !r.is_finite()).count();
    if non_finite > 0 {
        log::debug!("{stage}: {non_finite} rates are not finite (zero denominator)");
    }
    fields.push(Field::new(RATE, DataType::Float64, true));
    columns.push(Arc::new(rate));

    let period = take(get_column(batch, &request.period_column)?.as_ref(), &first_rows, None)?;
    fields.push(Field::new(DATE, DataType::Utf8, true));
    columns.push(cast(&period, &DataType::Utf8)?);

    let grouped = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?;
    let sorted = sort_by_period(&grouped, &keys, request.frequency)?;

    let row_numbers = reverse_row_numbers(&sorted, &keys)?;
    let mut fields = sorted.schema().fields().iter().map(|f| f.as_ref().clone()).collect_vec();
    let mut columns = sorted.columns().to_vec();
    fields.push(Field::new(ROW_NUMBER, DataType::Int64, false));
    columns.push(Arc::new(row_numbers));

    let result = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?;
    log_operation_complete(&stage, result.num_rows(), Some(start.elapsed()));
    Ok(result)
}
