//! Chronological ordering of aggregated period rows.

use arrow::array::UInt32Array;
use arrow::compute::take_record_batch;
use arrow::record_batch::RecordBatch;

use super::{Frequency, TimePeriod};
use crate::error::Result;
use crate::schema::DATE;
use crate::utils::arrow::array_utils::{category_rows, string_column};

/// Parse the `Date` labels of a batch as periods of one granularity
///
/// Null labels (the unknown period) parse to `None`; any other label that is
/// not in the storage format of `frequency` is an error.
pub fn parse_period_labels(batch: &RecordBatch, frequency: Frequency) -> Result<Vec<Option<TimePeriod>>> {
    string_column(batch, DATE)?
        .iter()
        .map(|label| {
            label
                .map(|label| TimePeriod::parse_label(label, frequency))
                .transpose()
        })
        .collect()
}

/// Sort rows by category key, then chronologically by their `Date` label
///
/// Within a category the unknown period sorts before every known period.
/// The sort is stable, so rows that share a key and period keep their
/// relative order.
///
/// # Arguments
/// * `batch` - Aggregated rows carrying a `Date` label column
/// * `key_columns` - Category key columns
/// * `frequency` - Granularity the labels were produced at
///
/// # Errors
/// Returns `PeriodLabel` when a label does not match the granularity, and
/// `ColumnNotFound` when a key column or `Date` is missing.
pub fn sort_by_period<S: AsRef<str>>(
    batch: &RecordBatch,
    key_columns: &[S],
    frequency: Frequency,
) -> Result<RecordBatch> {
    let keys = category_rows(batch, key_columns)?;
    let periods: Vec<Option<(i32, u32)>> = parse_period_labels(batch, frequency)?
        .into_iter()
        .map(|p| p.map(|p| p.sort_key()))
        .collect();

    let mut order: Vec<u32> = (0..batch.num_rows() as u32).collect();
    order.sort_by(|&a, &b| {
        let (a, b) = (a as usize, b as usize);
        keys.row(a)
            .cmp(&keys.row(b))
            .then_with(|| periods[a].cmp(&periods[b]))
    });

    Ok(take_record_batch(batch, &UInt32Array::from(order))?)
}
