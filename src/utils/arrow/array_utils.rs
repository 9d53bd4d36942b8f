//! Utilities for working with Arrow arrays.
//!
//! This module provides helpers for extracting typed columns from record
//! batches and for grouping rows by a composite category key.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float64Array, StringArray};
use arrow::compute::kernels::cast::cast;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::row::{OwnedRow, RowConverter, Rows, SortField};
use rustc_hash::FxHashMap;

use crate::error::{Result, SpcError};

/// Get a column from a record batch by name
///
/// # Errors
/// Returns `ColumnNotFound` if the column does not exist
pub fn get_column(batch: &RecordBatch, column_name: &str) -> Result<ArrayRef> {
    let idx = batch
        .schema()
        .index_of(column_name)
        .map_err(|_| SpcError::column_not_found(column_name))?;
    Ok(batch.column(idx).clone())
}

/// Check that every named column is present
pub fn require_columns<S: AsRef<str>>(batch: &RecordBatch, columns: &[S]) -> Result<()> {
    let schema = batch.schema();
    for column in columns {
        let column = column.as_ref();
        if schema.index_of(column).is_err() {
            return Err(SpcError::column_not_found(column));
        }
    }
    Ok(())
}

/// Whether a data type holds text
#[must_use]
pub fn is_string(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View
    ) || matches!(data_type, DataType::Dictionary(_, value) if is_string(value))
}

/// Get a text column as a `StringArray`, casting other string encodings
pub fn string_column(batch: &RecordBatch, column_name: &str) -> Result<StringArray> {
    let array = get_column(batch, column_name)?;
    if !is_string(array.data_type()) {
        return Err(invalid_type(column_name, "a string type", array.data_type()));
    }
    let utf8 = cast(&array, &DataType::Utf8)?;
    downcast_array::<StringArray>(&utf8, column_name).cloned()
}

/// Get a numeric column as a `Float64Array`
pub fn float64_column(batch: &RecordBatch, column_name: &str) -> Result<Float64Array> {
    let array = get_column(batch, column_name)?;
    float64_array(&array, column_name)
}

/// Cast a numeric array to `Float64`
pub fn float64_array(array: &ArrayRef, column_name: &str) -> Result<Float64Array> {
    if !array.data_type().is_numeric() && array.data_type() != &DataType::Null {
        return Err(invalid_type(column_name, "a numeric type", array.data_type()));
    }
    let converted = cast(array, &DataType::Float64)?;
    downcast_array::<Float64Array>(&converted, column_name).cloned()
}

/// Downcast a column to a specific array type with clear error messages
pub fn downcast_array<'a, A: Array + 'static>(array: &'a ArrayRef, column_name: &str) -> Result<&'a A> {
    array.as_any().downcast_ref::<A>().ok_or_else(|| {
        invalid_type(column_name, std::any::type_name::<A>(), array.data_type())
    })
}

fn invalid_type(column: &str, expected: &str, actual: &DataType) -> SpcError {
    SpcError::InvalidColumnType {
        column: column.to_string(),
        expected: expected.to_string(),
        actual: format!("{actual:?}"),
    }
}

/// Encode the composite category key of every row
///
/// The resulting rows compare, order and hash like the tuple of key values,
/// whatever the key column types are.
pub fn category_rows<S: AsRef<str>>(batch: &RecordBatch, key_columns: &[S]) -> Result<Rows> {
    let columns = key_columns
        .iter()
        .map(|name| get_column(batch, name.as_ref()))
        .collect::<Result<Vec<_>>>()?;
    let fields = columns
        .iter()
        .map(|c| SortField::new(c.data_type().clone()))
        .collect();
    let converter = RowConverter::new(fields)?;
    Ok(converter.convert_columns(&columns)?)
}

/// Partition row indices by category key
///
/// Partitions are returned in order of first appearance and keep the row
/// order of the batch within each partition.
pub fn partition_by_key<S: AsRef<str>>(
    batch: &RecordBatch,
    key_columns: &[S],
) -> Result<Vec<Vec<usize>>> {
    let rows = category_rows(batch, key_columns)?;
    let mut positions: FxHashMap<OwnedRow, usize> = FxHashMap::default();
    let mut partitions: Vec<Vec<usize>> = Vec::new();

    for i in 0..batch.num_rows() {
        let slot = *positions.entry(rows.row(i).owned()).or_insert_with(|| {
            partitions.push(Vec::new());
            partitions.len() - 1
        });
        partitions[slot].push(i);
    }

    Ok(partitions)
}

/// Return a copy of the batch with one column replaced
///
/// The field keeps its name, position, nullability and metadata; its type
/// follows the new array. A non-nullable field becomes nullable only when
/// the new array holds nulls.
pub fn replace_column(batch: &RecordBatch, column_name: &str, array: ArrayRef) -> Result<RecordBatch> {
    let schema = batch.schema();
    let idx = schema
        .index_of(column_name)
        .map_err(|_| SpcError::column_not_found(column_name))?;
    let mut fields: Vec<Field> = schema.fields().iter().map(|f| f.as_ref().clone()).collect();
    let nullable = fields[idx].is_nullable() || array.null_count() > 0;
    fields[idx] = fields[idx]
        .clone()
        .with_data_type(array.data_type().clone())
        .with_nullable(nullable);
    let mut columns = batch.columns().to_vec();
    columns[idx] = array;
    let schema = Schema::new_with_metadata(fields, schema.metadata().clone());
    Ok(RecordBatch::try_new(Arc::new(schema), columns)?)
}

/// Replace a column, or append it as a nullable field when absent
pub fn set_column(batch: &RecordBatch, column_name: &str, array: ArrayRef) -> Result<RecordBatch> {
    if batch.schema().index_of(column_name).is_ok() {
        return replace_column(batch, column_name, array);
    }
    let mut fields: Vec<Field> = batch.schema().fields().iter().map(|f| f.as_ref().clone()).collect();
    fields.push(Field::new(column_name, array.data_type().clone(), true));
    let mut columns = batch.columns().to_vec();
    columns.push(array);
    let schema = Schema::new_with_metadata(fields, batch.schema().metadata().clone());
    Ok(RecordBatch::try_new(Arc::new(schema), columns)?)
}

/// Build a `Float64` array from optional values
#[must_use]
pub fn float64_from(values: Vec<Option<f64>>) -> ArrayRef {
    Arc::new(Float64Array::from(values))
}
