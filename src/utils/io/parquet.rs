//! Parquet tables

use std::fs::File;
use std::path::Path;
use std::time::Instant;

use arrow::compute::concat_batches;
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use super::get_batch_size;
use crate::error::Result;
use crate::utils::logging::{log_operation_complete, log_operation_start};

/// Read a Parquet file into one `RecordBatch`
///
/// # Errors
/// Returns an error if the file cannot be opened or is not valid Parquet
pub fn read_parquet(path: &Path) -> Result<RecordBatch> {
    let start = Instant::now();
    let stage = format!("Reading {}", path.display());

    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let rows = usize::try_from(builder.metadata().file_metadata().num_rows()).unwrap_or(0);
    log_operation_start(&stage, rows);

    let schema = builder.schema().clone();
    let reader = builder.with_batch_size(get_batch_size()).build()?;
    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;

    let batch = concat_batches(&schema, &batches)?;
    log_operation_complete(&stage, batch.num_rows(), Some(start.elapsed()));
    Ok(batch)
}

/// Write a batch as a Parquet file with default properties
pub fn write_parquet(path: &Path, batch: &RecordBatch) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(batch)?;
    writer.close()?;
    log::info!("Wrote {} rows to {}", batch.num_rows(), path.display());
    Ok(())
}
