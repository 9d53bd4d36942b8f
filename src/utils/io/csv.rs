//! CSV tables with a header row

use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use arrow::compute::concat_batches;
use arrow::csv::reader::Format;
use arrow::csv::{ReaderBuilder, WriterBuilder};
use arrow::record_batch::RecordBatch;

use super::get_batch_size;
use crate::error::Result;
use crate::utils::logging::log_operation_complete;

/// Read a CSV file, inferring the schema from its contents
pub fn read_csv(path: &Path) -> Result<RecordBatch> {
    let start = Instant::now();
    let stage = format!("Reading {}", path.display());

    let mut file = File::open(path)?;
    let (schema, _) = Format::default()
        .with_header(true)
        .infer_schema(BufReader::new(&file), None)?;
    file.seek(SeekFrom::Start(0))?;

    let schema = Arc::new(schema);
    log::debug!("{stage}: inferred {} columns", schema.fields().len());
    let reader = ReaderBuilder::new(schema.clone())
        .with_header(true)
        .with_batch_size(get_batch_size())
        .build(BufReader::new(file))?;
    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;

    let batch = concat_batches(&schema, &batches)?;
    log_operation_complete(&stage, batch.num_rows(), Some(start.elapsed()));
    Ok(batch)
}

/// Write a batch as CSV with a header row
pub fn write_csv(path: &Path, batch: &RecordBatch) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = WriterBuilder::new().with_header(true).build(file);
    writer.write(batch)?;
    log::info!("Wrote {} rows to {}", batch.num_rows(), path.display());
    Ok(())
}
