//! Table input and output
//!
//! Tables are read from and written to CSV or Parquet files, chosen by
//! file extension. Reading always yields a single `RecordBatch`.

pub mod csv;
pub mod parquet;

use std::path::Path;

use arrow::record_batch::RecordBatch;

use crate::error::{Result, SpcError};

pub use self::csv::{read_csv, write_csv};
pub use self::parquet::{read_parquet, write_parquet};

/// Default number of rows per batch when reading
pub const DEFAULT_BATCH_SIZE: usize = 16384;

/// Batch size override from the environment
#[must_use]
pub fn get_batch_size() -> usize {
    std::env::var("SPC_BATCH_SIZE")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|size| *size > 0)
        .unwrap_or(DEFAULT_BATCH_SIZE)
}

/// Supported table file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Parquet,
}

impl TableFormat {
    /// Detect the format from a file extension (case-insensitive)
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("csv") => Ok(Self::Csv),
            Some("parquet" | "pq") => Ok(Self::Parquet),
            _ => Err(SpcError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Read a CSV or Parquet file into one `RecordBatch`
pub fn read_table(path: &Path) -> Result<RecordBatch> {
    match TableFormat::from_path(path)? {
        TableFormat::Csv => read_csv(path),
        TableFormat::Parquet => read_parquet(path),
    }
}

/// Write a `RecordBatch` as CSV or Parquet
pub fn write_table(path: &Path, batch: &RecordBatch) -> Result<()> {
    match TableFormat::from_path(path)? {
        TableFormat::Csv => write_csv(path, batch),
        TableFormat::Parquet => write_parquet(path, batch),
    }
}
