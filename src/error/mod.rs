//! Error handling for the SPC pipeline.

use std::io;

use arrow::error::ArrowError;
use parquet::errors::ParquetError;

use crate::period::Frequency;

/// Errors that can occur while building SPC tables
#[derive(Debug, thiserror::Error)]
pub enum SpcError {
    /// A required column is absent from the input table
    #[error("Column '{column}' not found")]
    ColumnNotFound {
        /// Name of the missing column
        column: String,
    },

    /// A column exists but holds an unusable data type
    #[error("Column '{column}' has type {actual}, expected {expected}")]
    InvalidColumnType {
        /// Name of the offending column
        column: String,
        /// Human-readable description of the accepted types
        expected: String,
        /// The data type actually found
        actual: String,
    },

    /// A period label does not match the storage format of its granularity.
    ///
    /// This signals disagreement between the aggregator and the sorter and
    /// aborts the run for that granularity.
    #[error("Period label '{label}' is not a valid {frequency} label")]
    PeriodLabel {
        /// The label that failed to parse
        label: String,
        /// The granularity the label was parsed as
        frequency: Frequency,
    },

    /// An integer count column sums past the range of `Int64`
    #[error("Sum of column '{column}' overflows a 64-bit integer")]
    SumOverflow {
        /// Name of the summed column
        column: String,
    },

    /// Granularity results disagree on their column set
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Invalid pipeline configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// File extension not handled by the table adapters
    #[error("Unsupported table format: {0}")]
    UnsupportedFormat(String),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// Parquet error
    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error while loading configuration or catalogs
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Conversion between typed rows and record batches failed
    #[error("Record conversion error: {0}")]
    SerdeArrow(#[from] serde_arrow::Error),
}

impl SpcError {
    /// Shorthand for a missing column error
    pub fn column_not_found(column: impl Into<String>) -> Self {
        Self::ColumnNotFound {
            column: column.into(),
        }
    }
}

/// Result type for SPC pipeline operations
pub type Result<T> = std::result::Result<T, SpcError>;
