//! A Rust library for computing rolling statistical process control (SPC)
//! limits over healthcare quality measures held in Arrow tables.
//!
//! Raw records are decomposed into calendar periods, aggregated per measure
//! and period at monthly, quarterly and yearly granularity, and annotated
//! with rolling center lines and 1, 2 and 3 sigma control limits.

pub mod algorithm;
pub mod config;
pub mod error;
pub mod measures;
pub mod models;
pub mod period;
pub mod schema;
pub mod utils;

// Re-export the most common types for easier use
// Core types
pub use config::{GranularityConfig, PipelineConfig, RateColumns};
pub use error::{Result, SpcError};
pub use period::{Frequency, TimePeriod};

// Arrow types
pub use arrow::record_batch::RecordBatch;

// Pipeline stages
pub use algorithm::{
    AggregationRequest, SpcConfig, SpcPipeline, aggregate_by_period, build_spc_dataset,
    rolling_spc,
};
pub use period::{add_period_columns, sort_by_period};

// Ingestion and export
pub use measures::{MeasureCatalog, MeasureDefinition, prepare_hospital_records, prepare_records};
pub use models::{RawRecord, SpcRecord};
pub use utils::io::{read_table, write_table};
