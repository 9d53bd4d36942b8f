//! SPC computation stages
//!
//! Aggregation of raw records per category and period, rolling control
//! limits per category, and composition of the month, quarter and year
//! results into one dataset.

pub mod aggregate;
pub mod compose;
pub mod spc;

// Re-export commonly used items
pub use aggregate::{AggregationRequest, aggregate_by_period, compute_rate, reverse_row_numbers};
pub use compose::{SpcPipeline, build_spc_dataset, concat_results, format_quarter_labels};
pub use spc::{ControlLimits, RollingWindow, SpcConfig, rolling_spc};
