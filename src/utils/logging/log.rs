//! Logging utilities
//!
//! This module provides standardized logging functions for pipeline stages.

use std::time::Duration;

/// Log a stage start with consistent format
///
/// # Arguments
/// * `stage` - Description of the stage
/// * `rows` - Number of input rows
pub fn log_operation_start(stage: &str, rows: usize) {
    log::info!("{stage}: starting on {rows} rows");
}

/// Log a stage completion with consistent format
///
/// # Arguments
/// * `stage` - Description of the stage
/// * `rows` - Number of output rows
/// * `elapsed` - Optional elapsed time
pub fn log_operation_complete(stage: &str, rows: usize, elapsed: Option<Duration>) {
    if let Some(duration) = elapsed {
        log::info!("{stage}: produced {rows} rows in {duration:?}");
    } else {
        log::info!("{stage}: produced {rows} rows");
    }
}

/// Log a data quality warning with consistent format
///
/// # Arguments
/// * `stage` - Stage that observed the issue
/// * `message` - Warning message
pub fn log_warning(stage: &str, message: &str) {
    log::warn!("{stage}: {message}");
}
