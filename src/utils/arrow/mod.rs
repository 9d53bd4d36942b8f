//! Arrow data handling utilities
//!
//! Helpers for typed column extraction, column replacement and grouping
//! rows by composite category keys.

pub mod array_utils;

// Re-export commonly used functions for convenience
pub use array_utils::{
    category_rows, float64_column, get_column, partition_by_key, replace_column, set_column,
    string_column,
};
