//! Utility functions and helpers
//!
//! This module contains Arrow helpers, table IO and logging utilities used
//! by the pipeline stages.

pub mod arrow;
pub mod io;
pub mod logging;
