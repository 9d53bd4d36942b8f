//! Typed row models for SPC input and output tables
//!
//! These models mirror the columns the pipeline consumes and produces and
//! convert to and from Arrow record batches through `serde_arrow`.

pub mod record;

// Re-export commonly used types
pub use record::{RawRecord, SpcRecord};
