//! Measure catalog and record preparation
//!
//! Raw quality records name only their measure. The catalog supplies the
//! per-N multiplier and the human-readable rate definition for each
//! measure, and [`prepare_records`] attaches both before aggregation.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Int64Array, StringArray};
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::schema::{DEFINITIONS, EXPECTED_EVENTS, MEASURE, MULTIPLIER};
use crate::utils::arrow::array_utils::{float64_column, replace_column, set_column, string_column};
use crate::utils::logging::log_warning;

/// Definition label given to measures missing from the catalog
pub const UNKNOWN_DEFINITION: &str = "Unknown";

/// How one measure's rate is scaled and described
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasureDefinition {
    /// Rate is reported per this many units of exposure
    pub multiplier: i64,
    /// Description of the rate, e.g. `Per 1000 device days`
    pub definition: String,
}

impl MeasureDefinition {
    #[must_use]
    pub fn new(multiplier: i64, definition: impl Into<String>) -> Self {
        Self {
            multiplier,
            definition: definition.into(),
        }
    }
}

/// Mapping from measure name to its rate definition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MeasureCatalog {
    measures: BTreeMap<String, MeasureDefinition>,
}

impl MeasureCatalog {
    /// An empty catalog
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The hospital-acquired condition measures
    #[must_use]
    pub fn hospital() -> Self {
        let mut catalog = Self::new();
        catalog.insert("HAPI", MeasureDefinition::new(100, "Per 100 surveyed patients"));
        catalog.insert(
            "Falls with Injury",
            MeasureDefinition::new(1000, "Per 1000 patient days"),
        );
        catalog.insert("CAUTI", MeasureDefinition::new(1000, "Per 1000 device days"));
        catalog.insert("CLABSI", MeasureDefinition::new(1000, "Per 1000 device days"));
        catalog
    }

    /// Load a catalog from a JSON object keyed by measure name
    ///
    /// ```json
    /// {"HAPI": {"multiplier": 100, "definition": "Per 100 surveyed patients"}}
    /// ```
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Add or replace a measure
    pub fn insert(&mut self, measure: impl Into<String>, definition: MeasureDefinition) {
        self.measures.insert(measure.into(), definition);
    }

    /// Look up a measure
    #[must_use]
    pub fn get(&self, measure: &str) -> Option<&MeasureDefinition> {
        self.measures.get(measure)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.measures.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.measures.is_empty()
    }
}

/// Round a column to the nearest integer, ties to even
///
/// Nulls and non-finite values become null.
fn round_to_int64(batch: &RecordBatch, column: &str) -> Result<ArrayRef> {
    let rounded: Int64Array = float64_column(batch, column)?
        .iter()
        .map(|v| {
            v.filter(|v| v.is_finite())
                .map(|v| v.round_ties_even() as i64)
        })
        .collect();
    Ok(Arc::new(rounded))
}

/// Attach `Multiplier` and `Definitions` to raw records
///
/// When `expected_events_column` is given that column is rounded to
/// integers first. Existing `Multiplier` or `Definitions` columns are
/// replaced. Measures missing from the catalog get a null multiplier and
/// the definition `Unknown`.
pub fn prepare_records(
    batch: &RecordBatch,
    catalog: &MeasureCatalog,
    expected_events_column: Option<&str>,
) -> Result<RecordBatch> {
    let mut batch = batch.clone();
    if let Some(column) = expected_events_column {
        let rounded = round_to_int64(&batch, column)?;
        batch = replace_column(&batch, column, rounded)?;
    }

    let measures = string_column(&batch, MEASURE)?;
    let definitions: Vec<Option<&MeasureDefinition>> = measures
        .iter()
        .map(|m| m.and_then(|m| catalog.get(m)))
        .collect();

    let unknown = definitions.iter().filter(|d| d.is_none()).count();
    if unknown > 0 {
        log_warning(
            "Record preparation",
            &format!("{unknown} records have a measure missing from the catalog"),
        );
    }

    let multipliers: Int64Array = definitions.iter().map(|d| d.map(|d| d.multiplier)).collect();
    let labels: StringArray = definitions
        .iter()
        .map(|d| Some(d.map_or(UNKNOWN_DEFINITION, |d| d.definition.as_str())))
        .collect();

    let batch = set_column(&batch, MULTIPLIER, Arc::new(multipliers))?;
    set_column(&batch, DEFINITIONS, Arc::new(labels))
}

/// [`prepare_records`] with the default `Expected Events` column
pub fn prepare_hospital_records(batch: &RecordBatch, catalog: &MeasureCatalog) -> Result<RecordBatch> {
    let expected = batch
        .schema()
        .index_of(EXPECTED_EVENTS)
        .is_ok()
        .then_some(EXPECTED_EVENTS);
    prepare_records(batch, catalog, expected)
}
