//! Multi-granularity SPC dataset composition
//!
//! Runs aggregation and rolling SPC once per enabled granularity, renders
//! quarter labels for display, and concatenates the results as
//! month, quarter, year.

use std::sync::Arc;
use std::time::Instant;

use arrow::array::{ArrayRef, StringArray};
use arrow::compute::concat_batches;
use arrow::record_batch::RecordBatch;
use lazy_static::lazy_static;
use rayon::prelude::*;
use regex::Regex;

use super::aggregate::{AggregationRequest, aggregate_by_period};
use super::spc::{SpcConfig, rolling_spc};
use crate::config::{GranularityConfig, PipelineConfig};
use crate::error::{Result, SpcError};
use crate::period::{Frequency, add_period_columns};
use crate::schema::{DATE, FREQUENCY};
use crate::utils::arrow::array_utils::{replace_column, string_column};
use crate::utils::logging::{log_operation_complete, log_operation_start};

lazy_static! {
    static ref QUARTER_SUFFIX: Regex = Regex::new(r"-(\d+)").unwrap();
}

/// Render quarter storage labels (`2024-3`) as display labels (`2024-Q3`)
///
/// Only rows whose `frequency` is `Quarter` are touched.
pub fn format_quarter_labels(batch: &RecordBatch) -> Result<RecordBatch> {
    let dates = string_column(batch, DATE)?;
    let frequencies = string_column(batch, FREQUENCY)?;

    let formatted: StringArray = dates
        .iter()
        .zip(frequencies.iter())
        .map(|(date, frequency)| {
            date.map(|date| {
                if frequency == Some(Frequency::Quarter.as_str()) {
                    QUARTER_SUFFIX.replace(date, "-Q${1}").into_owned()
                } else {
                    date.to_string()
                }
            })
        })
        .collect();

    replace_column(batch, DATE, Arc::new(formatted) as ArrayRef)
}

/// Concatenate granularity results after checking they share one schema
pub fn concat_results(results: &[RecordBatch]) -> Result<RecordBatch> {
    let Some(first) = results.first() else {
        return Err(SpcError::SchemaMismatch("no results to concatenate".to_string()));
    };
    let schema = first.schema();

    for batch in &results[1..] {
        if batch.schema().fields() != schema.fields() {
            let names = |b: &RecordBatch| {
                b.schema()
                    .fields()
                    .iter()
                    .map(|f| format!("{}:{:?}", f.name(), f.data_type()))
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            return Err(SpcError::SchemaMismatch(format!(
                "[{}] vs [{}]",
                names(first),
                names(batch)
            )));
        }
    }

    Ok(concat_batches(&schema, results)?)
}

/// Builds the combined month/quarter/year SPC dataset
#[derive(Debug, Clone)]
pub struct SpcPipeline {
    config: PipelineConfig,
}

impl SpcPipeline {
    /// Create a pipeline from a validated configuration
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The configuration in use
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Aggregate and compute SPC limits for one granularity
    ///
    /// `decorated` must carry the period columns added by
    /// [`add_period_columns`].
    pub fn run_granularity(
        &self,
        decorated: &RecordBatch,
        granularity: &GranularityConfig,
    ) -> Result<RecordBatch> {
        let request = AggregationRequest::new(
            granularity.frequency,
            self.config.key_columns.clone(),
            self.config.sum_columns.clone(),
        )
        .with_rate_columns(self.config.rate_columns.clone());

        let aggregated = aggregate_by_period(decorated, &request)?;

        let spc_config = SpcConfig {
            window_size: granularity.window_size,
            sigma: self.config.sigma,
            flag_anomalies: self.config.flag_anomalies,
        };
        let with_limits = rolling_spc(&aggregated, &request.category_keys(), &spc_config)?;

        if granularity.frequency == Frequency::Quarter {
            format_quarter_labels(&with_limits)
        } else {
            Ok(with_limits)
        }
    }

    /// Run every enabled granularity and concatenate the results
    ///
    /// The granularities run in parallel; the output order is always
    /// month, quarter, year. The input batch is not modified.
    pub fn run(&self, batch: &RecordBatch) -> Result<RecordBatch> {
        let start = Instant::now();
        log_operation_start("SPC dataset", batch.num_rows());

        let decorated = add_period_columns(batch, &self.config.date_column, &self.config.date_formats)?;

        let results = self
            .config
            .enabled_granularities()
            .par_iter()
            .map(|granularity| {
                self.run_granularity(&decorated, granularity).inspect_err(|e| {
                    log::error!("{} granularity failed: {e}", granularity.frequency);
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let combined = concat_results(&results)?;
        log_operation_complete("SPC dataset", combined.num_rows(), Some(start.elapsed()));
        Ok(combined)
    }
}

/// Build the combined SPC dataset with the given configuration
pub fn build_spc_dataset(batch: &RecordBatch, config: &PipelineConfig) -> Result<RecordBatch> {
    SpcPipeline::new(config.clone())?.run(batch)
}
