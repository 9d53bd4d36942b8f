//! Rolling statistical process control limits
//!
//! For every aggregated row the center line and sample standard deviation
//! are taken over the `window_size` rows that strictly precede it in its
//! category. Rows with fewer preceding rows get null limits. Categories are
//! processed independently, so values never leak across measures.
//!
//! Rows tagged with the `Year` frequency always get null limits.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use arrow::array::{ArrayRef, BooleanArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SpcError};
use crate::period::Frequency;
use crate::schema::{self, DATE, FREQUENCY, IS_ANOMALY, RATE, SIGMA_BANDS};
use crate::utils::arrow::array_utils::{float64_column, float64_from, partition_by_key, string_column};
use crate::utils::logging::{log_operation_complete, log_operation_start};

/// Parameters of the rolling computation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpcConfig {
    /// Number of preceding periods in each window
    pub window_size: usize,
    /// Sigma multiple used for the anomaly flag; bands for 1, 2 and 3 sigma
    /// are always produced
    pub sigma: f64,
    /// Append an `Is_Anomaly` column
    pub flag_anomalies: bool,
}

impl SpcConfig {
    /// Window of `window_size` periods at 3 sigma, without anomaly flag
    #[must_use]
    pub const fn new(window_size: usize) -> Self {
        Self {
            window_size,
            sigma: 3.0,
            flag_anomalies: false,
        }
    }
}

impl Default for SpcConfig {
    fn default() -> Self {
        Self::new(5)
    }
}

/// The last `capacity` values of a series
#[derive(Debug, Clone)]
pub struct RollingWindow {
    capacity: usize,
    values: VecDeque<f64>,
}

impl RollingWindow {
    /// Create an empty window
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            values: VecDeque::with_capacity(capacity),
        }
    }

    /// Add a value, evicting the oldest one when full
    pub fn push(&mut self, value: f64) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    /// Whether the window holds `capacity` values
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.capacity > 0 && self.values.len() == self.capacity
    }

    /// Number of values currently held
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the window is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Arithmetic mean of the held values
    #[must_use]
    pub fn mean(&self) -> f64 {
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }

    /// Sample standard deviation (n - 1 denominator); NaN for fewer than two values
    ///
    /// Recomputed over the held values so a non-finite value stops
    /// affecting the result once it is evicted.
    #[must_use]
    pub fn std_dev(&self) -> f64 {
        let n = self.values.len();
        if n < 2 {
            return f64::NAN;
        }
        let mean = self.mean();
        let squares: f64 = self.values.iter().map(|v| (v - mean) * (v - mean)).sum();
        (squares / (n - 1) as f64).sqrt()
    }
}

/// Center line and spread of one window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlLimits {
    /// Center line (window mean)
    pub center: f64,
    /// Sample standard deviation of the window
    pub std_dev: f64,
}

impl ControlLimits {
    /// Limits of a full window
    #[must_use]
    pub fn from_window(window: &RollingWindow) -> Self {
        Self {
            center: window.mean(),
            std_dev: window.std_dev(),
        }
    }

    /// Upper control limit at `k` standard deviations
    #[must_use]
    pub fn upper(&self, k: f64) -> f64 {
        self.center + k * self.std_dev
    }

    /// Lower control limit at `k` standard deviations, never below zero
    ///
    /// NaN stays NaN.
    #[must_use]
    pub fn lower(&self, k: f64) -> f64 {
        let value = self.center - k * self.std_dev;
        if value.is_nan() { value } else { value.max(0.0) }
    }

    /// Whether `rate` falls outside the `k` sigma band
    ///
    /// `None` when the rate or the limits are NaN.
    #[must_use]
    pub fn is_out_of_control(&self, rate: f64, k: f64) -> Option<bool> {
        let (upper, lower) = (self.upper(k), self.lower(k));
        if rate.is_nan() || upper.is_nan() || lower.is_nan() {
            return None;
        }
        Some(rate > upper || rate < lower)
    }
}

/// Compute rolling limits for every row of one category
///
/// `rates` and `known` are indexed by row; `rows` lists the category's rows
/// in chronological order. Rows of the unknown period get no limits and do
/// not enter the window.
fn category_limits(
    rows: &[usize],
    rates: &[Option<f64>],
    known: &[bool],
    window_size: usize,
    limits: &mut [Option<ControlLimits>],
) {
    let mut window = RollingWindow::new(window_size);
    for &row in rows {
        if !known[row] {
            continue;
        }
        if window.is_full() {
            limits[row] = Some(ControlLimits::from_window(&window));
        }
        window.push(rates[row].unwrap_or(f64::NAN));
    }
}

fn limit_column(limits: &[Option<ControlLimits>], value: impl Fn(&ControlLimits) -> f64) -> ArrayRef {
    float64_from(limits.iter().map(|l| l.as_ref().map(&value)).collect())
}

/// Append rolling SPC columns to an aggregated batch
///
/// The batch must be sorted chronologically within each category, as
/// produced by [`crate::algorithm::aggregate::aggregate_by_period`]. Rows,
/// row order and existing columns are unchanged.
///
/// # Arguments
/// * `batch` - Aggregated rows with `Rate`, `Date` and `frequency` columns
/// * `key_columns` - Category key columns
/// * `config` - Window size, sigma and anomaly flag switch
pub fn rolling_spc<S: AsRef<str>>(
    batch: &RecordBatch,
    key_columns: &[S],
    config: &SpcConfig,
) -> Result<RecordBatch> {
    if config.window_size == 0 {
        return Err(SpcError::Config("window size must be at least 1".to_string()));
    }
    let start = Instant::now();
    let stage = format!("Rolling SPC (window {})", config.window_size);
    log_operation_start(&stage, batch.num_rows());

    let rates: Vec<Option<f64>> = float64_column(batch, RATE)?.iter().collect();
    let known: Vec<bool> = string_column(batch, DATE)?.iter().map(|d| d.is_some()).collect();
    let yearly: Vec<bool> = string_column(batch, FREQUENCY)?
        .iter()
        .map(|f| f == Some(Frequency::Year.as_str()))
        .collect();

    let mut limits: Vec<Option<ControlLimits>> = vec![None; batch.num_rows()];
    for rows in partition_by_key(batch, key_columns)? {
        category_limits(&rows, &rates, &known, config.window_size, &mut limits);
    }

    // yearly control limits are not reported
    for (limit, is_year) in limits.iter_mut().zip(&yearly) {
        if *is_year {
            *limit = None;
        }
    }

    let mut fields: Vec<Field> = batch.schema().fields().iter().map(|f| f.as_ref().clone()).collect();
    let mut columns: Vec<ArrayRef> = batch.columns().to_vec();

    fields.extend(schema::spc_fields());
    columns.push(limit_column(&limits, |l| l.center));
    columns.push(limit_column(&limits, |l| l.std_dev));
    for k in SIGMA_BANDS {
        let k = f64::from(k);
        columns.push(limit_column(&limits, |l| l.upper(k)));
        columns.push(limit_column(&limits, |l| l.lower(k)));
    }

    if config.flag_anomalies {
        let flags: BooleanArray = limits
            .iter()
            .zip(&rates)
            .map(|(limit, rate)| match (limit, rate) {
                (Some(limit), Some(rate)) => limit.is_out_of_control(*rate, config.sigma),
                _ => None,
            })
            .collect();
        let flagged = flags.true_count();
        if flagged > 0 {
            log::info!("{stage}: {flagged} rows outside {} sigma limits", config.sigma);
        }
        fields.push(Field::new(IS_ANOMALY, DataType::Boolean, true));
        columns.push(Arc::new(flags));
    }

    let result = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?;
    log_operation_complete(&stage, result.num_rows(), Some(start.elapsed()));
    Ok(result)
}
