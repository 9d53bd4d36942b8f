//! Configuration for the SPC pipeline.
//!
//! All values have defaults matching the hospital quality dataset: records
//! keyed by measure, summed numerator/denominator/expected events, and
//! rolling windows of 24 months, 8 quarters and 2 years.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpcError};
use crate::period::Frequency;
use crate::schema::{self, DateFormatConfig};

/// Columns the rate is derived from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateColumns {
    /// Event count column
    pub numerator: String,
    /// Exposure count column
    pub denominator: String,
    /// Per-N scale factor column
    pub multiplier: String,
}

impl Default for RateColumns {
    fn default() -> Self {
        Self {
            numerator: schema::NUMERATOR.to_string(),
            denominator: schema::DENOMINATOR.to_string(),
            multiplier: schema::MULTIPLIER.to_string(),
        }
    }
}

/// Settings for one aggregation granularity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GranularityConfig {
    /// Granularity this entry applies to
    pub frequency: Frequency,
    /// Number of preceding periods in each rolling window
    pub window_size: usize,
    /// Whether this granularity is produced at all
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

const fn enabled_by_default() -> bool {
    true
}

impl GranularityConfig {
    /// An enabled granularity with the given window
    #[must_use]
    pub const fn new(frequency: Frequency, window_size: usize) -> Self {
        Self {
            frequency,
            window_size,
            enabled: true,
        }
    }

    /// The historical default window for a granularity
    #[must_use]
    pub const fn default_for(frequency: Frequency) -> Self {
        match frequency {
            Frequency::Month => Self::new(Frequency::Month, 24),
            Frequency::Quarter => Self::new(Frequency::Quarter, 8),
            Frequency::Year => Self::new(Frequency::Year, 2),
        }
    }
}

/// Configuration for a full multi-granularity run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Column holding the raw record date
    pub date_column: String,
    /// Category key columns
    pub key_columns: Vec<String>,
    /// Columns summed per category and period
    pub sum_columns: Vec<String>,
    /// Columns the rate is derived from
    pub rate_columns: RateColumns,
    /// Per-granularity window sizes
    pub granularities: Vec<GranularityConfig>,
    /// Sigma multiple used for the anomaly flag
    pub sigma: f64,
    /// Append an `Is_Anomaly` column
    pub flag_anomalies: bool,
    /// Accepted string date formats
    pub date_formats: DateFormatConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            date_column: "Discharge Month".to_string(),
            key_columns: vec![
                schema::MEASURE.to_string(),
                schema::DEFINITIONS.to_string(),
                schema::MULTIPLIER.to_string(),
            ],
            sum_columns: vec![
                schema::NUMERATOR.to_string(),
                schema::DENOMINATOR.to_string(),
                schema::EXPECTED_EVENTS.to_string(),
            ],
            rate_columns: RateColumns::default(),
            granularities: Frequency::ALL
                .iter()
                .map(|f| GranularityConfig::default_for(*f))
                .collect(),
            sigma: 3.0,
            flag_anomalies: false,
            date_formats: DateFormatConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from a JSON file
    ///
    /// Missing fields take their default values.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Settings for a granularity, if configured
    #[must_use]
    pub fn granularity(&self, frequency: Frequency) -> Option<&GranularityConfig> {
        self.granularities.iter().find(|g| g.frequency == frequency)
    }

    /// Set the window size of a granularity, adding it if absent
    pub fn set_window_size(&mut self, frequency: Frequency, window_size: usize) {
        match self.granularities.iter_mut().find(|g| g.frequency == frequency) {
            Some(granularity) => granularity.window_size = window_size,
            None => self
                .granularities
                .push(GranularityConfig::new(frequency, window_size)),
        }
    }

    /// Enabled granularities in output order (month, quarter, year)
    #[must_use]
    pub fn enabled_granularities(&self) -> Vec<GranularityConfig> {
        Frequency::ALL
            .iter()
            .filter_map(|f| self.granularity(*f))
            .filter(|g| g.enabled)
            .cloned()
            .collect()
    }

    /// Check the configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.key_columns.is_empty() {
            return Err(SpcError::Config("at least one key column is required".to_string()));
        }
        if self.date_column.is_empty() {
            return Err(SpcError::Config("date column name is empty".to_string()));
        }

        for column in [&self.rate_columns.numerator, &self.rate_columns.denominator] {
            if !self.sum_columns.contains(column) {
                return Err(SpcError::Config(format!(
                    "rate column '{column}' must be one of the summed columns"
                )));
            }
        }
        let multiplier = &self.rate_columns.multiplier;
        if !self.key_columns.contains(multiplier) && !self.sum_columns.contains(multiplier) {
            return Err(SpcError::Config(format!(
                "multiplier column '{multiplier}' must be a key or summed column"
            )));
        }

        for frequency in Frequency::ALL {
            let count = self
                .granularities
                .iter()
                .filter(|g| g.frequency == frequency)
                .count();
            if count > 1 {
                return Err(SpcError::Config(format!("{frequency} is configured {count} times")));
            }
        }
        if let Some(g) = self.granularities.iter().find(|g| g.enabled && g.window_size == 0) {
            return Err(SpcError::Config(format!(
                "{} window size must be at least 1",
                g.frequency
            )));
        }
        if self.enabled_granularities().is_empty() {
            return Err(SpcError::Config("no granularity is enabled".to_string()));
        }
        if !self.sigma.is_finite() || self.sigma <= 0.0 {
            return Err(SpcError::Config(format!("sigma must be positive, got {}", self.sigma)));
        }
        Ok(())
    }
}

impl fmt::Display for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "SPC Pipeline Configuration:")?;
        writeln!(f, "  Date Column: {}", self.date_column)?;
        writeln!(f, "  Key Columns: {}", self.key_columns.join(", "))?;
        writeln!(f, "  Summed Columns: {}", self.sum_columns.join(", "))?;
        writeln!(
            f,
            "  Rate: {} / {} * {}",
            self.rate_columns.numerator, self.rate_columns.denominator, self.rate_columns.multiplier
        )?;
        for g in &self.granularities {
            let state = if g.enabled { "" } else { " (disabled)" };
            writeln!(f, "  {} Window: {}{state}", g.frequency, g.window_size)?;
        }
        writeln!(f, "  Sigma: {}", self.sigma)?;
        writeln!(f, "  Anomaly Flag: {}", self.flag_anomalies)?;
        Ok(())
    }
}
