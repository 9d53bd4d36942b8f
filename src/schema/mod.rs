//! Column names and field definitions shared by the pipeline stages.

pub mod date_utils;

use arrow::datatypes::{DataType, Field};

pub use date_utils::{DateFormatConfig, detect_date_format, parse_date_string};

/// Primary category key column
pub const MEASURE: &str = "Measure";
/// Rate definition label column
pub const DEFINITIONS: &str = "Definitions";
/// Rate multiplier column
pub const MULTIPLIER: &str = "Multiplier";
/// Event count column
pub const NUMERATOR: &str = "Numerator";
/// Exposure count column
pub const DENOMINATOR: &str = "Denominator";
/// Risk-adjusted expected event column
pub const EXPECTED_EVENTS: &str = "Expected Events";

/// Granularity tag column
pub const FREQUENCY: &str = "frequency";
/// Derived rate column
pub const RATE: &str = "Rate";
/// Period label column after aggregation
pub const DATE: &str = "Date";
/// Reverse chronological rank column
pub const ROW_NUMBER: &str = "RowNumber";

/// Rolling center line
pub const ROLLING_CL: &str = "Rolling_CL";
/// Rolling sample standard deviation
pub const ROLLING_STD: &str = "Rolling_Std";
/// Optional out-of-control flag
pub const IS_ANOMALY: &str = "Is_Anomaly";

/// Sigma multiples for which control bands are emitted
pub const SIGMA_BANDS: [u8; 3] = [1, 2, 3];

/// Name of the upper control limit column for `k` standard deviations
#[must_use]
pub fn ucl_column(k: u8) -> String {
    format!("Rolling_UCL_{k}STD")
}

/// Name of the lower control limit column for `k` standard deviations
#[must_use]
pub fn lcl_column(k: u8) -> String {
    format!("Rolling_LCL_{k}STD")
}

/// All SPC column names in output order
#[must_use]
pub fn spc_columns() -> Vec<String> {
    let mut columns = vec![ROLLING_CL.to_string(), ROLLING_STD.to_string()];
    for k in SIGMA_BANDS {
        columns.push(ucl_column(k));
        columns.push(lcl_column(k));
    }
    columns
}

/// Nullable `Float64` fields for the SPC columns
#[must_use]
pub fn spc_fields() -> Vec<Field> {
    spc_columns()
        .into_iter()
        .map(|name| Field::new(name, DataType::Float64, true))
        .collect()
}
