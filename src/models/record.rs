//! Raw measure records and SPC output rows.

use std::sync::Arc;

use arrow::array::ArrayRef;
use arrow::compute::kernels::cast::cast;
use arrow::datatypes::{DataType, Field, FieldRef, Schema};
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SpcError};
use crate::schema;
use crate::utils::arrow::array_utils::get_column;

/// One raw quality measure observation, before period decomposition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Measure name
    #[serde(rename = "Measure")]
    pub measure: String,
    /// Discharge date as text, e.g. `2024-03-15`
    #[serde(rename = "Discharge Month")]
    pub discharge_month: Option<String>,
    /// Event count
    #[serde(rename = "Numerator")]
    pub numerator: i64,
    /// Exposure count
    #[serde(rename = "Denominator")]
    pub denominator: i64,
    /// Risk-adjusted expected events
    #[serde(rename = "Expected Events")]
    pub expected_events: Option<f64>,
}

impl RawRecord {
    /// Create a record dated `discharge_month`
    #[must_use]
    pub fn new(measure: &str, discharge_month: &str, numerator: i64, denominator: i64) -> Self {
        Self {
            measure: measure.to_string(),
            discharge_month: Some(discharge_month.to_string()),
            numerator,
            denominator,
            expected_events: None,
        }
    }

    /// Set the expected events value
    #[must_use]
    pub fn with_expected_events(mut self, expected_events: f64) -> Self {
        self.expected_events = Some(expected_events);
        self
    }

    /// Arrow schema of raw record tables
    #[must_use]
    pub fn schema() -> Schema {
        Schema::new(vec![
            Field::new(schema::MEASURE, DataType::Utf8, false),
            Field::new("Discharge Month", DataType::Utf8, true),
            Field::new(schema::NUMERATOR, DataType::Int64, false),
            Field::new(schema::DENOMINATOR, DataType::Int64, false),
            Field::new(schema::EXPECTED_EVENTS, DataType::Float64, true),
        ])
    }

    /// Convert records to a `RecordBatch` with [`RawRecord::schema`]
    pub fn to_record_batch(records: &[Self]) -> Result<RecordBatch> {
        let fields: Vec<FieldRef> = Self::schema().fields().to_vec();
        Ok(serde_arrow::to_record_batch(&fields, &records)?)
    }
}

/// One row of the combined SPC dataset
///
/// Summed counts are read as floating point so integer and fractional
/// inputs load the same way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpcRecord {
    #[serde(rename = "Measure")]
    pub measure: Option<String>,
    #[serde(rename = "Definitions")]
    pub definitions: Option<String>,
    #[serde(rename = "Multiplier")]
    pub multiplier: Option<i64>,
    #[serde(rename = "Numerator")]
    pub numerator: Option<f64>,
    #[serde(rename = "Denominator")]
    pub denominator: Option<f64>,
    #[serde(rename = "Expected Events")]
    pub expected_events: Option<f64>,
    /// `Month`, `Quarter` or `Year`
    pub frequency: String,
    #[serde(rename = "Rate")]
    pub rate: Option<f64>,
    /// Display label of the period; `None` for the unknown period
    #[serde(rename = "Date")]
    pub date: Option<String>,
    /// 1 for the latest period of the category
    #[serde(rename = "RowNumber")]
    pub row_number: i64,
    #[serde(rename = "Rolling_CL")]
    pub rolling_cl: Option<f64>,
    #[serde(rename = "Rolling_Std")]
    pub rolling_std: Option<f64>,
    #[serde(rename = "Rolling_UCL_1STD")]
    pub rolling_ucl_1std: Option<f64>,
    #[serde(rename = "Rolling_LCL_1STD")]
    pub rolling_lcl_1std: Option<f64>,
    #[serde(rename = "Rolling_UCL_2STD")]
    pub rolling_ucl_2std: Option<f64>,
    #[serde(rename = "Rolling_LCL_2STD")]
    pub rolling_lcl_2std: Option<f64>,
    #[serde(rename = "Rolling_UCL_3STD")]
    pub rolling_ucl_3std: Option<f64>,
    #[serde(rename = "Rolling_LCL_3STD")]
    pub rolling_lcl_3std: Option<f64>,
    /// Present only when anomaly flagging is enabled
    #[serde(rename = "Is_Anomaly", default)]
    pub is_anomaly: Option<bool>,
}

impl SpcRecord {
    /// Columns read into the typed view and the type each is cast to
    fn projection() -> Vec<(String, DataType)> {
        let mut columns = vec![
            (schema::MEASURE.to_string(), DataType::Utf8),
            (schema::DEFINITIONS.to_string(), DataType::Utf8),
            (schema::MULTIPLIER.to_string(), DataType::Int64),
            (schema::NUMERATOR.to_string(), DataType::Float64),
            (schema::DENOMINATOR.to_string(), DataType::Float64),
            (schema::EXPECTED_EVENTS.to_string(), DataType::Float64),
            (schema::FREQUENCY.to_string(), DataType::Utf8),
            (schema::RATE.to_string(), DataType::Float64),
            (schema::DATE.to_string(), DataType::Utf8),
            (schema::ROW_NUMBER.to_string(), DataType::Int64),
        ];
        columns.extend(
            schema::spc_columns()
                .into_iter()
                .map(|name| (name, DataType::Float64)),
        );
        columns
    }

    /// Read the rows of a combined SPC dataset
    ///
    /// Standard columns missing from the batch read as `None`; extra columns
    /// are ignored. `frequency`, `RowNumber` and the SPC columns are required.
    pub fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let batch_schema = batch.schema();
        let mut fields: Vec<Field> = Vec::new();
        let mut columns: Vec<ArrayRef> = Vec::new();

        let required = |name: &str| {
            name == schema::FREQUENCY || name == schema::ROW_NUMBER || name.starts_with("Rolling_")
        };
        for (name, data_type) in Self::projection() {
            let nullable = match batch_schema.field_with_name(&name) {
                Ok(field) => field.is_nullable(),
                Err(_) if required(&name) => return Err(SpcError::column_not_found(name)),
                Err(_) => continue,
            };
            let array = cast(&get_column(batch, &name)?, &data_type)?;
            fields.push(Field::new(name, data_type, nullable));
            columns.push(array);
        }
        if batch_schema.index_of(schema::IS_ANOMALY).is_ok() {
            let flags = cast(&get_column(batch, schema::IS_ANOMALY)?, &DataType::Boolean)?;
            fields.push(Field::new(schema::IS_ANOMALY, DataType::Boolean, true));
            columns.push(flags);
        }

        let projected = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?;
        Ok(serde_arrow::from_record_batch::<Vec<Self>>(&projected)?)
    }

    /// Whether the row carries control limits
    #[must_use]
    pub fn has_limits(&self) -> bool {
        self.rolling_cl.is_some()
    }
}
