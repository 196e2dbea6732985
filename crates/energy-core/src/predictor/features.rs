//! Feature encoding for ML inference
//!
//! Turns a raw observation into the exact column layout a trained model was
//! fitted on. Numeric fields pass through, the categorical field is one-hot
//! encoded, and the result is aligned to the schema: zero-filled where the
//! observation produced nothing and stripped of columns the schema never had.

use crate::error::EncodingError;
use crate::models::{RawObservation, RawValue};
use crate::schema::{CategoricalField, ColumnKind, FeatureSchema, NumericField};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// What to do with a category label the schema has no indicator for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnseenCategoryPolicy {
    /// Encode every indicator of the field as zero
    #[default]
    ZeroFill,
    /// Fail the request with [`EncodingError::UnseenCategory`]
    Reject,
}

/// Numeric vector aligned to a feature schema
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncodedVector {
    columns: Vec<String>,
    values: Vec<f64>,
}

impl EncodedVector {
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Column names the values were aligned to, in order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Encodes raw observations against a feature schema
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureEncoder {
    policy: UnseenCategoryPolicy,
}

impl FeatureEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: UnseenCategoryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> UnseenCategoryPolicy {
        self.policy
    }

    /// Encode `observation` into a vector of exactly `schema.len()` values
    ///
    /// A field is required only if the schema has a column for it.
    pub fn encode(
        &self,
        observation: &RawObservation,
        schema: &FeatureSchema,
    ) -> Result<EncodedVector, EncodingError> {
        let produced = self.produce(observation, schema)?;
        self.align(produced, schema)
    }

    /// Columns the observation yields on its own, before alignment
    fn produce(
        &self,
        observation: &RawObservation,
        schema: &FeatureSchema,
    ) -> Result<Produced, EncodingError> {
        let mut produced = Produced::default();

        for field in NumericField::ALL {
            if !requires_numeric(schema, field) {
                continue;
            }
            let raw = match field {
                NumericField::Hour => observation.hour.as_ref(),
                NumericField::Temperature => observation.temperature.as_ref(),
            };
            produced
                .columns
                .insert(field.name().to_string(), numeric(field, raw)?);
        }

        for field in CategoricalField::ALL {
            if schema.categories(field).is_empty() {
                continue;
            }
            let raw = match field {
                CategoricalField::MachineStatus => observation.machine_status.as_ref(),
            };
            let label = raw
                .map(RawValue::as_label)
                .ok_or(EncodingError::MissingField(field.name()))?;
            produced.columns.insert(field.indicator(&label), 1.0);
            produced.labels.push((field, label));
        }

        Ok(produced)
    }

    fn align(
        &self,
        mut produced: Produced,
        schema: &FeatureSchema,
    ) -> Result<EncodedVector, EncodingError> {
        for (field, category) in &produced.labels {
            if schema.categories(*field).contains(&category.as_str()) {
                continue;
            }
            match self.policy {
                UnseenCategoryPolicy::ZeroFill => {
                    debug!(field = field.name(), category = %category, "Dropping unseen category");
                }
                UnseenCategoryPolicy::Reject => {
                    return Err(EncodingError::UnseenCategory {
                        field: field.name(),
                        category: category.clone(),
                    });
                }
            }
        }

        let mut columns = Vec::with_capacity(schema.len());
        let mut values = Vec::with_capacity(schema.len());
        for column in schema.columns() {
            let value = match column.kind {
                ColumnKind::Unmapped => 0.0,
                _ => produced.columns.remove(&column.name).unwrap_or(0.0),
            };
            columns.push(column.name.clone());
            values.push(value);
        }

        Ok(EncodedVector { columns, values })
    }
}

#[derive(Default)]
struct Produced {
    columns: HashMap<String, f64>,
    labels: Vec<(CategoricalField, String)>,
}

fn requires_numeric(schema: &FeatureSchema, field: NumericField) -> bool {
    schema
        .columns()
        .iter()
        .any(|c| c.kind == ColumnKind::Numeric(field))
}

fn numeric(field: NumericField, raw: Option<&RawValue>) -> Result<f64, EncodingError> {
    let raw = raw.ok_or(EncodingError::MissingField(field.name()))?;
    raw.as_number().ok_or_else(|| EncodingError::NonNumeric {
        field: field.name(),
        value: raw.to_string(),
    })
}
