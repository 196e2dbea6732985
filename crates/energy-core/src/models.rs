//! Core data models for the energy predictor

use serde::{Deserialize, Serialize};
use std::fmt;

/// A loosely typed observation field as received from a caller
///
/// JSON numbers and numeric strings are both accepted; anything else is
/// kept so the encoder can report it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl RawValue {
    /// Numeric view of the value, if it has one
    pub fn as_number(&self) -> Option<f64> {
        let value = match self {
            RawValue::Number(n) => *n,
            RawValue::Text(s) => s.trim().parse::<f64>().ok()?,
            RawValue::Other(_) => return None,
        };
        value.is_finite().then_some(value)
    }

    /// Label used when the value names a category
    pub fn as_label(&self) -> String {
        match self {
            RawValue::Text(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Number(n) => write!(f, "{}", n),
            RawValue::Text(s) => write!(f, "{:?}", s),
            RawValue::Other(v) => write!(f, "{}", v),
        }
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

/// One reading to predict from, in the wire field names used by callers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawObservation {
    #[serde(rename = "Hour", default, skip_serializing_if = "Option::is_none")]
    pub hour: Option<RawValue>,

    #[serde(rename = "Temperature", default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<RawValue>,

    #[serde(rename = "Machine_Status", default, skip_serializing_if = "Option::is_none")]
    pub machine_status: Option<RawValue>,
}

impl RawObservation {
    pub fn new(hour: f64, temperature: f64, machine_status: &str) -> Self {
        Self {
            hour: Some(hour.into()),
            temperature: Some(temperature.into()),
            machine_status: Some(machine_status.into()),
        }
    }
}

/// Outcome of a successful estimate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub predicted_kwh: f64,
    pub estimated_bill: f64,
    pub rate_used: f64,
}

/// Whether predictions can currently be served
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    Ok,
    Degraded,
}

/// Status report, answerable with or without a loaded model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub status: ServiceState,
    pub rate: f64,
    pub model_loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_fingerprint: Option<String>,
    /// Unix seconds when the artifact was loaded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_loaded_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_columns: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observation_wire_names() {
        let obs: RawObservation = serde_json::from_str(
            r#"{"Hour": 12, "Temperature": 23.5, "Machine_Status": "Idle", "Extra": true}"#,
        )
        .unwrap();
        assert_eq!(obs, RawObservation::new(12.0, 23.5, "Idle"));
    }

    #[test]
    fn test_missing_and_null_fields_are_none() {
        let obs: RawObservation =
            serde_json::from_str(r#"{"Hour": null, "Machine_Status": "Off"}"#).unwrap();
        assert!(obs.hour.is_none());
        assert!(obs.temperature.is_none());
        assert!(obs.machine_status.is_some());
    }

    #[test]
    fn test_numeric_coercion() {
        assert_eq!(RawValue::from(3.0).as_number(), Some(3.0));
        assert_eq!(RawValue::from(" 7.25 ").as_number(), Some(7.25));
        assert_eq!(RawValue::from("warm").as_number(), None);
        assert_eq!(RawValue::from("NaN").as_number(), None);
        assert_eq!(RawValue::Other(serde_json::json!(true)).as_number(), None);
    }

    #[test]
    fn test_label_from_number() {
        assert_eq!(RawValue::from(5.0).as_label(), "5");
        assert_eq!(RawValue::from("Idle").as_label(), "Idle");
    }
}
