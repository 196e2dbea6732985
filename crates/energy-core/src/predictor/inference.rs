//! Prediction service
//!
//! Applies a loaded artifact's regression function to an encoded vector,
//! after checking the vector was aligned to that artifact's schema.

use super::features::EncodedVector;
use crate::artifact::ModelArtifact;
use crate::billing::RoundingMode;
use crate::error::InferenceError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, warn};

/// Maximum inference latency before warning
const MAX_INFERENCE_MS: u128 = 5;

/// Runs the regression function and rounds its output
pub struct PredictionService {
    rounding: RoundingMode,
    inference_count: AtomicU64,
    slow_inference_count: AtomicU64,
}

impl PredictionService {
    pub fn new(rounding: RoundingMode) -> Self {
        Self {
            rounding,
            inference_count: AtomicU64::new(0),
            slow_inference_count: AtomicU64::new(0),
        }
    }

    /// Predict energy in kWh, rounded to 2 decimals
    pub fn predict(
        &self,
        vector: &EncodedVector,
        artifact: &ModelArtifact,
    ) -> Result<f64, InferenceError> {
        check_layout(vector, artifact)?;

        let start = Instant::now();
        let raw = artifact.regressor().predict(vector.values())?;
        let elapsed = start.elapsed();
        self.inference_count.fetch_add(1, Ordering::Relaxed);

        if elapsed.as_millis() > MAX_INFERENCE_MS {
            self.slow_inference_count.fetch_add(1, Ordering::Relaxed);
            warn!(elapsed_ms = elapsed.as_millis(), "Inference exceeded {}ms target", MAX_INFERENCE_MS);
        } else {
            debug!(elapsed_us = elapsed.as_micros(), "Inference completed");
        }

        if !raw.is_finite() {
            return Err(InferenceError::NonFinite(raw));
        }
        Ok(self.rounding.round2(raw))
    }

    /// Get inference statistics
    pub fn stats(&self) -> InferenceStats {
        InferenceStats {
            total_inferences: self.inference_count.load(Ordering::Relaxed),
            slow_inferences: self.slow_inference_count.load(Ordering::Relaxed),
        }
    }
}

impl Default for PredictionService {
    fn default() -> Self {
        Self::new(RoundingMode::default())
    }
}

fn check_layout(vector: &EncodedVector, artifact: &ModelArtifact) -> Result<(), InferenceError> {
    let schema = artifact.schema();
    if vector.len() != schema.len() {
        return Err(InferenceError::ShapeMismatch {
            expected: schema.len(),
            actual: vector.len(),
        });
    }
    for (index, (expected, actual)) in schema.names().zip(vector.columns()).enumerate() {
        if expected != actual {
            return Err(InferenceError::ColumnOrder {
                index,
                expected: expected.to_string(),
                actual: actual.clone(),
            });
        }
    }
    Ok(())
}

/// Inference statistics
#[derive(Debug, Clone)]
pub struct InferenceStats {
    pub total_inferences: u64,
    pub slow_inferences: u64,
}
