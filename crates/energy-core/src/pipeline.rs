//! End-to-end estimate: encode, predict, bill
//!
//! The pipeline owns the artifact state loaded at startup and is shared
//! read-only between request handlers.

use crate::artifact::{ArtifactState, ModelArtifact};
use crate::billing::BillingCalculator;
use crate::error::PipelineError;
use crate::models::{PredictionResult, RawObservation, ServiceState, ServiceStatus};
use crate::predictor::{EncodedVector, FeatureEncoder, InferenceStats, PredictionService};

pub struct InferencePipeline {
    artifact: ArtifactState,
    encoder: FeatureEncoder,
    service: PredictionService,
    billing: BillingCalculator,
}

impl InferencePipeline {
    pub fn new(
        artifact: ArtifactState,
        encoder: FeatureEncoder,
        billing: BillingCalculator,
    ) -> Self {
        Self {
            artifact,
            encoder,
            service: PredictionService::new(billing.rounding()),
            billing,
        }
    }

    /// Encode an observation against the loaded schema
    pub fn encode(&self, observation: &RawObservation) -> Result<EncodedVector, PipelineError> {
        let artifact = self.ready()?;
        Ok(self.encoder.encode(observation, artifact.schema())?)
    }

    /// Predict energy use for one observation and price it
    pub fn estimate(
        &self,
        observation: &RawObservation,
    ) -> Result<PredictionResult, PipelineError> {
        let artifact = self.ready()?;
        let vector = self.encoder.encode(observation, artifact.schema())?;
        let predicted_kwh = self.service.predict(&vector, artifact)?;

        Ok(PredictionResult {
            predicted_kwh,
            estimated_bill: self.billing.bill(predicted_kwh),
            rate_used: self.billing.rate(),
        })
    }

    /// Report readiness and the configured rate; never fails
    pub fn status(&self) -> ServiceStatus {
        match &self.artifact {
            ArtifactState::Ready(artifact) => ServiceStatus {
                status: ServiceState::Ok,
                rate: self.billing.rate(),
                model_loaded: true,
                model_kind: Some(artifact.kind().to_string()),
                model_fingerprint: Some(artifact.fingerprint().to_string()),
                model_loaded_at: Some(artifact.loaded_at()),
                schema_columns: Some(artifact.schema().names().map(String::from).collect()),
                reason: None,
            },
            ArtifactState::Unavailable { reason } => ServiceStatus {
                status: ServiceState::Degraded,
                rate: self.billing.rate(),
                model_loaded: false,
                model_kind: None,
                model_fingerprint: None,
                model_loaded_at: None,
                schema_columns: None,
                reason: Some(reason.clone()),
            },
        }
    }

    pub fn rate(&self) -> f64 {
        self.billing.rate()
    }

    pub fn inference_stats(&self) -> InferenceStats {
        self.service.stats()
    }

    fn ready(&self) -> Result<&ModelArtifact, PipelineError> {
        match &self.artifact {
            ArtifactState::Ready(artifact) => Ok(artifact.as_ref()),
            ArtifactState::Unavailable { reason } => {
                Err(PipelineError::ArtifactUnavailable(reason.clone()))
            }
        }
    }
}
