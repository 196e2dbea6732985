//! Health tracking for the prediction service
//!
//! Backs the liveness and readiness probes. A missing model artifact makes
//! the service degraded (still live, still answering status queries) and
//! not ready. Repeated inference failures with a loaded artifact make the
//! pipeline unhealthy until a prediction succeeds again.

use crate::artifact::ArtifactState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Consecutive inference failures before the pipeline is reported unhealthy
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Running but unable to serve some requests
    Degraded,
    Unhealthy,
}

impl ComponentStatus {
    /// Liveness holds for everything short of unhealthy
    pub fn is_operational(&self) -> bool {
        !matches!(self, ComponentStatus::Unhealthy)
    }

    fn worst(self, other: ComponentStatus) -> ComponentStatus {
        use ComponentStatus::*;
        match (self, other) {
            (Unhealthy, _) | (_, Unhealthy) => Unhealthy,
            (Degraded, _) | (_, Degraded) => Degraded,
            _ => Healthy,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    fn new(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: BTreeMap<String, ComponentHealth>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Component names for health tracking
pub mod components {
    pub const MODEL_ARTIFACT: &str = "model_artifact";
    pub const PIPELINE: &str = "pipeline";
}

#[derive(Debug)]
struct Inner {
    artifact: ComponentHealth,
    pipeline: ComponentHealth,
    consecutive_failures: u32,
    failure_threshold: u32,
}

/// Shared view of artifact and pipeline health
#[derive(Debug, Clone)]
pub struct HealthRegistry {
    inner: Arc<RwLock<Inner>>,
}

impl HealthRegistry {
    /// Registry seeded from the outcome of the startup artifact load
    pub fn for_artifact(state: &ArtifactState) -> Self {
        Self::with_threshold(state, DEFAULT_FAILURE_THRESHOLD)
    }

    pub fn with_threshold(state: &ArtifactState, failure_threshold: u32) -> Self {
        let artifact = match state {
            ArtifactState::Ready(a) => ComponentHealth::new(
                ComponentStatus::Healthy,
                Some(format!("{} model {}", a.kind(), a.fingerprint())),
            ),
            ArtifactState::Unavailable { reason } => {
                ComponentHealth::new(ComponentStatus::Degraded, Some(reason.clone()))
            }
        };

        Self {
            inner: Arc::new(RwLock::new(Inner {
                artifact,
                pipeline: ComponentHealth::new(ComponentStatus::Healthy, None),
                consecutive_failures: 0,
                failure_threshold: failure_threshold.max(1),
            })),
        }
    }

    /// A prediction produced a value; clears any failure streak
    pub async fn record_success(&self) {
        let mut inner = self.inner.write().await;
        if inner.consecutive_failures > 0 || inner.pipeline.status != ComponentStatus::Healthy {
            inner.consecutive_failures = 0;
            inner.pipeline = ComponentHealth::new(ComponentStatus::Healthy, None);
        }
    }

    /// The regression function failed on an encoded vector
    pub async fn record_inference_failure(&self, message: &str) {
        let mut inner = self.inner.write().await;
        inner.consecutive_failures += 1;
        let status = if inner.consecutive_failures >= inner.failure_threshold {
            ComponentStatus::Unhealthy
        } else {
            ComponentStatus::Degraded
        };
        let detail = format!(
            "{} consecutive inference failures, last: {}",
            inner.consecutive_failures, message
        );
        inner.pipeline = ComponentHealth::new(status, Some(detail));
    }

    pub async fn health(&self) -> HealthResponse {
        let inner = self.inner.read().await;
        let status = inner.artifact.status.worst(inner.pipeline.status);
        let components = BTreeMap::from([
            (components::MODEL_ARTIFACT.to_string(), inner.artifact.clone()),
            (components::PIPELINE.to_string(), inner.pipeline.clone()),
        ]);
        HealthResponse { status, components }
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        let inner = self.inner.read().await;

        let reason = if inner.artifact.status != ComponentStatus::Healthy {
            Some(match &inner.artifact.message {
                Some(detail) => format!("Model artifact not loaded: {}", detail),
                None => "Model artifact not loaded".to_string(),
            })
        } else if inner.pipeline.status == ComponentStatus::Unhealthy {
            Some("Inference pipeline unhealthy".to_string())
        } else {
            None
        };

        ReadinessResponse {
            ready: reason.is_none(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::ModelArtifact;
    use crate::testing::{linear_model, training_schema};

    fn ready_state() -> ArtifactState {
        ModelArtifact::from_parts(linear_model().into_regressor(), training_schema(), "abc")
            .unwrap()
            .into()
    }

    #[tokio::test]
    async fn test_loaded_artifact_is_healthy_and_ready() {
        let registry = HealthRegistry::for_artifact(&ready_state());

        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Healthy);
        let artifact = &health.components[components::MODEL_ARTIFACT];
        assert_eq!(artifact.message.as_deref(), Some("linear model abc"));
        assert!(registry.readiness().await.ready);
    }

    #[tokio::test]
    async fn test_missing_artifact_is_degraded_and_not_ready() {
        let state = ArtifactState::Unavailable {
            reason: "failed to read \"energy_model.json\"".to_string(),
        };
        let registry = HealthRegistry::for_artifact(&state);

        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Degraded);
        assert!(health.status.is_operational());

        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert!(readiness.reason.unwrap().contains("energy_model.json"));
    }

    #[tokio::test]
    async fn test_failure_streak_turns_unhealthy_then_recovers() {
        let registry = HealthRegistry::with_threshold(&ready_state(), 2);

        registry.record_inference_failure("non-finite output").await;
        assert_eq!(registry.health().await.status, ComponentStatus::Degraded);
        assert!(registry.readiness().await.ready);

        registry.record_inference_failure("non-finite output").await;
        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Unhealthy);
        assert!(health.components[components::PIPELINE]
            .message
            .as_deref()
            .unwrap()
            .starts_with("2 consecutive"));
        assert!(!registry.readiness().await.ready);

        registry.record_success().await;
        assert_eq!(registry.health().await.status, ComponentStatus::Healthy);
        assert!(registry.readiness().await.ready);
    }
}
