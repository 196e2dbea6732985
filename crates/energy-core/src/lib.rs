//! Energy cost prediction library
//!
//! This crate provides the core functionality for:
//! - Feature schema parsing and observation encoding
//! - Model artifact loading with degraded-mode fallback
//! - Regression inference (JSON linear/forest models, ONNX via tract)
//! - Billing with an explicit rounding rule
//! - Health checks and observability

pub mod artifact;
pub mod billing;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod pipeline;
pub mod predictor;
pub mod schema;

#[cfg(test)]
pub(crate) mod testing;

pub use artifact::{ArtifactPaths, ArtifactState, ModelArtifact};
pub use billing::{BillingCalculator, RoundingMode};
pub use error::{ArtifactError, ConfigError, EncodingError, InferenceError, PipelineError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{ServiceMetrics, StructuredLogger};
pub use pipeline::InferencePipeline;
pub use schema::FeatureSchema;
