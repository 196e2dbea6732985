//! Error taxonomy for the inference pipeline
//!
//! Every failure is recoverable at the request boundary. Only
//! [`ArtifactError`] outlives a single request: it is captured once at
//! startup and turns the service into degraded mode.

use std::path::PathBuf;
use thiserror::Error;

/// Raised while turning a raw observation into an encoded vector
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodingError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` is not numeric: {value}")]
    NonNumeric { field: &'static str, value: String },

    #[error("unseen category `{category}` for field `{field}`")]
    UnseenCategory { field: &'static str, category: String },
}

/// Raised while applying the regression function
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InferenceError {
    #[error("encoded vector has {actual} values, schema expects {expected}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("column {index} is `{actual}`, schema expects `{expected}`")]
    ColumnOrder {
        index: usize,
        expected: String,
        actual: String,
    },

    #[error("model returned a non-finite value: {0}")]
    NonFinite(f64),

    #[error("model execution failed: {0}")]
    Backend(String),
}

/// Raised while acquiring the persisted model and schema
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path:?}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid feature schema: {0}")]
    Schema(String),

    #[error("unsupported model format for {0:?} (expected .json or .onnx)")]
    UnsupportedFormat(PathBuf),

    #[error("model checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("model expects {model_features} features but schema has {schema_columns} columns")]
    Binding {
        model_features: usize,
        schema_columns: usize,
    },
}

/// Failure of a full estimate request, as surfaced to callers
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error("model artifact unavailable: {0}")]
    ArtifactUnavailable(String),

    #[error("invalid observation: {0}")]
    Encoding(#[from] EncodingError),

    #[error("inference failed: {0}")]
    Inference(#[from] InferenceError),
}

impl PipelineError {
    /// Short machine-readable label used for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::ArtifactUnavailable(_) => "artifact_unavailable",
            PipelineError::Encoding(_) => "encoding",
            PipelineError::Inference(_) => "inference",
        }
    }
}

/// Raised when process-wide settings are out of range
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("rate per kWh must be finite and non-negative, got {0}")]
    InvalidRate(f64),
}
