//! Model artifact loading
//!
//! The training step writes two files: the fitted regression function and
//! the ordered list of feature columns it was fitted on. Both are read once
//! at startup into a [`ModelArtifact`]. If either is missing or unusable the
//! service keeps running in degraded mode with [`ArtifactState::Unavailable`]
//! and every prediction fails until the process is restarted.

use crate::error::ArtifactError;
use crate::predictor::{OnnxRegressor, Regressor, SerializedModel};
use crate::schema::FeatureSchema;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

pub const DEFAULT_MODEL_FILE: &str = "energy_model.json";
pub const DEFAULT_SCHEMA_FILE: &str = "model_columns.json";

/// Where the persisted model and schema live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub schema: PathBuf,
    /// Expected SHA-256 of the model file, hex encoded
    pub checksum: Option<String>,
}

impl ArtifactPaths {
    pub fn new(model: impl Into<PathBuf>, schema: impl Into<PathBuf>) -> Self {
        Self {
            model: model.into(),
            schema: schema.into(),
            checksum: None,
        }
    }

    /// Default file names inside `dir`
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(DEFAULT_MODEL_FILE), dir.join(DEFAULT_SCHEMA_FILE))
    }

    pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.checksum = Some(checksum.into());
        self
    }
}

/// A regression function bound to the schema it was trained with
pub struct ModelArtifact {
    regressor: Box<dyn Regressor>,
    schema: FeatureSchema,
    fingerprint: String,
    loaded_at: i64,
}

impl ModelArtifact {
    /// Bind a regressor to a schema, checking their widths agree
    pub fn from_parts(
        regressor: Box<dyn Regressor>,
        schema: FeatureSchema,
        fingerprint: impl Into<String>,
    ) -> Result<Self, ArtifactError> {
        if regressor.n_features() != schema.len() {
            return Err(ArtifactError::Binding {
                model_features: regressor.n_features(),
                schema_columns: schema.len(),
            });
        }
        Ok(Self {
            regressor,
            schema,
            fingerprint: fingerprint.into(),
            loaded_at: chrono::Utc::now().timestamp(),
        })
    }

    /// Read the schema and model from disk
    pub fn load(paths: &ArtifactPaths) -> Result<Self, ArtifactError> {
        let schema = FeatureSchema::from_json_file(&paths.schema)?;

        let bytes = std::fs::read(&paths.model).map_err(|source| ArtifactError::Io {
            path: paths.model.clone(),
            source,
        })?;
        let fingerprint = compute_checksum(&bytes);
        if let Some(expected) = &paths.checksum {
            if !expected.eq_ignore_ascii_case(&fingerprint) {
                return Err(ArtifactError::ChecksumMismatch {
                    expected: expected.clone(),
                    actual: fingerprint,
                });
            }
        }

        let regressor = decode_model(&paths.model, &bytes, schema.len())?;
        Self::from_parts(regressor, schema, fingerprint)
    }

    pub fn regressor(&self) -> &dyn Regressor {
        self.regressor.as_ref()
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// SHA-256 of the model file, hex encoded
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn kind(&self) -> &'static str {
        self.regressor.kind()
    }

    pub fn loaded_at(&self) -> i64 {
        self.loaded_at
    }
}

impl fmt::Debug for ModelArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelArtifact")
            .field("kind", &self.kind())
            .field("schema", &self.schema.to_string())
            .field("fingerprint", &self.fingerprint)
            .field("loaded_at", &self.loaded_at)
            .finish()
    }
}

fn decode_model(
    path: &Path,
    bytes: &[u8],
    n_features: usize,
) -> Result<Box<dyn Regressor>, ArtifactError> {
    let parse_error = |message: String| ArtifactError::Parse {
        path: path.to_path_buf(),
        message,
    };

    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => {
            let model: SerializedModel =
                serde_json::from_slice(bytes).map_err(|e| parse_error(e.to_string()))?;
            model.validate().map_err(parse_error)?;
            Ok(model.into_regressor())
        }
        Some("onnx") => {
            let model = OnnxRegressor::from_bytes(bytes, n_features)
                .map_err(|e| parse_error(format!("{:#}", e)))?;
            Ok(Box::new(model))
        }
        _ => Err(ArtifactError::UnsupportedFormat(path.to_path_buf())),
    }
}

fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Outcome of the one-time load, shared read-only for the process lifetime
#[derive(Debug, Clone)]
pub enum ArtifactState {
    Ready(Arc<ModelArtifact>),
    Unavailable { reason: String },
}

impl ArtifactState {
    /// Load the artifact, degrading instead of failing
    pub fn load(paths: &ArtifactPaths) -> Self {
        match ModelArtifact::load(paths) {
            Ok(artifact) => {
                info!(
                    model = %paths.model.display(),
                    schema = %artifact.schema(),
                    kind = artifact.kind(),
                    fingerprint = %artifact.fingerprint(),
                    "Model artifact loaded"
                );
                ArtifactState::Ready(Arc::new(artifact))
            }
            Err(e) => {
                warn!(
                    model = %paths.model.display(),
                    schema = %paths.schema.display(),
                    error = %e,
                    "Model artifact unavailable, predictions disabled"
                );
                ArtifactState::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }

    pub fn artifact(&self) -> Option<&Arc<ModelArtifact>> {
        match self {
            ArtifactState::Ready(artifact) => Some(artifact),
            ArtifactState::Unavailable { .. } => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ArtifactState::Ready(_))
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            ArtifactState::Ready(_) => None,
            ArtifactState::Unavailable { reason } => Some(reason),
        }
    }
}

impl From<ModelArtifact> for ArtifactState {
    fn from(artifact: ModelArtifact) -> Self {
        ArtifactState::Ready(Arc::new(artifact))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{forest_model, linear_model, training_schema, write_artifacts};

    #[test]
    fn test_load_json_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_artifacts(dir.path(), &forest_model());

        let artifact = ModelArtifact::load(&paths).unwrap();
        assert_eq!(artifact.kind(), "forest");
        assert_eq!(artifact.schema(), &training_schema());
        assert_eq!(artifact.fingerprint().len(), 64);
    }

    #[test]
    fn test_missing_model_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_artifacts(dir.path(), &linear_model());
        std::fs::remove_file(&paths.model).unwrap();

        let state = ArtifactState::load(&paths);
        assert!(!state.is_ready());
        assert!(state.artifact().is_none());
        assert!(state.reason().unwrap().contains("failed to read"));
    }

    #[test]
    fn test_corrupt_schema_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_artifacts(dir.path(), &linear_model());
        std::fs::write(&paths.schema, b"not json").unwrap();

        assert!(matches!(
            ModelArtifact::load(&paths).unwrap_err(),
            ArtifactError::Parse { .. }
        ));
        assert!(!ArtifactState::load(&paths).is_ready());
    }

    #[test]
    fn test_width_mismatch_is_a_binding_error() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_artifacts(dir.path(), &linear_model());
        std::fs::write(&paths.schema, br#"["Hour", "Temperature"]"#).unwrap();

        assert!(matches!(
            ModelArtifact::load(&paths).unwrap_err(),
            ArtifactError::Binding {
                model_features: 5,
                schema_columns: 2
            }
        ));
    }

    #[test]
    fn test_checksum_is_verified() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_artifacts(dir.path(), &linear_model());
        let fingerprint = ModelArtifact::load(&paths).unwrap().fingerprint().to_string();

        let good = paths.clone().with_checksum(fingerprint.to_uppercase());
        assert!(ModelArtifact::load(&good).is_ok());

        let bad = paths.with_checksum("00".repeat(32));
        assert!(matches!(
            ModelArtifact::load(&bad).unwrap_err(),
            ArtifactError::ChecksumMismatch { .. }
        ));
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let written = write_artifacts(dir.path(), &linear_model());
        let pickle = dir.path().join("energy_model.pkl");
        std::fs::copy(&written.model, &pickle).unwrap();

        let paths = ArtifactPaths::new(pickle, written.schema);
        assert!(matches!(
            ModelArtifact::load(&paths).unwrap_err(),
            ArtifactError::UnsupportedFormat(_)
        ));
    }

    #[test]
    fn test_invalid_forest_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_artifacts(dir.path(), &linear_model());
        std::fs::write(
            &paths.model,
            br#"{"kind": "forest", "n_features": 5, "trees": []}"#,
        )
        .unwrap();

        assert!(matches!(
            ModelArtifact::load(&paths).unwrap_err(),
            ArtifactError::Parse { .. }
        ));
    }
}
