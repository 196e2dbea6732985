//! Server configuration

use anyhow::Result;
use energy_core::{
    predictor::UnseenCategoryPolicy, ArtifactPaths, BillingCalculator, RoundingMode,
};
use serde::Deserialize;
use std::path::PathBuf;

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Port for prediction, health and metrics endpoints
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Persisted regression function (.json or .onnx)
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    /// Persisted feature columns, a JSON array of names
    #[serde(default = "default_schema_path")]
    pub schema_path: PathBuf,

    /// Expected SHA-256 of the model file
    #[serde(default)]
    pub model_sha256: Option<String>,

    /// Billing rate per kWh
    #[serde(default = "default_rate_per_kwh")]
    pub rate_per_kwh: f64,

    #[serde(default)]
    pub rounding: RoundingMode,

    #[serde(default)]
    pub unseen_category: UnseenCategoryPolicy,
}

fn default_api_port() -> u16 {
    8080
}

fn default_model_path() -> PathBuf {
    PathBuf::from(energy_core::artifact::DEFAULT_MODEL_FILE)
}

fn default_schema_path() -> PathBuf {
    PathBuf::from(energy_core::artifact::DEFAULT_SCHEMA_FILE)
}

fn default_rate_per_kwh() -> f64 {
    11.4295
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            model_path: default_model_path(),
            schema_path: default_schema_path(),
            model_sha256: None,
            rate_per_kwh: default_rate_per_kwh(),
            rounding: RoundingMode::default(),
            unseen_category: UnseenCategoryPolicy::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from an optional `energy.toml` and `ENERGY_*` variables
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("energy").required(false))
            .add_source(config::Environment::with_prefix("ENERGY"))
            .build()?;

        let loaded: Self = config.try_deserialize()?;
        loaded.billing()?;
        Ok(loaded)
    }

    pub fn artifact_paths(&self) -> ArtifactPaths {
        let paths = ArtifactPaths::new(&self.model_path, &self.schema_path);
        match &self.model_sha256 {
            Some(checksum) => paths.with_checksum(checksum),
            None => paths,
        }
    }

    pub fn billing(&self) -> Result<BillingCalculator> {
        Ok(BillingCalculator::new(self.rate_per_kwh, self.rounding)?)
    }
}
