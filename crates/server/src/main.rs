//! Energy Server - energy consumption and cost prediction service
//!
//! Loads the trained model and its feature schema once at startup and
//! serves predictions over HTTP. A missing or broken artifact does not
//! stop the server: it keeps answering status queries in degraded mode.

use energy_core::{
    health::HealthRegistry,
    observability::{ServiceMetrics, StructuredLogger},
    predictor::FeatureEncoder,
    ArtifactState, InferencePipeline,
};
use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting energy-server");

    let config = config::ServerConfig::load()?;
    info!(
        model = %config.model_path.display(),
        schema = %config.schema_path.display(),
        rate_per_kwh = config.rate_per_kwh,
        rounding = ?config.rounding,
        unseen_category = ?config.unseen_category,
        "Server configured"
    );

    let logger = StructuredLogger::new("energy-server");
    let metrics = ServiceMetrics::new();
    metrics.set_rate(config.rate_per_kwh);

    // One-time artifact load; failure degrades instead of exiting
    let artifact = ArtifactState::load(&config.artifact_paths());
    match &artifact {
        ArtifactState::Ready(a) => metrics.set_model(a.kind(), a.fingerprint()),
        ArtifactState::Unavailable { reason } => {
            metrics.set_model_unavailable();
            logger.log_artifact_unavailable(reason);
        }
    }
    let health_registry = HealthRegistry::for_artifact(&artifact);
    let model_kind = artifact.artifact().map(|a| a.kind());

    let pipeline = InferencePipeline::new(
        artifact,
        FeatureEncoder::with_policy(config.unseen_category),
        config.billing()?,
    );
    logger.log_startup(SERVER_VERSION, pipeline.rate(), model_kind);

    let app_state = Arc::new(api::AppState::new(
        pipeline,
        health_registry,
        metrics,
        logger.clone(),
    ));

    api::serve(config.api_port, app_state).await?;
    logger.log_shutdown("SIGINT received");
    info!("Shutting down");

    Ok(())
}
