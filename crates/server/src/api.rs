//! HTTP API for predictions, health checks and Prometheus metrics

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use energy_core::{
    health::{ComponentStatus, HealthRegistry},
    observability::{ServiceMetrics, StructuredLogger},
    InferencePipeline, PipelineError, RawObservation,
};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Shared application state
pub struct AppState {
    pub pipeline: InferencePipeline,
    pub health_registry: HealthRegistry,
    pub metrics: ServiceMetrics,
    pub logger: StructuredLogger,
}

impl AppState {
    pub fn new(
        pipeline: InferencePipeline,
        health_registry: HealthRegistry,
        metrics: ServiceMetrics,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            pipeline,
            health_registry,
            metrics,
            logger,
        }
    }
}

#[derive(Debug, Serialize)]
struct PredictResponse {
    status: &'static str,
    predicted_energy_kwh: f64,
    estimated_bill: f64,
    rate_used: f64,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: &'static str,
    message: String,
}

fn error_response(status_code: StatusCode, message: String) -> axum::response::Response {
    (
        status_code,
        Json(ErrorResponse {
            status: "error",
            message,
        }),
    )
        .into_response()
}

fn status_code_for(err: &PipelineError) -> StatusCode {
    match err {
        PipelineError::ArtifactUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        PipelineError::Encoding(_) => StatusCode::BAD_REQUEST,
        PipelineError::Inference(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Predict energy use and cost for one observation
async fn predict(
    State(state): State<Arc<AppState>>,
    body: Result<Json<RawObservation>, JsonRejection>,
) -> axum::response::Response {
    let Json(observation) = match body {
        Ok(body) => body,
        Err(rejection) => {
            state.metrics.inc_prediction_errors("request");
            return error_response(StatusCode::BAD_REQUEST, rejection.body_text());
        }
    };

    let start = Instant::now();
    let outcome = state.pipeline.estimate(&observation);
    let elapsed = start.elapsed();
    state.metrics.observe_prediction_latency(elapsed.as_secs_f64());

    match outcome {
        Ok(result) => {
            state.metrics.inc_predictions();
            state.health_registry.record_success().await;
            state.logger.log_prediction(&result, elapsed.as_micros());
            (
                StatusCode::OK,
                Json(PredictResponse {
                    status: "success",
                    predicted_energy_kwh: result.predicted_kwh,
                    estimated_bill: result.estimated_bill,
                    rate_used: result.rate_used,
                }),
            )
                .into_response()
        }
        Err(err) => {
            state.metrics.inc_prediction_errors(err.kind());
            if let PipelineError::Inference(cause) = &err {
                state
                    .health_registry
                    .record_inference_failure(&cause.to_string())
                    .await;
            }
            state.logger.log_prediction_failure(&err);
            error_response(status_code_for(&err), err.to_string())
        }
    }
}

/// Status query: always 200 with the configured rate, even when degraded
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.pipeline.status())
}

/// Component health - returns 200 if healthy or degraded, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still serving status queries
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check - returns 200 only when a model artifact is loaded
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            e.to_string().into_bytes(),
        );
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/predict", post(predict))
        .route("/api/predict", post(predict))
        .route("/health", get(health))
        .route("/api/health", get(health))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    wait_for_shutdown(tokio::signal::ctrl_c()).await;
}

/// Resolve when `signal` fires; if the handler could not be installed, never
async fn wait_for_shutdown<F>(signal: F)
where
    F: std::future::Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        error!(error = %e, "Failed to install shutdown signal handler");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use energy_core::{
        health::DEFAULT_FAILURE_THRESHOLD, predictor::FeatureEncoder, ArtifactPaths,
        ArtifactState, BillingCalculator, RoundingMode,
    };
    use std::time::Duration;
    use tower::ServiceExt;

    const COLUMNS: &str = r#"["Hour", "Temperature", "Machine_Status_Off", "Machine_Status_Idle", "Machine_Status_Running"]"#;
    const LINEAR_MODEL: &str =
        r#"{"kind": "linear", "intercept": 50.0, "coefficients": [0.0, 3.0, 0.0, 30.0, 150.0]}"#;
    /// Overflows to infinity for any large temperature
    const OVERFLOWING_MODEL: &str =
        r#"{"kind": "linear", "intercept": 0.0, "coefficients": [0.0, 1e308, 0.0, 0.0, 0.0]}"#;

    async fn setup_app(with_model: bool) -> (Router, tempfile::TempDir) {
        let model = with_model.then_some(LINEAR_MODEL);
        build_app(model, DEFAULT_FAILURE_THRESHOLD)
    }

    fn build_app(model: Option<&str>, failure_threshold: u32) -> (Router, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths::in_dir(dir.path());
        if let Some(model) = model {
            std::fs::write(&paths.model, model).unwrap();
            std::fs::write(&paths.schema, COLUMNS).unwrap();
        }

        let artifact = ArtifactState::load(&paths);
        let health_registry = HealthRegistry::with_threshold(&artifact, failure_threshold);
        let pipeline = InferencePipeline::new(
            artifact,
            FeatureEncoder::new(),
            BillingCalculator::new(11.4295, RoundingMode::HalfUp).unwrap(),
        );
        let state = Arc::new(AppState::new(
            pipeline,
            health_registry,
            ServiceMetrics::new(),
            StructuredLogger::new("energy-test"),
        ));
        (create_router(state), dir)
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_predict_success() {
        let (app, _dir) = setup_app(true).await;

        let response = app
            .oneshot(post_json(
                "/predict",
                r#"{"Hour": 12, "Temperature": 23.5, "Machine_Status": "Idle"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["status"], "success");
        // 50 + 3 * 23.5 + 30
        assert_eq!(body["predicted_energy_kwh"], 150.5);
        // 150.5 * 11.4295 = 1720.13975
        assert_eq!(body["estimated_bill"], 1720.14);
        assert_eq!(body["rate_used"], 11.4295);
    }

    #[tokio::test]
    async fn test_predict_unseen_status_is_not_an_error() {
        let (app, _dir) = setup_app(true).await;

        let response = app
            .oneshot(post_json(
                "/api/predict",
                r#"{"Hour": 3, "Temperature": 20, "Machine_Status": "Broken"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["predicted_energy_kwh"], 110.0);
    }

    #[tokio::test]
    async fn test_predict_missing_field_is_bad_request() {
        let (app, _dir) = setup_app(true).await;

        let response = app
            .oneshot(post_json("/predict", r#"{"Hour": 3, "Machine_Status": "Off"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = json_body(response).await;
        assert_eq!(body["status"], "error");
        assert!(body["message"].as_str().unwrap().contains("Temperature"));
    }

    #[tokio::test]
    async fn test_predict_malformed_json_is_bad_request() {
        let (app, _dir) = setup_app(true).await;

        let response = app.oneshot(post_json("/predict", "{not json")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["status"], "error");
    }

    #[tokio::test]
    async fn test_degraded_mode_predict_fails_health_answers() {
        let (app, _dir) = setup_app(false).await;

        let response = app
            .clone()
            .oneshot(post_json(
                "/predict",
                r#"{"Hour": 12, "Temperature": 23.5, "Machine_Status": "Idle"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json_body(response).await["status"], "error");

        let response = app.clone().oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["rate"], 11.4295);
        assert_eq!(body["model_loaded"], false);

        let response = app.clone().oneshot(get("/healthz")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "degraded");

        let response = app.oneshot(get("/readyz")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json_body(response).await["ready"], false);
    }

    #[tokio::test]
    async fn test_health_when_loaded() {
        let (app, _dir) = setup_app(true).await;

        let response = app.clone().oneshot(get("/api/health")).await.unwrap();
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["model_kind"], "linear");

        let response = app.oneshot(get("/readyz")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let (app, _dir) = setup_app(true).await;
        let _ = app
            .clone()
            .oneshot(post_json(
                "/predict",
                r#"{"Hour": 1, "Temperature": 18, "Machine_Status": "Off"}"#,
            ))
            .await
            .unwrap();

        let response = app.oneshot(get("/metrics")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8_lossy(&body);
        assert!(text.contains("energy_predictions_total"));
    }

    #[tokio::test]
    async fn test_inference_failures_return_500_and_mark_unhealthy() {
        let (app, _dir) = build_app(Some(OVERFLOWING_MODEL), 2);
        let body = r#"{"Hour": 12, "Temperature": 1e10, "Machine_Status": "Idle"}"#;

        let response = app.clone().oneshot(post_json("/predict", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let error = json_body(response).await;
        assert_eq!(error["status"], "error");
        assert!(error["message"]
            .as_str()
            .unwrap()
            .starts_with("inference failed"));

        // One failure: degraded but still live and ready
        let response = app.clone().oneshot(get("/healthz")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "degraded");
        let response = app.clone().oneshot(get("/readyz")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.clone().oneshot(post_json("/predict", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = app.clone().oneshot(get("/healthz")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let health = json_body(response).await;
        assert_eq!(health["status"], "unhealthy");
        assert_eq!(health["components"]["pipeline"]["status"], "unhealthy");

        let response = app.clone().oneshot(get("/readyz")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json_body(response).await["ready"], false);

        // A finite prediction clears the streak
        let response = app
            .clone()
            .oneshot(post_json(
                "/predict",
                r#"{"Hour": 12, "Temperature": 0, "Machine_Status": "Idle"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let response = app.oneshot(get("/readyz")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_shutdown_waits_when_signal_handler_fails() {
        let failed = async { Err::<(), _>(std::io::Error::other("no signal driver")) };
        let outcome =
            tokio::time::timeout(Duration::from_millis(50), wait_for_shutdown(failed)).await;
        assert!(outcome.is_err(), "shutdown must not fire on install failure");

        let fired = async { Ok::<(), std::io::Error>(()) };
        let outcome =
            tokio::time::timeout(Duration::from_millis(50), wait_for_shutdown(fired)).await;
        assert!(outcome.is_ok());
    }
}
