//! REST API over the prediction service.
//!
//! - POST /api/predict        - Predict temperature from `weather_data`
//! - POST /api/model/retrain  - Refit the model
//! - GET  /api/model/status   - Report model state
//! - GET  /api/health         - Liveness check

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tempcast_core::{
    Config, DEFAULT_HOURS_AHEAD, HealthStatus, ModelStatus, PredictionResult, PredictionService,
    WeatherObservation,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

type SharedService = Arc<PredictionService>;

/// Request body for /api/predict
#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    #[serde(default)]
    pub weather_data: Option<WeatherObservation>,
    #[serde(default)]
    pub hours_ahead: Option<f64>,
}

/// Response body for /api/model/retrain
#[derive(Debug, Serialize)]
pub struct RetrainResponse {
    pub message: String,
    pub train_score: f64,
    pub test_score: f64,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Failure reported to the client as `{"error": ...}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, message: message.into() }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self { status: StatusCode::INTERNAL_SERVER_ERROR, message: message.into() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

/// Create the REST API router
pub fn create_router(service: SharedService) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/api/predict", post(handle_predict))
        .route("/api/model/retrain", post(handle_retrain))
        .route("/api/model/status", get(handle_status))
        .route("/api/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(service)
}

/// Run the REST API server, training first when configured to.
pub async fn run_server(config: Config) -> anyhow::Result<()> {
    let service = Arc::new(PredictionService::from_config(&config));

    if config.train_on_startup {
        let startup = Arc::clone(&service);
        // A failed startup fit is retried lazily by the first prediction.
        if let Err(err) = tokio::task::spawn_blocking(move || startup.train()).await? {
            tracing::warn!(error = %err, "Startup training failed");
        }
    }

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!("Weather prediction service listening on http://{address}");

    axum::serve(listener, create_router(service)).await?;

    Ok(())
}

/// Handle POST /api/predict requests
async fn handle_predict(
    State(service): State<SharedService>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictionResult>, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let observation = request
        .weather_data
        .ok_or_else(|| ApiError::bad_request("weather_data is required"))?;
    let hours_ahead = request.hours_ahead.unwrap_or(DEFAULT_HOURS_AHEAD);

    let result = tokio::task::spawn_blocking(move || service.predict(&observation, hours_ahead))
        .await
        .map_err(|err| ApiError::internal(err.to_string()))?;

    result.map(Json).map_err(|err| {
        tracing::error!(error = %err, "Prediction request failed");
        ApiError::internal("Failed to generate prediction")
    })
}

/// Handle POST /api/model/retrain requests
async fn handle_retrain(
    State(service): State<SharedService>,
) -> Result<Json<RetrainResponse>, ApiError> {
    let result = tokio::task::spawn_blocking(move || service.train())
        .await
        .map_err(|err| ApiError::internal(err.to_string()))?;

    match result {
        Ok(report) => Ok(Json(RetrainResponse {
            message: "Model retrained successfully".to_string(),
            train_score: report.train_score,
            test_score: report.test_score,
        })),
        Err(err) => {
            tracing::error!(error = %err, "Retrain request failed");
            Err(ApiError::internal("Failed to retrain model"))
        }
    }
}

/// Handle GET /api/model/status requests
async fn handle_status(State(service): State<SharedService>) -> Json<ModelStatus> {
    Json(service.status())
}

/// Handle GET /api/health requests
async fn handle_health(State(service): State<SharedService>) -> Json<HealthStatus> {
    Json(service.health())
}
