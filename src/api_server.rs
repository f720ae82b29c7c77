// Axum server: HTML form + JSON prediction API
//
// Routes:
//   GET  /                 form page
//   POST /predict          form submission → result page
//   POST /predict/csv      CSV URL submission → result page
//   GET  /health           liveness + model status
//   GET  /api/model        loaded model metadata
//   POST /api/predict      raw features (numbers or text) → prediction
//   POST /api/predict/csv  {"url": ".../file.csv"} → prediction

use axum::{
    extract::{
        rejection::{FormRejection, JsonRejection},
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::data::CsvSource;
use crate::error::PredictorError;
use crate::features::{raw_features_from_json, Feature, RawFeatures};
use crate::model::{global_loader, LoadedModel};
use crate::predictor::{Predictor, CONFIDENCE};
use crate::web::handlers::pages;

// ============================================================================
// Application State
// ============================================================================

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    /// `None` when no artifact could be loaded; predictions are refused
    pub model: Option<Arc<LoadedModel>>,
    pub csv_source: Arc<CsvSource>,
}

impl AppState {
    /// Build state with the process-wide cached model
    pub fn new(config: AppConfig) -> Self {
        tracing::info!("Loading regression model...");
        let model = global_loader(|| config.model_candidates()).load();
        match &model {
            Some(m) => tracing::info!("Model ready: {} from {:?}", m.type_name(), m.source()),
            None => tracing::warn!("Model unavailable; prediction requests will be refused"),
        }

        let csv_source = CsvSource::new(config.csv_fetch_timeout);
        Self::with_parts(config, model, csv_source)
    }

    pub fn with_parts(
        config: AppConfig,
        model: Option<Arc<LoadedModel>>,
        csv_source: CsvSource,
    ) -> Self {
        Self {
            config: Arc::new(config),
            model,
            csv_source: Arc::new(csv_source),
        }
    }

    pub fn predictor(&self) -> Result<Predictor, PredictorError> {
        self.model
            .clone()
            .map(Predictor::new)
            .ok_or(PredictorError::ModelUnavailable)
    }

    /// Fetch a remote CSV on the blocking pool and return its first row
    pub async fn fetch_csv_features(&self, url: String) -> Result<RawFeatures, AppError> {
        let source = Arc::clone(&self.csv_source);
        tokio::task::spawn_blocking(move || source.features_from_url(&url))
            .await
            .map_err(|e| AppError::Internal(format!("CSV task failed: {}", e)))?
            .map_err(AppError::from)
    }
}

// ============================================================================
// Router
// ============================================================================

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // HTML form
        .route("/", get(pages::home_page))
        .route("/predict", post(pages::predict_page))
        .route("/predict/csv", post(pages::predict_csv_page))

        // JSON API
        .route("/health", get(health_check))
        .route("/api/model", get(model_info))
        .route("/api/predict", post(predict_json))
        .route("/api/predict/csv", post(predict_csv))

        // Middleware (outermost first)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(CompressionLayer::new()),
        )
        .with_state(state)
}

// ============================================================================
// Endpoint Handlers
// ============================================================================

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "model_loaded": state.model.is_some(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn model_info(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let model = state.model.as_ref().ok_or(PredictorError::ModelUnavailable)?;
    let features: Vec<&str> = Feature::ALL.iter().map(|f| f.name()).collect();

    Ok(Json(serde_json::json!({
        "type": model.type_name(),
        "source": model.source().display().to_string(),
        "format": model.format().to_string(),
        "confidence": CONFIDENCE,
        "features": features,
    })))
}

async fn predict_json(
    State(state): State<AppState>,
    payload: Result<Json<serde_json::Map<String, serde_json::Value>>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Json(body) = payload?;
    let predictor = state.predictor()?;
    let raw = raw_features_from_json(&body)?;
    let (record, prediction) = predictor.predict_raw(&raw)?;

    Ok(Json(serde_json::json!({
        "prediction": prediction,
        "features": record,
    })))
}

#[derive(Debug, Deserialize)]
pub struct CsvRequest {
    pub url: String,
}

async fn predict_csv(
    State(state): State<AppState>,
    payload: Result<Json<CsvRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Json(request) = payload?;
    let predictor = state.predictor()?;
    let raw = state.fetch_csv_features(request.url.clone()).await?;
    let (record, prediction) = predictor.predict_raw(&raw)?;

    Ok(Json(serde_json::json!({
        "source": request.url,
        "prediction": prediction,
        "features": record,
    })))
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
pub enum AppError {
    Predictor(PredictorError),
    /// Body could not be extracted (bad JSON, wrong content type, bad form field)
    Rejected { status: StatusCode, message: String },
    Internal(String),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<FormRejection> for AppError {
    fn from(rejection: FormRejection) -> Self {
        AppError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<PredictorError> for AppError {
    fn from(err: PredictorError) -> Self {
        AppError::Predictor(err)
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Predictor(err) => status_for(err),
            AppError::Rejected { status, .. } => *status,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> String {
        match self {
            AppError::Predictor(err) => err.to_string(),
            AppError::Rejected { message, .. } => message.clone(),
            AppError::Internal(msg) => msg.clone(),
        }
    }
}

/// HTTP status for a library error
pub fn status_for(err: &PredictorError) -> StatusCode {
    match err {
        PredictorError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
        PredictorError::MissingField { .. }
        | PredictorError::InvalidNumber { .. }
        | PredictorError::OutOfRange { .. }
        | PredictorError::InvalidChoice { .. }
        | PredictorError::ColumnNotFound { .. }
        | PredictorError::EmptyCsv
        | PredictorError::CsvParse(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PredictorError::Network(_)
        | PredictorError::HttpStatus { .. }
        | PredictorError::ContentType(_) => StatusCode::BAD_GATEWAY,
        PredictorError::ModelUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        PredictorError::Prediction(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let message = self.message();
        match &self {
            AppError::Predictor(err) if err.is_input_error() => {
                tracing::warn!("Rejected request ({}): {}", status, message)
            }
            AppError::Rejected { .. } => {
                tracing::warn!("Rejected request ({}): {}", status, message)
            }
            _ => tracing::error!("Request failed ({}): {}", status, message),
        }

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
