use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode, Uri};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::bail_api;
use crate::error::ApiResult;
use crate::inference::service::PredictionService;
use crate::inference::task::predict::{PredictHandler, PredictionRequest, PredictionResult};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PredictionService>,
}

impl AppState {
    pub fn new(service: PredictionService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

#[derive(Serialize, Debug)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model: String,
    pub version: String,
    pub kind: &'static str,
    pub probability: bool,
}

/// Allows a single origin with credentials. Methods and headers are mirrored
/// from the preflight since wildcards cannot be combined with credentials.
pub fn cors_layer(origin: &str) -> Result<CorsLayer> {
    let origin = HeaderValue::from_str(origin)
        .with_context(|| format!("Invalid CORS origin {origin}"))?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true))
}

pub fn create_router(state: AppState, cors_origin: &str) -> Result<Router> {
    Ok(Router::new()
        .route("/api/predict", post(handle_predict_request))
        .route("/health", get(handle_health_request))
        .fallback(handle_not_found)
        .layer(cors_layer(cors_origin)?)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

#[axum_macros::debug_handler]
async fn handle_predict_request(
    State(state): State<AppState>,
    Json(req): Json<PredictionRequest>,
) -> ApiResult<(StatusCode, Json<PredictionResult>)> {
    Ok((StatusCode::OK, Json(state.service.predict(&req.text)?)))
}

#[axum_macros::debug_handler]
async fn handle_health_request(State(state): State<AppState>) -> Json<HealthResponse> {
    let base = state.service.base();
    let model = state.service.model();
    Json(HealthResponse {
        status: "ok",
        model: base.name.clone(),
        version: base.version.clone(),
        kind: model.kind(),
        probability: model.has_probability(),
    })
}

async fn handle_not_found(uri: Uri) -> ApiResult<()> {
    bail_api!(StatusCode::NOT_FOUND, "No route for {}", uri)
}
