//! API routes for formulad

use crate::orchestrator::ResolveError;
use crate::server::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use formula_shared::{
    ErrorBody, FormulaRequest, FormulaResponse, GenerateFormulaBody, HealthResponse,
};
use std::sync::Arc;
use tracing::{error, info, info_span, Instrument};

type AppStateArc = Arc<AppState>;

// ============================================================================
// Formula Routes
// ============================================================================

pub fn formula_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/generate-formula", post(generate_formula))
        .route("/api/generate-formula", post(generate_formula))
}

/// Error side of the formula endpoint.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal(String),
}

impl From<ResolveError> for ApiError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::InvalidInput(reason) => ApiError::BadRequest(reason),
            ResolveError::Internal(reason) => ApiError::Internal(reason),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(reason) => {
                (StatusCode::BAD_REQUEST, Json(ErrorBody::new(reason))).into_response()
            }
            ApiError::Internal(reason) => {
                error!("Formula generation failed: {}", reason);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorBody::new("Internal server error")),
                )
                    .into_response()
            }
        }
    }
}

async fn generate_formula(
    State(state): State<AppStateArc>,
    body: Result<Json<GenerateFormulaBody>, JsonRejection>,
) -> Result<Json<FormulaResponse>, ApiError> {
    let request_id = uuid::Uuid::new_v4();
    let span = info_span!("generate_formula", %request_id);

    async move {
        let Json(body) = body.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
        let request = FormulaRequest::from(body);

        let result = state.resolver.resolve_formula(&request).await?;
        info!("Answered from {}: {}", result.source, result.formula);

        Ok(Json(FormulaResponse::new(&request, result)))
    }
    .instrument(span)
    .await
}

// ============================================================================
// Health Routes
// ============================================================================

pub fn health_routes() -> Router<AppStateArc> {
    Router::new().route("/health", get(health_check))
}

async fn health_check(State(state): State<AppStateArc>) -> Result<Json<HealthResponse>, ApiError> {
    let cache_size = state
        .resolver
        .cache()
        .len()
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        cache_size,
    }))
}
