//! HTTP endpoint handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use tracing::{error, info, warn};

use super::response::{self, ErrorBody};
use super::AppState;
use crate::pipeline::PipelineError;

/// Extraction request body.
#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    /// URL to an image of a bill.
    #[serde(default)]
    pub document: Option<String>,
    /// Claimed bill total; enables reconciliation when present.
    #[serde(default)]
    pub claimed_total: Option<f64>,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<ErrorBody>) {
    (status, Json(response::error(message)))
}

fn status_for(err: &PipelineError) -> StatusCode {
    match err {
        PipelineError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        PipelineError::Acquisition(_)
        | PipelineError::NoLineItems
        | PipelineError::QualityBelowThreshold { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        PipelineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Main extraction endpoint: POST /extract-bill-data.
pub async fn extract_bill_data(
    State(state): State<AppState>,
    body: Result<Json<ExtractRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Ok(Json(request)) = body else {
        warn!("request body is not valid JSON");
        return error_response(
            StatusCode::BAD_REQUEST,
            "request body must be valid JSON",
        )
        .into_response();
    };

    let Some(document) = request.document else {
        return error_response(StatusCode::BAD_REQUEST, "document URL is required")
            .into_response();
    };

    info!("received extraction request");
    match state
        .processor
        .process(&document, request.claimed_total)
        .await
    {
        Ok(extraction) => {
            let body = response::success(&extraction);
            if !response::validate_success(&body) {
                error!("assembled response failed its schema self-check");
                return error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error: response validation failed",
                )
                .into_response();
            }
            info!(
                "request succeeded: {} items, {} tokens",
                body.data.total_item_count, body.token_usage.total_tokens
            );
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(err) => {
            if let PipelineError::Internal(detail) = &err {
                error!("internal pipeline error: {}", detail);
            } else {
                warn!("extraction failed: {}", err);
            }
            error_response(status_for(&err), err.to_string()).into_response()
        }
    }
}

/// Liveness endpoint: GET /health. Never invokes the pipeline.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "Bill Data Extraction API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Service info endpoint: GET /.
pub async fn home() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Bill Data Extraction API",
        "endpoints": {
            "extract": "/extract-bill-data (POST)",
            "health": "/health (GET)",
        },
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Fallback for unknown routes.
pub async fn not_found() -> impl IntoResponse {
    error_response(
        StatusCode::NOT_FOUND,
        "endpoint not found; see / for available endpoints",
    )
}
