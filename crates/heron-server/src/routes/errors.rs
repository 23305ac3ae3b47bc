use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use utoipa::ToSchema;

use heron::GatewayError;

/// Error body shared by every REST endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Wrapper that renders a [`GatewayError`] as an HTTP response. Known error
/// kinds keep their detail; anything else is logged and flattened into a
/// generic 500 so internals never leak.
pub struct ApiError(pub GatewayError);

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        ApiError(err)
    }
}

/// Status code and structured detail for one gateway error. Shared with the
/// WebSocket error frames, which carry the same payload minus the status.
pub fn error_parts(err: &GatewayError) -> (StatusCode, ErrorBody) {
    let message = err.to_string();
    match err {
        GatewayError::Validation { field, .. } => (
            StatusCode::BAD_REQUEST,
            ErrorBody {
                message,
                details: Some(json!({ "field": field })),
            },
        ),
        GatewayError::UnsupportedProvider(provider) => (
            StatusCode::BAD_REQUEST,
            ErrorBody {
                message,
                details: Some(json!({
                    "provider": provider,
                    "supported": ["ollama", "huggingface"],
                })),
            },
        ),
        GatewayError::ModelNotFound { provider, model_id } => (
            StatusCode::NOT_FOUND,
            ErrorBody {
                message,
                details: Some(json!({ "provider": provider, "model_id": model_id })),
            },
        ),
        GatewayError::ContextLimitExceeded {
            token_count,
            context_window,
            model_id,
        } => (
            StatusCode::BAD_REQUEST,
            ErrorBody {
                message,
                details: Some(json!({
                    "token_count": token_count,
                    "context_window": context_window,
                    "model_id": model_id,
                    "usage_percentage": (*token_count as f64 / *context_window as f64) * 100.0,
                })),
            },
        ),
        GatewayError::Service { provider, model_id, .. } => (
            StatusCode::SERVICE_UNAVAILABLE,
            ErrorBody {
                message,
                details: Some(json!({ "provider": provider, "model_id": model_id })),
            },
        ),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = error_parts(&self.0);
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
        }
        (status, Json(body)).into_response()
    }
}
