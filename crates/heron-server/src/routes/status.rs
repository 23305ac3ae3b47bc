use axum::{routing::get, Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusResponse {
    pub status: String,
    pub version: String,
}

pub fn routes() -> Router {
    Router::new().route("/status", get(status))
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/status",
    responses((status = 200, description = "Server status", body = StatusResponse)),
    tag = "status"
)]
pub async fn status() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
