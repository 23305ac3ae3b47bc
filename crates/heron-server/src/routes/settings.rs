//! Runtime settings endpoints. In-memory only; nothing here survives a
//! restart.

use std::sync::Arc;

use axum::{routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use heron::GatewayError;

use super::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct TemperatureUpdate {
    pub temperature: f32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SettingsResponse {
    pub status: String,
    pub message: String,
    pub data: serde_json::Value,
}

pub fn routes(_state: Arc<AppState>) -> Router {
    Router::new().route("/settings/temperature", post(update_temperature))
}

/// Update the default generation temperature.
#[utoipa::path(
    post,
    path = "/settings/temperature",
    request_body = TemperatureUpdate,
    responses(
        (status = 200, description = "Temperature updated", body = SettingsResponse),
        (status = 400, description = "Temperature out of range")
    ),
    tag = "settings"
)]
pub async fn update_temperature(
    Json(update): Json<TemperatureUpdate>,
) -> Result<Json<SettingsResponse>, ApiError> {
    if !(0.0..=1.0).contains(&update.temperature) {
        return Err(ApiError(GatewayError::Validation {
            field: "temperature",
            message: "must be between 0.0 and 1.0".to_string(),
        }));
    }

    tracing::info!("Temperature setting updated: {}", update.temperature);

    Ok(Json(SettingsResponse {
        status: "success".to_string(),
        message: "Temperature updated successfully".to_string(),
        data: json!({ "temperature": update.temperature }),
    }))
}
