//! Model catalog endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use heron::ModelDescriptor;

use super::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListModelsQuery {
    #[serde(default)]
    pub force_refresh: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ModelList {
    pub models: Vec<ModelDescriptor>,
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/models", get(get_available_models))
        // Hosted model ids contain slashes, so the id segment is a wildcard.
        .route("/models/{provider}/{*model_id}", get(get_model_details))
        .with_state(state)
}

/// All models from both providers, merged with the configured defaults.
#[utoipa::path(
    get,
    path = "/models",
    params(("force_refresh" = bool, Query, description = "Force refresh of model list cache")),
    responses(
        (status = 200, description = "List of available models", body = ModelList)
    ),
    tag = "models"
)]
pub async fn get_available_models(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListModelsQuery>,
) -> Json<ModelList> {
    let models = state.catalog.list_models(query.force_refresh).await;
    Json(ModelList { models })
}

/// Details for one model, straight from its provider.
#[utoipa::path(
    get,
    path = "/models/{provider}/{model_id}",
    params(
        ("provider" = String, Path, description = "Model provider"),
        ("model_id" = String, Path, description = "Model id")
    ),
    responses(
        (status = 200, description = "Model details", body = ModelDescriptor),
        (status = 400, description = "Unsupported provider"),
        (status = 404, description = "Model not found")
    ),
    tag = "models"
)]
pub async fn get_model_details(
    State(state): State<Arc<AppState>>,
    Path((provider, model_id)): Path<(String, String)>,
) -> Result<Json<ModelDescriptor>, ApiError> {
    let model = state.catalog.get_model_details(&provider, &model_id).await?;
    Ok(Json(model))
}
