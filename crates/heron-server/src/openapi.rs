use axum::{routing::get, Json, Router};
use utoipa::OpenApi;

use crate::routes;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::chat::chat,
        routes::context::analyze_context_window,
        routes::models::get_available_models,
        routes::models::get_model_details,
        routes::settings::update_temperature,
        routes::status::status,
    ),
    components(schemas(
        heron::message::ChatRequest,
        heron::message::Message,
        heron::message::Role,
        heron::model::ModelDescriptor,
        heron::model::ModelMetadata,
        heron::thinking::Channel,
        heron::thinking::StreamToken,
        routes::chat::ChatResponse,
        routes::context::ContextWindowRequest,
        routes::context::ContextWindowInfo,
        routes::context::RoleUsage,
        routes::errors::ErrorBody,
        routes::models::ModelList,
        routes::settings::TemperatureUpdate,
        routes::settings::SettingsResponse,
        routes::status::StatusResponse,
    )),
    tags(
        (name = "chat", description = "Chat generation"),
        (name = "context", description = "Context window accounting"),
        (name = "models", description = "Model catalog"),
        (name = "settings", description = "Runtime settings"),
        (name = "status", description = "Health"),
    )
)]
pub struct ApiDoc;

pub fn routes() -> Router {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
