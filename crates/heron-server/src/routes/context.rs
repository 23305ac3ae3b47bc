//! Context-window analysis endpoint.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use heron::providers::ProviderKind;
use heron::Message;

use super::errors::ApiError;
use crate::state::AppState;

const WARNING_THRESHOLD: f64 = 80.0;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ContextWindowRequest {
    pub provider: String,
    pub model_id: String,
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RoleUsage {
    pub count: usize,
    pub tokens: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ContextWindowInfo {
    pub token_count: usize,
    pub context_window: usize,
    pub usage_percentage: f64,
    pub role_breakdown: HashMap<String, RoleUsage>,
    pub status: String,
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/context-window", post(analyze_context_window))
        .with_state(state)
}

/// Report estimated token usage for a conversation against its model's
/// window, with a per-role breakdown. Advisory only; nothing is truncated.
#[utoipa::path(
    post,
    path = "/context-window",
    request_body = ContextWindowRequest,
    responses(
        (status = 200, description = "Context window usage", body = ContextWindowInfo),
        (status = 400, description = "Invalid provider")
    ),
    tag = "context"
)]
pub async fn analyze_context_window(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ContextWindowRequest>,
) -> Result<Json<ContextWindowInfo>, ApiError> {
    let provider: ProviderKind = request.provider.parse()?;
    tracing::info!(
        "Analyzing context window for {}/{}",
        provider,
        request.model_id
    );

    let token_count = state.token_counter.estimate_messages_tokens(
        &request.messages,
        provider,
        &request.model_id,
    );
    let context_window = state
        .token_counter
        .get_provider_context_window(provider, &request.model_id);
    let usage_percentage = if context_window > 0 {
        (token_count as f64 / context_window as f64) * 100.0
    } else {
        0.0
    };

    let mut role_breakdown: HashMap<String, RoleUsage> = HashMap::new();
    for message in &request.messages {
        let tokens = state
            .token_counter
            .count_tokens(&message.content, &request.model_id);
        let usage = role_breakdown
            .entry(message.role.to_string())
            .or_insert(RoleUsage { count: 0, tokens: 0 });
        usage.count += 1;
        usage.tokens += tokens;
    }

    tracing::info!(
        "Context window analysis for {}/{}: {}/{} tokens ({:.1}%)",
        provider,
        request.model_id,
        token_count,
        context_window,
        usage_percentage
    );

    let status = if usage_percentage > WARNING_THRESHOLD {
        "warning"
    } else {
        "ok"
    };

    Ok(Json(ContextWindowInfo {
        token_count,
        context_window,
        usage_percentage: (usage_percentage * 10.0).round() / 10.0,
        role_breakdown,
        status: status.to_string(),
    }))
}
