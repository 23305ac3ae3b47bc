pub mod chat;
pub mod context;
pub mod errors;
pub mod models;
pub mod settings;
pub mod status;

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::Request,
    middleware::{self, Next},
    response::Response,
    Router,
};

use crate::state::AppState;

pub fn configure(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(chat::routes(state.clone()))
        .merge(context::routes(state.clone()))
        .merge(models::routes(state.clone()))
        .merge(settings::routes(state))
        .merge(status::routes())
        .merge(crate::openapi::routes())
        .layer(middleware::from_fn(log_requests))
}

/// Log every request with its latency.
async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();
    tracing::info!("Request: {} {}", method, uri);

    let response = next.run(request).await;

    tracing::info!(
        "Response status: {} - took {:.4}s",
        response.status(),
        start.elapsed().as_secs_f64()
    );
    response
}
