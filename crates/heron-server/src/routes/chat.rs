//! Chat endpoints: non-streaming POST and the streaming WebSocket.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::{any, post},
    Json, Router,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use utoipa::ToSchema;

use heron::{ChatRequest, GatewayError};

use super::errors::{error_parts, ApiError};
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct ChatResponse {
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/chat/stream", any(chat_stream))
        .with_state(state)
}

/// Generate a chat response (non-streaming).
#[utoipa::path(
    post,
    path = "/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Generated response", body = ChatResponse),
        (status = 400, description = "Invalid request"),
        (status = 503, description = "Provider unavailable")
    ),
    tag = "chat"
)]
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    tracing::info!(
        "Received chat request: provider={}, model={}",
        request.provider,
        request.model_id
    );

    let output = state.chat.generate(&request).await?;
    Ok(Json(ChatResponse {
        response: output.response,
        thinking: output.thinking,
    }))
}

/// Upgrade to a streaming chat session. The client sends one JSON
/// [`ChatRequest`] per logical turn and receives `{token, type}` frames
/// followed by `{done: true}`, or `{error: true, ...}` on failure.
pub async fn chat_stream(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    tracing::info!("WebSocket connection established");
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut turns = 0usize;

    while let Some(incoming) = ws_rx.next().await {
        let text = match incoming {
            Ok(WsMessage::Text(text)) => text.to_string(),
            Ok(WsMessage::Close(_)) | Err(_) => break,
            Ok(_) => continue,
        };

        let request: ChatRequest = match serde_json::from_str(&text) {
            Ok(request) => request,
            Err(e) => {
                tracing::error!("Invalid JSON in WebSocket message: {}", e);
                let frame = json!({ "error": true, "message": "Invalid JSON in request" });
                if send_frame(&mut ws_tx, &frame).await.is_err() {
                    break;
                }
                continue;
            }
        };

        turns += 1;
        tracing::info!(
            "Received WebSocket request: provider={}, model={}",
            request.provider,
            request.model_id
        );
        if stream_turn(&state, &request, &mut ws_tx, &mut ws_rx).await.is_err() {
            break;
        }
    }

    tracing::info!("WebSocket disconnected. Turns processed: {}", turns);
}

/// Drive one generation through the socket. `Err(())` means the client is
/// gone and the connection loop should end.
async fn stream_turn(
    state: &Arc<AppState>,
    request: &ChatRequest,
    ws_tx: &mut SplitSink<WebSocket, WsMessage>,
    ws_rx: &mut SplitStream<WebSocket>,
) -> Result<(), ()> {
    let cancel = CancellationToken::new();
    let mut stream = match state.chat.generate_stream(request, cancel.clone()).await {
        Ok(stream) => stream,
        Err(e) => {
            // Setup failures are reported on the socket; the connection
            // itself stays usable for the next turn.
            send_error_frame(ws_tx, &e).await?;
            return Ok(());
        }
    };

    loop {
        tokio::select! {
            token = stream.next() => match token {
                Some(Ok(token)) => {
                    let frame = json!({ "token": token.text, "type": token.channel });
                    send_frame(ws_tx, &frame).await.inspect_err(|_| cancel.cancel())?;
                }
                Some(Err(e)) => {
                    tracing::error!("Error in chat stream: {}", e);
                    send_error_frame(ws_tx, &e).await?;
                    return Ok(());
                }
                None => {
                    send_frame(ws_tx, &json!({ "done": true })).await?;
                    return Ok(());
                }
            },
            incoming = ws_rx.next() => match incoming {
                None | Some(Err(_)) | Some(Ok(WsMessage::Close(_))) => {
                    cancel.cancel();
                    return Err(());
                }
                Some(Ok(_)) => {
                    tracing::warn!("Ignoring message received mid-stream");
                }
            }
        }
    }
}

async fn send_frame(
    ws_tx: &mut SplitSink<WebSocket, WsMessage>,
    frame: &serde_json::Value,
) -> Result<(), ()> {
    ws_tx
        .send(WsMessage::Text(frame.to_string().into()))
        .await
        .map_err(|_| ())
}

async fn send_error_frame(
    ws_tx: &mut SplitSink<WebSocket, WsMessage>,
    err: &GatewayError,
) -> Result<(), ()> {
    let (_, body) = error_parts(err);
    let mut frame = json!({ "error": true, "message": body.message });
    if let Some(details) = body.details {
        frame["details"] = details;
    }
    send_frame(ws_tx, &frame).await
}
