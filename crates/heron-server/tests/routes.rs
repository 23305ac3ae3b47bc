//! HTTP surface tests over the assembled router. Provider backends are not
//! reachable here; everything exercised below must behave without them.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use heron_server::{routes, state::AppState};

fn app() -> axum::Router {
    // Point the local backend somewhere that refuses connections immediately
    // so the catalog falls back to default stubs deterministically.
    let mut settings = heron::Settings::default();
    settings.ollama_base_url = "http://127.0.0.1:1".to_string();
    let state = AppState::new(settings).expect("state");
    routes::configure(state)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn status_reports_ok() {
    let response = app()
        .oneshot(Request::builder().uri("/status").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn context_window_reports_usage() {
    let request = post_json(
        "/context-window",
        json!({
            "provider": "ollama",
            "model_id": "llama3:latest",
            "messages": [
                {"role": "user", "content": "hello there"},
                {"role": "assistant", "content": "hi, how can I help?"}
            ]
        }),
    );
    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert!(body["token_count"].as_u64().unwrap() > 0);
    assert_eq!(body["context_window"], 8192);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["role_breakdown"]["user"]["count"], 1);
    assert_eq!(body["role_breakdown"]["assistant"]["count"], 1);
}

#[tokio::test]
async fn context_window_rejects_unknown_provider() {
    let request = post_json(
        "/context-window",
        json!({
            "provider": "openai",
            "model_id": "gpt-4",
            "messages": []
        }),
    );
    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["details"]["provider"], "openai");
}

#[tokio::test]
async fn chat_rejects_out_of_range_temperature() {
    let request = post_json(
        "/chat",
        json!({
            "provider": "ollama",
            "model_id": "llama3:latest",
            "messages": [{"role": "user", "content": "hi"}],
            "temperature": 1.5
        }),
    );
    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["details"]["field"], "temperature");
}

#[tokio::test]
async fn temperature_update_validates_range() {
    let response = app()
        .oneshot(post_json("/settings/temperature", json!({"temperature": 1.5})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app()
        .oneshot(post_json("/settings/temperature", json!({"temperature": 0.4})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"]["temperature"], 0.4);
}

#[tokio::test]
async fn model_list_always_contains_defaults() {
    let response = app()
        .oneshot(Request::builder().uri("/models").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let models = body["models"].as_array().unwrap();
    // The local backend is unreachable in tests, so its defaults appear as
    // uninstalled stubs.
    let llama = models
        .iter()
        .find(|m| m["id"] == "llama3:latest")
        .expect("default model missing");
    assert_eq!(llama["installed"], false);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["paths"]["/chat"].is_object());
}
