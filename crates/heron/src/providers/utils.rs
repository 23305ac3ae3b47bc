use std::time::Duration;

use reqwest::{Response, StatusCode};
use serde_json::Value;

use super::errors::ProviderError;

/// Generation calls get a long leash; metadata and list calls must come back
/// fast or not at all.
pub const GENERATION_TIMEOUT: Duration = Duration::from_secs(30);
pub const METADATA_TIMEOUT: Duration = Duration::from_secs(5);

/// Map a non-success HTTP status onto the provider error taxonomy, consuming
/// the body for error detail.
pub async fn handle_response(response: Response) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = if body.is_empty() {
        status.to_string()
    } else {
        format!("{}: {}", status, truncate(&body, 400))
    };

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::Authentication(detail),
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimitExceeded(detail),
        s if s.is_server_error() => ProviderError::ServerError(detail),
        _ => ProviderError::RequestFailed(detail),
    })
}

/// Decode a JSON body, reporting parse failures as malformed-payload errors
/// rather than transport errors.
pub async fn parse_json(response: Response) -> Result<Value, ProviderError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes)
        .map_err(|e| ProviderError::MalformedResponse(format!("invalid JSON payload: {}", e)))
}

pub fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
