use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

fn is_network_error(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout() || (err.status().is_none() && err.is_request())
}

fn provider_error_from_reqwest(error: &reqwest::Error) -> ProviderError {
    if is_network_error(error) {
        let msg = if error.is_timeout() {
            "Request timed out".to_string()
        } else if error.is_connect() {
            match error.url().and_then(|u| u.host_str().map(|h| (h.to_string(), u.port()))) {
                Some((host, port)) => {
                    let port_info = port.map(|p| format!(":{}", p)).unwrap_or_default();
                    format!("Could not connect to {}{}", host, port_info)
                }
                None => "Could not connect to the provider".to_string(),
            }
        } else {
            "Network error".to_string()
        };
        return ProviderError::NetworkError(msg);
    }

    let msg = match error.status() {
        Some(status) => format!("{} (status: {})", error, status),
        None => error.to_string(),
    };
    ProviderError::RequestFailed(msg)
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        provider_error_from_reqwest(&error)
    }
}

impl From<anyhow::Error> for ProviderError {
    fn from(error: anyhow::Error) -> Self {
        if let Some(reqwest_err) = error.downcast_ref::<reqwest::Error>() {
            return provider_error_from_reqwest(reqwest_err);
        }
        ProviderError::RequestFailed(error.to_string())
    }
}
