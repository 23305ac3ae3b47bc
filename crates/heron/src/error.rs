use thiserror::Error;

use crate::providers::errors::ProviderError;

/// Errors surfaced by the gateway core.
///
/// The first four variants are client-addressable conditions and propagate to
/// the boundary unchanged; `Service` wraps any downstream provider failure
/// with the provider/model it occurred against.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Invalid value for '{field}': {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("Model '{model_id}' from provider '{provider}' not found")]
    ModelNotFound { provider: String, model_id: String },

    #[error("Context limit exceeded for model '{model_id}': {token_count} tokens (limit: {context_window})")]
    ContextLimitExceeded {
        token_count: usize,
        context_window: usize,
        model_id: String,
    },

    #[error("{provider} request for model '{model_id}' failed: {source}")]
    Service {
        provider: String,
        model_id: String,
        #[source]
        source: ProviderError,
    },
}

impl GatewayError {
    /// Annotate a raw provider error with the provider/model it came from.
    pub fn service(provider: &str, model_id: &str, source: ProviderError) -> Self {
        GatewayError::Service {
            provider: provider.to_string(),
            model_id: model_id.to_string(),
            source,
        }
    }

    pub fn model_not_found(provider: &str, model_id: &str) -> Self {
        GatewayError::ModelNotFound {
            provider: provider.to_string(),
            model_id: model_id.to_string(),
        }
    }
}
