use std::fmt;
use std::pin::Pin;
use std::str::FromStr;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

use super::errors::ProviderError;
use crate::error::GatewayError;
use crate::model::ModelDescriptor;

/// The two supported model backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Ollama,
    HuggingFace,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Ollama => "ollama",
            ProviderKind::HuggingFace => "huggingface",
        }
    }

    pub const ALL: &'static [ProviderKind] = &[ProviderKind::Ollama, ProviderKind::HuggingFace];
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ollama" => Ok(ProviderKind::Ollama),
            "huggingface" => Ok(ProviderKind::HuggingFace),
            other => Err(GatewayError::UnsupportedProvider(other.to_string())),
        }
    }
}

/// Sampling parameters forwarded to a backend, already validated upstream.
#[derive(Debug, Clone, Copy)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Raw text fragments as a backend produces them.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, ProviderError>> + Send>>;

/// Uniform capability set over one backend's wire protocol.
///
/// Implementations hold no shared state beyond their HTTP client; every call
/// stands alone. Metadata calls use short timeouts, generation calls long
/// ones.
#[async_trait]
pub trait Provider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Generate a complete response for a formatted prompt.
    async fn generate_text(
        &self,
        model_id: &str,
        prompt: &str,
        params: GenerationParams,
    ) -> Result<String, ProviderError>;

    /// Generate a response as a stream of raw text fragments. Dropping the
    /// returned stream releases the underlying connection.
    async fn generate_stream(
        &self,
        model_id: &str,
        prompt: &str,
        params: GenerationParams,
    ) -> Result<TextStream, ProviderError>;

    /// Look up a single model. `Ok(None)` means the provider answered but
    /// does not know the model.
    async fn get_model_info(&self, model_id: &str) -> Result<Option<ModelDescriptor>, ProviderError>;

    /// List the provider's models. Never fails: an unreachable backend is
    /// reported as an empty list so the catalog can still serve defaults.
    async fn list_models(&self) -> Vec<ModelDescriptor>;
}
