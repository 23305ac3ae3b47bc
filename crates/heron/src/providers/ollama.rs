//! Adapter for a locally hosted Ollama inference server.

use async_stream::try_stream;
use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde_json::{json, Value};
use std::io;
use tokio_util::codec::{FramedRead, LinesCodec};
use tokio_util::io::StreamReader;
use url::Url;

use super::base::{GenerationParams, Provider, ProviderKind, TextStream};
use super::errors::ProviderError;
use super::utils::{handle_response, parse_json, GENERATION_TIMEOUT, METADATA_TIMEOUT};
use crate::model::{ModelDescriptor, ModelMetadata};

pub const OLLAMA_DEFAULT_PORT: u16 = 11434;

static NAME_PARTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z]+|\d+").unwrap());

pub struct OllamaProvider {
    client: Client,
    host: String,
}

impl OllamaProvider {
    pub fn new(host: impl Into<String>) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .build()
            .map_err(|e| ProviderError::RequestFailed(format!("Failed to build client: {}", e)))?;
        Ok(Self {
            client,
            host: host.into(),
        })
    }

    /// Base URL for API calls. The configured host is sometimes just
    /// `host` or `host:port` without a scheme.
    fn get_base_url(&self) -> Result<Url, ProviderError> {
        let base = if self.host.starts_with("http://") || self.host.starts_with("https://") {
            self.host.clone()
        } else {
            format!("http://{}", self.host)
        };

        let mut base_url = Url::parse(&base)
            .map_err(|e| ProviderError::RequestFailed(format!("Invalid base URL: {e}")))?;

        let explicit_default_port = self.host.ends_with(":80") || self.host.ends_with(":443");
        if base_url.port().is_none() && !explicit_default_port {
            base_url.set_port(Some(OLLAMA_DEFAULT_PORT)).map_err(|_| {
                ProviderError::RequestFailed("Failed to set default port".to_string())
            })?;
        }

        Ok(base_url)
    }

    fn endpoint(&self, path: &str) -> Result<Url, ProviderError> {
        self.get_base_url()?.join(path).map_err(|e| {
            ProviderError::RequestFailed(format!("Failed to construct endpoint URL: {e}"))
        })
    }

    /// `POST /api/show` for one model. `Ok(None)` when the server answers but
    /// does not know the model.
    async fn show_model(&self, model_id: &str) -> Result<Option<Value>, ProviderError> {
        let url = self.endpoint("api/show")?;
        let response = self
            .client
            .post(url)
            .json(&json!({ "name": model_id }))
            .timeout(METADATA_TIMEOUT)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = handle_response(response).await?;
        Ok(Some(parse_json(response).await?))
    }

    fn descriptor_from_metadata(&self, model_id: &str, metadata: Option<&Value>) -> ModelDescriptor {
        let description = metadata
            .and_then(|m| m.get("description"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Ollama model: {}", model_id));
        let parameter_size = metadata
            .and_then(|m| m.get("parameter_size"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let context_length = metadata
            .and_then(|m| m.get("context_length"))
            .and_then(Value::as_u64)
            .map(|n| n as usize);

        ModelDescriptor::new(model_id, format_model_name(model_id), "ollama")
            .with_description(description)
            .with_context_length(context_length)
            .with_capabilities(["text-generation", "chat"])
            .with_metadata(ModelMetadata {
                family: extract_model_family(model_id),
                parameter_size,
                context_length,
            })
    }

    fn generate_payload(&self, model_id: &str, prompt: &str, params: GenerationParams, stream: bool) -> Value {
        json!({
            "model": model_id,
            "prompt": prompt,
            "temperature": params.temperature,
            "num_predict": params.max_tokens,
            "stream": stream,
        })
    }

    /// Some Ollama builds answer non-streaming generate calls with NDJSON
    /// anyway; concatenate the per-line response fields.
    fn collect_ndjson_response(text: &str) -> String {
        let mut full_response = String::new();
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            match serde_json::from_str::<Value>(line) {
                Ok(value) => {
                    if let Some(fragment) = value.get("response").and_then(Value::as_str) {
                        full_response.push_str(fragment);
                    }
                }
                Err(_) => {
                    tracing::warn!("Failed to parse NDJSON response line, returning raw text");
                    return text.to_string();
                }
            }
        }
        full_response
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Ollama
    }

    async fn generate_text(
        &self,
        model_id: &str,
        prompt: &str,
        params: GenerationParams,
    ) -> Result<String, ProviderError> {
        let url = self.endpoint("api/generate")?;
        let payload = self.generate_payload(model_id, prompt, params, false);
        tracing::debug!(model_id, "Sending generation request to Ollama");

        let response = self
            .client
            .post(url)
            .json(&payload)
            .timeout(GENERATION_TIMEOUT)
            .send()
            .await?;
        let response = handle_response(response).await?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if content_type.contains("application/x-ndjson") {
            let text = response.text().await?;
            return Ok(Self::collect_ndjson_response(&text));
        }

        let result = parse_json(response).await?;
        Ok(result
            .get("response")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }

    async fn generate_stream(
        &self,
        model_id: &str,
        prompt: &str,
        params: GenerationParams,
    ) -> Result<TextStream, ProviderError> {
        let url = self.endpoint("api/generate")?;
        let payload = self.generate_payload(model_id, prompt, params, true);
        tracing::debug!(model_id, "Sending streaming request to Ollama");

        let response = self
            .client
            .post(url)
            .json(&payload)
            .timeout(GENERATION_TIMEOUT)
            .send()
            .await?;
        let response = handle_response(response).await?;

        let bytes = response.bytes_stream().map_err(io::Error::other);

        Ok(Box::pin(try_stream! {
            let reader = StreamReader::new(bytes);
            let mut lines = FramedRead::new(reader, LinesCodec::new());
            while let Some(line) = lines.next().await {
                let line = line.map_err(|e| {
                    ProviderError::NetworkError(format!("Stream read error: {}", e))
                })?;
                if line.trim().is_empty() {
                    continue;
                }
                let value: Value = match serde_json::from_str(&line) {
                    Ok(value) => value,
                    Err(e) => {
                        tracing::warn!("Error parsing JSON in Ollama stream: {}", e);
                        continue;
                    }
                };
                if let Some(fragment) = value.get("response").and_then(Value::as_str) {
                    if !fragment.is_empty() {
                        yield fragment.to_string();
                    }
                }
                if value.get("done").and_then(Value::as_bool).unwrap_or(false) {
                    break;
                }
            }
        }))
    }

    async fn get_model_info(&self, model_id: &str) -> Result<Option<ModelDescriptor>, ProviderError> {
        match self.show_model(model_id).await? {
            Some(metadata) => Ok(Some(self.descriptor_from_metadata(model_id, Some(&metadata)))),
            None => Ok(None),
        }
    }

    async fn list_models(&self) -> Vec<ModelDescriptor> {
        let url = match self.endpoint("api/tags") {
            Ok(url) => url,
            Err(e) => {
                tracing::error!("Invalid Ollama base URL: {}", e);
                return Vec::new();
            }
        };

        let data = async {
            let response = self.client.get(url).timeout(METADATA_TIMEOUT).send().await?;
            let response = handle_response(response).await?;
            parse_json(response).await
        }
        .await;

        let data = match data {
            Ok(data) => data,
            Err(e) => {
                tracing::error!("Failed to fetch models from Ollama: {}", e);
                return Vec::new();
            }
        };

        let mut models = Vec::new();
        for entry in data
            .get("models")
            .and_then(Value::as_array)
            .map(|a| a.as_slice())
            .unwrap_or_default()
        {
            let Some(model_name) = entry.get("name").and_then(Value::as_str) else {
                continue;
            };
            // Metadata enrichment is best-effort; a model with no reachable
            // details still gets listed.
            let metadata = match self.show_model(model_name).await {
                Ok(metadata) => metadata,
                Err(e) => {
                    tracing::warn!("Failed to fetch metadata for model {}: {}", model_name, e);
                    None
                }
            };
            models.push(self.descriptor_from_metadata(model_name, metadata.as_ref()));
        }

        tracing::info!("Retrieved {} models from Ollama", models.len());
        models
    }
}

/// Most Ollama ids use `family:tag`; fall back to the leading dash-separated
/// segment, then the id itself.
pub(crate) fn extract_model_family(model_id: &str) -> Option<String> {
    if let Some((family, _)) = model_id.split_once(':') {
        return Some(family.to_lowercase());
    }
    if let Some((family, _)) = model_id.split_once('-') {
        return Some(family.to_lowercase());
    }
    Some(model_id.to_lowercase())
}

/// Human-readable display name for a model id, e.g. `llama3:latest` becomes
/// "Llama 3" and `mistral-small:latest` becomes "Mistral Small".
pub(crate) fn format_model_name(model_id: &str) -> String {
    let base_name = model_id.split(':').next().unwrap_or(model_id);

    if base_name.contains('-') {
        return base_name
            .split('-')
            .map(capitalize)
            .collect::<Vec<_>>()
            .join(" ");
    }

    let parts: Vec<String> = NAME_PARTS
        .find_iter(base_name)
        .map(|m| capitalize(m.as_str()))
        .collect();
    if parts.is_empty() {
        capitalize(base_name)
    } else {
        parts.join(" ")
    }
}

fn capitalize(part: &str) -> String {
    let mut chars = part.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
