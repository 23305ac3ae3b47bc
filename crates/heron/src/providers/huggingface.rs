//! Adapter for the hosted HuggingFace inference API.

use async_stream::try_stream;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde_json::{json, Value};

use super::base::{GenerationParams, Provider, ProviderKind, TextStream};
use super::errors::ProviderError;
use super::utils::{handle_response, parse_json, GENERATION_TIMEOUT};
use crate::model::{ModelDescriptor, ModelMetadata};

static PARAM_SIZE_B: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+\.?\d*)b").unwrap());
static PARAM_SIZE_M: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)m").unwrap());

/// Curated hosted models. The inference API has no usable "list everything"
/// endpoint, so the catalog works from a fixed set of well-known entries.
const CURATED_MODELS: &[(&str, &str, &str, &str, &str)] = &[
    ("gpt2", "GPT-2", "OpenAI's GPT-2 model", "gpt", "0.124"),
    (
        "EleutherAI/gpt-neo-1.3B",
        "GPT-Neo 1.3B",
        "EleutherAI's GPT-Neo model",
        "gpt-neo",
        "1.3",
    ),
    (
        "EleutherAI/gpt-j-6B",
        "GPT-J 6B",
        "EleutherAI's GPT-J model",
        "gpt-j",
        "6",
    ),
    (
        "bigscience/bloom-560m",
        "BLOOM 560M",
        "BigScience BLOOM model (small)",
        "bloom",
        "0.56",
    ),
    (
        "microsoft/phi-2",
        "Phi-2 2.7B",
        "Microsoft's Phi-2 small language model",
        "phi",
        "2.7",
    ),
    (
        "HuggingFaceH4/zephyr-7b-beta",
        "Zephyr 7B",
        "HuggingFace Zephyr model",
        "zephyr",
        "7",
    ),
];

pub struct HuggingFaceProvider {
    client: Client,
    api_url: String,
    api_token: Option<String>,
}

impl HuggingFaceProvider {
    pub fn new(api_url: impl Into<String>, api_token: Option<String>) -> Result<Self, ProviderError> {
        if api_token.is_none() {
            tracing::warn!("HuggingFace API token not provided - API calls may be rate limited");
        }
        let client = Client::builder()
            .build()
            .map_err(|e| ProviderError::RequestFailed(format!("Failed to build client: {}", e)))?;
        Ok(Self {
            client,
            api_url: api_url.into(),
            api_token,
        })
    }

    fn request(&self, model_id: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.api_url.trim_end_matches('/'), model_id);
        let mut builder = self.client.post(url);
        if let Some(token) = &self.api_token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    fn extract_generated_text(result: &Value) -> Result<String, ProviderError> {
        if let Some(first) = result.as_array().and_then(|a| a.first()) {
            if let Some(text) = first.get("generated_text").and_then(Value::as_str) {
                return Ok(text.to_string());
            }
        }
        if let Some(text) = result.get("generated_text").and_then(Value::as_str) {
            return Ok(text.to_string());
        }
        Err(ProviderError::MalformedResponse(format!(
            "no generated_text in payload: {}",
            super::utils::truncate(&result.to_string(), 200)
        )))
    }
}

#[async_trait]
impl Provider for HuggingFaceProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::HuggingFace
    }

    async fn generate_text(
        &self,
        model_id: &str,
        prompt: &str,
        params: GenerationParams,
    ) -> Result<String, ProviderError> {
        let payload = json!({
            "inputs": prompt,
            "parameters": {
                "temperature": params.temperature,
                "max_new_tokens": params.max_tokens,
                "return_full_text": false,
            }
        });
        tracing::debug!(model_id, "Sending generation request to HuggingFace");

        let response = self
            .request(model_id)
            .json(&payload)
            .timeout(GENERATION_TIMEOUT)
            .send()
            .await?;
        let response = handle_response(response).await?;
        let result = parse_json(response).await?;
        Self::extract_generated_text(&result)
    }

    /// The inference API has no token streaming for arbitrary models, so a
    /// completed generation is re-emitted in small fragments.
    async fn generate_stream(
        &self,
        model_id: &str,
        prompt: &str,
        params: GenerationParams,
    ) -> Result<TextStream, ProviderError> {
        tracing::warn!(
            model_id,
            "Streaming not directly supported for HuggingFace - simulating stream"
        );
        let full_text = self.generate_text(model_id, prompt, params).await?;

        Ok(Box::pin(try_stream! {
            for ch in full_text.chars() {
                yield ch.to_string();
            }
        }))
    }

    async fn get_model_info(&self, model_id: &str) -> Result<Option<ModelDescriptor>, ProviderError> {
        let (family, parameter_size, context_length) = extract_model_metadata(model_id);
        let display_name = format_model_name(model_id, parameter_size.as_deref());

        Ok(Some(
            ModelDescriptor::new(model_id, display_name, "huggingface")
                .with_description(format!("HuggingFace model: {}", model_id))
                .with_context_length(Some(context_length))
                .with_capabilities(determine_capabilities(model_id))
                .with_metadata(ModelMetadata {
                    family,
                    parameter_size,
                    context_length: Some(context_length),
                }),
        ))
    }

    async fn list_models(&self) -> Vec<ModelDescriptor> {
        let models: Vec<ModelDescriptor> = CURATED_MODELS
            .iter()
            .map(|(id, name, description, family, parameter_size)| {
                ModelDescriptor::new(*id, *name, "huggingface")
                    .with_description(*description)
                    .with_capabilities(determine_capabilities(id))
                    .with_metadata(ModelMetadata {
                        family: Some(family.to_string()),
                        parameter_size: Some(parameter_size.to_string()),
                        context_length: None,
                    })
            })
            .collect();
        tracing::info!("Returning {} curated HuggingFace models", models.len());
        models
    }
}

/// Family, parameter size, and context length guessed from the model id.
fn extract_model_metadata(model_id: &str) -> (Option<String>, Option<String>, usize) {
    let lowered = model_id.to_lowercase();
    let family = model_id
        .rsplit('/')
        .next()
        .and_then(|name| name.split('-').next())
        .map(str::to_lowercase);

    let parameter_size = PARAM_SIZE_B
        .captures(&lowered)
        .map(|c| c[1].to_string())
        .or_else(|| {
            PARAM_SIZE_M
                .captures(&lowered)
                .and_then(|c| c[1].parse::<f64>().ok())
                .map(|m| (m / 1000.0).to_string())
        })
        .or_else(|| lowered.contains("gpt2").then(|| "0.124".to_string()));

    let context_length = if lowered.contains("bart") {
        1024
    } else if lowered.contains("t5") {
        512
    } else {
        2048
    };

    (family, parameter_size, context_length)
}

fn determine_capabilities(model_id: &str) -> Vec<String> {
    let lowered = model_id.to_lowercase();
    let mut capabilities = vec!["text-generation".to_string()];
    if lowered.contains("bart") || lowered.contains("t5") {
        capabilities.push("summarization".to_string());
    }
    if lowered.contains("gpt") || lowered.contains("bloom") || lowered.contains("llama") {
        capabilities.push("chat".to_string());
    }
    if lowered.contains("code") {
        capabilities.push("code-generation".to_string());
    }
    capabilities
}

fn format_model_name(model_id: &str, parameter_size: Option<&str>) -> String {
    let model_name = model_id.rsplit('/').next().unwrap_or(model_id);
    let mut display_name = model_name
        .split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ");

    if let Some(size) = parameter_size.and_then(|s| s.parse::<f64>().ok()) {
        if size < 1.0 {
            display_name = format!("{} ({}M)", display_name, (size * 1000.0).round() as u64);
        } else {
            display_name = format!("{} ({}B)", display_name, size);
        }
    }
    display_name
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn params() -> GenerationParams {
        GenerationParams {
            temperature: 0.7,
            max_tokens: 64,
        }
    }

    #[test]
    fn extracts_metadata_from_ids() {
        let (family, size, context) = extract_model_metadata("EleutherAI/gpt-neo-1.3B");
        assert_eq!(family.as_deref(), Some("gpt"));
        assert_eq!(size.as_deref(), Some("1.3"));
        assert_eq!(context, 2048);

        let (_, size, _) = extract_model_metadata("bigscience/bloom-560m");
        assert_eq!(size.as_deref(), Some("0.56"));

        let (_, _, context) = extract_model_metadata("facebook/bart-large-cnn");
        assert_eq!(context, 1024);
    }

    #[test]
    fn parses_list_and_object_payloads() {
        let list = serde_json::json!([{"generated_text": "hi"}]);
        assert_eq!(HuggingFaceProvider::extract_generated_text(&list).unwrap(), "hi");

        let object = serde_json::json!({"generated_text": "hello"});
        assert_eq!(
            HuggingFaceProvider::extract_generated_text(&object).unwrap(),
            "hello"
        );

        let bogus = serde_json::json!({"error": "loading"});
        assert!(HuggingFaceProvider::extract_generated_text(&bogus).is_err());
    }

    #[tokio::test]
    async fn generate_text_round_trips() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/gpt2"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([{"generated_text": "streamed answer"}])),
            )
            .mount(&server)
            .await;

        let provider = HuggingFaceProvider::new(server.uri(), None).unwrap();
        let text = provider
            .generate_text("gpt2", "User: hi\nAssistant: ", params())
            .await
            .unwrap();
        assert_eq!(text, "streamed answer");
    }

    #[tokio::test]
    async fn simulated_stream_preserves_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/gpt2"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([{"generated_text": "abc"}])),
            )
            .mount(&server)
            .await;

        let provider = HuggingFaceProvider::new(server.uri(), None).unwrap();
        let stream = provider
            .generate_stream("gpt2", "User: hi\nAssistant: ", params())
            .await
            .unwrap();
        let fragments: Vec<String> = stream.map(|r| r.unwrap()).collect().await;
        assert_eq!(fragments.concat(), "abc");
    }

    #[tokio::test]
    async fn list_models_is_curated_and_infallible() {
        let provider = HuggingFaceProvider::new("http://127.0.0.1:1", None).unwrap();
        let models = provider.list_models().await;
        assert!(!models.is_empty());
        assert!(models.iter().all(|m| m.provider == "huggingface"));
    }
}
