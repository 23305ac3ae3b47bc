//! Provider-agnostic chat orchestration: prompt formatting, context-window
//! pre-flight, generation dispatch, and thinking/response splitting.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;

use async_stream::stream;
use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::config::Settings;
use crate::error::GatewayError;
use crate::message::{ChatRequest, Message};
use crate::providers::base::{GenerationParams, Provider, ProviderKind};
use crate::providers::factory;
use crate::thinking::{Channel, StreamToken, ThinkingClassifier};
use crate::token_counter::TokenCounter;

/// Usage percentage above which the pre-flight check logs a warning.
const CONTEXT_WARNING_THRESHOLD: f64 = 80.0;

/// Result of a non-streaming generation.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatOutput {
    pub response: String,
    pub thinking: Option<String>,
}

/// Outcome of the advisory context-window pre-flight.
#[derive(Debug, Clone, Copy)]
pub struct ContextCheck {
    pub token_count: usize,
    pub context_window: usize,
    pub usage_percentage: f64,
}

pub type TokenStream = Pin<Box<dyn Stream<Item = Result<StreamToken, GatewayError>> + Send>>;

/// Unified chat interface over the registered provider adapters.
pub struct ChatService {
    providers: HashMap<ProviderKind, Arc<dyn Provider>>,
    token_counter: Arc<TokenCounter>,
    settings: Arc<Settings>,
}

impl ChatService {
    pub fn new(settings: Arc<Settings>, token_counter: Arc<TokenCounter>) -> anyhow::Result<Self> {
        let providers = factory::create_all(&settings)?;
        Ok(Self::with_providers(providers, token_counter, settings))
    }

    /// Build a service over an explicit provider registry. Tests use this to
    /// supply scripted adapters.
    pub fn with_providers(
        providers: HashMap<ProviderKind, Arc<dyn Provider>>,
        token_counter: Arc<TokenCounter>,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            providers,
            token_counter,
            settings,
        }
    }

    fn adapter(&self, provider: &str) -> Result<(ProviderKind, &Arc<dyn Provider>), GatewayError> {
        let kind: ProviderKind = provider.parse()?;
        let adapter = self
            .providers
            .get(&kind)
            .ok_or_else(|| GatewayError::UnsupportedProvider(provider.to_string()))?;
        Ok((kind, adapter))
    }

    /// Render a conversation into the provider-uniform prompt format:
    /// one `Role: content` line per message, then the assistant cue.
    pub fn format_messages(
        &self,
        provider: &str,
        model_id: &str,
        messages: &[Message],
    ) -> Result<String, GatewayError> {
        tracing::info!("Formatting messages for {}/{}", provider, model_id);
        self.adapter(provider)?;

        let mut formatted = String::new();
        for message in messages {
            formatted.push_str(message.role.capitalized());
            formatted.push_str(": ");
            formatted.push_str(&message.content);
            formatted.push('\n');
        }
        formatted.push_str("Assistant: ");

        tracing::debug!(
            "Formatted prompt preview: {}...",
            crate::providers::utils::truncate(&formatted, 100)
        );
        Ok(formatted)
    }

    /// Advisory pre-flight: estimate the conversation's token footprint
    /// against the model's window. Warns above the threshold, errors when the
    /// estimate exceeds capacity. Never truncates; trimming is the caller's
    /// policy.
    pub fn check_context_window(
        &self,
        provider: ProviderKind,
        model_id: &str,
        messages: &[Message],
    ) -> Result<ContextCheck, GatewayError> {
        let token_count = self
            .token_counter
            .estimate_messages_tokens(messages, provider, model_id);
        let context_window = self
            .token_counter
            .get_provider_context_window(provider, model_id);
        let usage_percentage = (token_count as f64 / context_window as f64) * 100.0;

        if token_count > context_window {
            return Err(GatewayError::ContextLimitExceeded {
                token_count,
                context_window,
                model_id: model_id.to_string(),
            });
        }

        if usage_percentage > CONTEXT_WARNING_THRESHOLD {
            tracing::warn!(
                "Context window usage at {:.1}% for {}/{} ({}/{} tokens)",
                usage_percentage,
                provider,
                model_id,
                token_count,
                context_window
            );
        }

        Ok(ContextCheck {
            token_count,
            context_window,
            usage_percentage,
        })
    }

    /// Ask the provider for the model's true context length and record it.
    /// Enrichment only: any failure is logged and generation proceeds on the
    /// registered estimate.
    async fn refresh_context_window(
        &self,
        kind: ProviderKind,
        adapter: &Arc<dyn Provider>,
        model_id: &str,
    ) {
        match adapter.get_model_info(model_id).await {
            Ok(Some(info)) => {
                if let Some(context_length) = info.context_length {
                    self.token_counter
                        .register_context_window(kind, model_id, context_length);
                }
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(
                    "Failed to fetch model info for {}/{}: {}",
                    kind,
                    model_id,
                    e
                );
            }
        }
    }

    /// Generate a complete response, with thinking markup split off for
    /// reasoning-capable models.
    pub async fn generate(&self, request: &ChatRequest) -> Result<ChatOutput, GatewayError> {
        request.validate()?;
        let (kind, adapter) = self.adapter(&request.provider)?;
        let prompt = self.format_messages(&request.provider, &request.model_id, &request.messages)?;

        tracing::info!(
            "Generating response with {}/{} (temp={}, max_tokens={})",
            kind,
            request.model_id,
            request.temperature,
            request.max_tokens
        );

        self.refresh_context_window(kind, adapter, &request.model_id)
            .await;
        self.check_context_window(kind, &request.model_id, &request.messages)?;

        let params = GenerationParams {
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };
        let text = adapter
            .generate_text(&request.model_id, &prompt, params)
            .await
            .map_err(|e| GatewayError::service(kind.as_str(), &request.model_id, e))?;

        tracing::info!("Generated response of length {} chars", text.len());

        let has_reasoning = self.settings.is_reasoning_model(&request.model_id);
        let (response, thinking) = ThinkingClassifier::split_text(has_reasoning, &text);
        Ok(ChatOutput {
            response,
            thinking: thinking.filter(|_| request.show_thinking),
        })
    }

    /// Generate a response as a stream of classified tokens.
    ///
    /// Concatenating the response-channel fragments reproduces exactly what
    /// the non-streaming call would return. Cancelling the token tears down
    /// the provider stream without draining it.
    pub async fn generate_stream(
        &self,
        request: &ChatRequest,
        cancel: CancellationToken,
    ) -> Result<TokenStream, GatewayError> {
        request.validate()?;
        let (kind, adapter) = self.adapter(&request.provider)?;
        let prompt = self.format_messages(&request.provider, &request.model_id, &request.messages)?;

        tracing::info!(
            "Streaming response with {}/{} (temp={}, max_tokens={})",
            kind,
            request.model_id,
            request.temperature,
            request.max_tokens
        );

        self.refresh_context_window(kind, adapter, &request.model_id)
            .await;
        self.check_context_window(kind, &request.model_id, &request.messages)?;

        let params = GenerationParams {
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };
        let mut raw = adapter
            .generate_stream(&request.model_id, &prompt, params)
            .await
            .map_err(|e| GatewayError::service(kind.as_str(), &request.model_id, e))?;

        let has_reasoning = self.settings.is_reasoning_model(&request.model_id);
        let show_thinking = request.show_thinking;
        let provider_name = kind.as_str().to_string();
        let model_id = request.model_id.clone();

        Ok(Box::pin(stream! {
            let mut classifier = ThinkingClassifier::new(has_reasoning);
            let mut emitted = 0usize;
            loop {
                let fragment = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        tracing::info!("Client disconnected, terminating provider stream");
                        return;
                    }
                    fragment = raw.next() => fragment,
                };
                match fragment {
                    Some(Ok(fragment)) => {
                        for token in classifier.push(&fragment) {
                            if show_thinking || token.channel != Channel::Thinking {
                                emitted += 1;
                                yield Ok(token);
                            }
                        }
                    }
                    Some(Err(e)) => {
                        yield Err(GatewayError::service(&provider_name, &model_id, e));
                        return;
                    }
                    None => break,
                }
            }
            for token in classifier.finish() {
                if show_thinking || token.channel != Channel::Thinking {
                    emitted += 1;
                    yield Ok(token);
                }
            }
            tracing::info!("Completed streaming response: {} tokens sent", emitted);
        }))
    }
}
