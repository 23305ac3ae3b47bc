//! Approximate token accounting and context-window registry.
//!
//! True tokenizers differ per model and are often unavailable for arbitrary
//! hosted models, so counting trades precision for availability: a BPE
//! tokenizer where one applies, a character heuristic otherwise, and a
//! context-window registry that layers learned values over static defaults.

use std::collections::HashMap;
use std::sync::RwLock;

use once_cell::sync::Lazy;
use tiktoken_rs::CoreBPE;

use crate::message::{Message, Role};
use crate::providers::ProviderKind;

pub const DEFAULT_CONTEXT_WINDOW: usize = 4096;

/// Conservative static context windows, used when nothing better has been
/// learned from a provider.
const CONTEXT_WINDOWS: &[(&str, usize)] = &[
    ("gpt-3.5-turbo", 4096),
    ("gpt-4", 8192),
    ("gpt-4-32k", 32768),
    ("llama2", 4096),
    ("llama3", 8192),
    ("mistral", 8192),
    ("mixtral", 32768),
    ("claude", 100_000),
    ("gpt2", 1024),
    ("huggingface/default", 2048),
    ("ollama/default", 4096),
];

/// Per-message overhead: role tag plus delimiters.
const ROLE_OVERHEAD: usize = 4;
const FORMAT_OVERHEAD: usize = 3;
/// Cost of the implicit system prompt some providers prepend.
const IMPLICIT_SYSTEM_OVERHEAD: usize = 10;

/// Character-per-token divisors for the length heuristic. Hosted-model text
/// tokenizes denser than the typical local model.
const HOSTED_CHARS_PER_TOKEN: usize = 3;
const LOCAL_CHARS_PER_TOKEN: usize = 4;

static CL100K: Lazy<Option<CoreBPE>> = Lazy::new(|| match tiktoken_rs::cl100k_base() {
    Ok(bpe) => Some(bpe),
    Err(e) => {
        tracing::warn!("Failed to load cl100k_base tokenizer: {}", e);
        None
    }
});

static R50K: Lazy<Option<CoreBPE>> = Lazy::new(|| match tiktoken_rs::r50k_base() {
    Ok(bpe) => Some(bpe),
    Err(e) => {
        tracing::warn!("Failed to load r50k_base tokenizer: {}", e);
        None
    }
});

/// Token estimator and context-window registry.
///
/// One instance is shared by everything in a process; the dynamic registry is
/// the only mutable state and sits behind a single read/write guard, so
/// concurrent registrations of the same key converge without corruption.
pub struct TokenCounter {
    dynamic: RwLock<HashMap<String, usize>>,
}

impl Default for TokenCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenCounter {
    pub fn new() -> Self {
        Self {
            dynamic: RwLock::new(HashMap::new()),
        }
    }

    /// Count tokens in a text. Never fails: an unavailable tokenizer falls
    /// back to a length heuristic.
    pub fn count_tokens(&self, text: &str, model_id: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        match encoder_for(model_id) {
            Some(bpe) => bpe.encode_ordinary(text).len(),
            None => approximate_token_count(text, chars_per_token(model_id)),
        }
    }

    /// Estimate the token footprint of a conversation: content tokens plus
    /// per-message role and formatting overhead, plus the implicit system
    /// prompt when none is present.
    pub fn estimate_messages_tokens(
        &self,
        messages: &[Message],
        provider: ProviderKind,
        model_id: &str,
    ) -> usize {
        if messages.is_empty() {
            return 0;
        }

        // Hosted models are counted with the GPT-2 tokenizer as an
        // approximation; local models by their own id.
        let counting_model = match provider {
            ProviderKind::HuggingFace => "gpt2",
            ProviderKind::Ollama => model_id,
        };

        let mut total: usize = messages
            .iter()
            .map(|m| self.count_tokens(&m.content, counting_model) + ROLE_OVERHEAD)
            .sum();

        total += messages.len() * FORMAT_OVERHEAD;

        if !messages.iter().any(|m| m.role == Role::System) {
            total += IMPLICIT_SYSTEM_OVERHEAD;
        }

        total
    }

    /// Record a context window learned from provider metadata.
    ///
    /// Writes the exact `provider/model` and bare `model` keys, and projects
    /// onto the model-family key with a conservative-minimum policy: family
    /// tags can have differing window sizes and the estimator must never
    /// overstate capacity.
    pub fn register_context_window(
        &self,
        provider: ProviderKind,
        model_id: &str,
        context_length: usize,
    ) {
        let full_id = format!("{}/{}", provider, model_id);
        let mut registry = self.dynamic.write().unwrap();
        registry.insert(full_id.clone(), context_length);
        registry.insert(model_id.to_string(), context_length);

        if let Some(family) = model_family(model_id) {
            for key in [family.to_string(), format!("{}/{}", provider, family)] {
                let keep_existing = registry.get(&key).is_some_and(|&existing| existing <= context_length);
                if !keep_existing {
                    registry.insert(key, context_length);
                }
            }
        }

        tracing::debug!(
            "Registered context window for {}: {} tokens",
            full_id,
            context_length
        );
    }

    /// Context window for a model. Lookup order: dynamic exact, dynamic bare
    /// model, dynamic family, static exact, static family, provider default,
    /// global default. Always positive.
    pub fn get_provider_context_window(&self, provider: ProviderKind, model_id: &str) -> usize {
        let full_id = format!("{}/{}", provider, model_id);
        let family = model_family(model_id);

        {
            let registry = self.dynamic.read().unwrap();
            let dynamic_keys = [Some(full_id.as_str()), Some(model_id), family];
            for key in dynamic_keys.into_iter().flatten() {
                if let Some(&size) = registry.get(key) {
                    return size;
                }
            }
            if let Some(family) = family {
                if let Some(&size) = registry.get(&format!("{}/{}", provider, family)) {
                    return size;
                }
            }
        }

        if let Some(size) = static_context_window(&full_id).or_else(|| static_context_window(model_id))
        {
            return size;
        }
        if let Some(size) = family.and_then(static_context_window) {
            return size;
        }
        if let Some(size) = static_context_window(&format!("{}/default", provider)) {
            return size;
        }

        tracing::warn!(
            "No context window size found for {}, using default ({})",
            full_id,
            DEFAULT_CONTEXT_WINDOW
        );
        DEFAULT_CONTEXT_WINDOW
    }
}

fn static_context_window(key: &str) -> Option<usize> {
    CONTEXT_WINDOWS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|&(_, size)| size)
}

/// The model-family prefix: everything before the first `:` (tag separator),
/// falling back to the first `-` (version separator). None when the id has no
/// separator at all.
fn model_family(model_id: &str) -> Option<&str> {
    model_id
        .split_once(':')
        .or_else(|| model_id.split_once('-'))
        .map(|(family, _)| family)
}

fn chars_per_token(model_id: &str) -> usize {
    if model_id.to_lowercase().contains("gpt2") {
        HOSTED_CHARS_PER_TOKEN
    } else {
        LOCAL_CHARS_PER_TOKEN
    }
}

fn approximate_token_count(text: &str, chars_per_token: usize) -> usize {
    (text.chars().count() / chars_per_token).max(1)
}

fn encoder_for(model_id: &str) -> Option<&'static CoreBPE> {
    let base_model = model_id
        .split(':')
        .next()
        .unwrap_or(model_id)
        .to_lowercase();
    if base_model.contains("gpt2") {
        R50K.as_ref()
    } else {
        CL100K.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    #[test]
    fn count_tokens_is_positive_and_deterministic() {
        let counter = TokenCounter::new();
        let a = counter.count_tokens("Hello, how are you?", "llama3:latest");
        let b = counter.count_tokens("Hello, how are you?", "llama3:latest");
        assert!(a > 0);
        assert_eq!(a, b);
        assert_eq!(counter.count_tokens("", "llama3:latest"), 0);
    }

    #[test]
    fn approximation_never_returns_zero() {
        assert_eq!(approximate_token_count("a", 4), 1);
        assert_eq!(approximate_token_count("abcdefgh", 4), 2);
        assert_eq!(approximate_token_count("abcdefgh", 3), 2);
    }

    #[test]
    fn estimate_is_deterministic_and_small_for_short_input() {
        let counter = TokenCounter::new();
        let messages = vec![Message::user("hi")];
        let first = counter.estimate_messages_tokens(&messages, ProviderKind::HuggingFace, "m");
        let second = counter.estimate_messages_tokens(&messages, ProviderKind::HuggingFace, "m");
        assert_eq!(first, second);
        assert!(first > 0);
        assert!(first < 50);
    }

    #[test]
    fn estimate_charges_for_missing_system_message() {
        let counter = TokenCounter::new();
        let without = counter.estimate_messages_tokens(
            &[Message::user("hello there")],
            ProviderKind::Ollama,
            "llama3:latest",
        );
        let with = counter.estimate_messages_tokens(
            &[
                Message::system("hello there"),
            ],
            ProviderKind::Ollama,
            "llama3:latest",
        );
        assert_eq!(without, with + IMPLICIT_SYSTEM_OVERHEAD);
    }

    #[test]
    fn empty_conversation_estimates_zero() {
        let counter = TokenCounter::new();
        assert_eq!(
            counter.estimate_messages_tokens(&[], ProviderKind::Ollama, "llama3:latest"),
            0
        );
    }

    #[test]
    fn family_registration_keeps_conservative_minimum() {
        let counter = TokenCounter::new();
        counter.register_context_window(ProviderKind::Ollama, "llama3:8b", 8192);
        counter.register_context_window(ProviderKind::Ollama, "llama3:tiny", 4096);
        assert_eq!(
            counter.get_provider_context_window(ProviderKind::Ollama, "llama3:unseen-tag"),
            4096
        );

        // Reverse registration order converges to the same minimum.
        let counter = TokenCounter::new();
        counter.register_context_window(ProviderKind::Ollama, "llama3:tiny", 4096);
        counter.register_context_window(ProviderKind::Ollama, "llama3:8b", 8192);
        assert_eq!(
            counter.get_provider_context_window(ProviderKind::Ollama, "llama3:unseen-tag"),
            4096
        );
    }

    #[test]
    fn exact_entries_are_not_clamped_by_family_minimum() {
        let counter = TokenCounter::new();
        counter.register_context_window(ProviderKind::Ollama, "llama3:tiny", 4096);
        counter.register_context_window(ProviderKind::Ollama, "llama3:8b", 8192);
        assert_eq!(
            counter.get_provider_context_window(ProviderKind::Ollama, "llama3:8b"),
            8192
        );
    }

    #[test]
    fn dynamic_entries_beat_static_entries() {
        let counter = TokenCounter::new();
        // llama3 has a static entry of 8192.
        assert_eq!(
            counter.get_provider_context_window(ProviderKind::Ollama, "llama3:latest"),
            8192
        );
        counter.register_context_window(ProviderKind::Ollama, "llama3:latest", 131_072);
        assert_eq!(
            counter.get_provider_context_window(ProviderKind::Ollama, "llama3:latest"),
            131_072
        );
    }

    #[test]
    fn lookup_falls_back_to_provider_then_global_default() {
        let counter = TokenCounter::new();
        assert_eq!(
            counter.get_provider_context_window(ProviderKind::HuggingFace, "unknown/model_x"),
            2048
        );
        assert_eq!(
            counter.get_provider_context_window(ProviderKind::Ollama, "mysterymodel"),
            4096
        );
    }

    #[test]
    fn static_family_lookup_covers_unseen_tags() {
        let counter = TokenCounter::new();
        assert_eq!(
            counter.get_provider_context_window(ProviderKind::Ollama, "mixtral:8x7b"),
            32768
        );
    }
}
