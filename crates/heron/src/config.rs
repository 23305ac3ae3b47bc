//! Environment-driven gateway configuration.
//!
//! Everything here is injected: backend base URLs, API tokens, the default
//! model list, and the reasoning-model name list. Nothing in the core reads
//! the environment after startup.

use serde::{Deserialize, Serialize};

pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_HF_API_URL: &str = "https://api-inference.huggingface.co/models";

/// Model-name substrings that mark a model as reasoning-capable, i.e. one
/// whose output may carry inline `<think>` markup.
const DEFAULT_REASONING_MODELS: &[&str] = &["deepseek-r1", "qwq", "r1", "o1", "thinking"];

/// A configured default model: guaranteed to appear in the catalog even when
/// its provider does not report it as installed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultModel {
    pub id: String,
    pub name: String,
    pub provider: String,
    pub description: String,
}

impl DefaultModel {
    fn new(id: &str, name: &str, provider: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            provider: provider.to_string(),
            description: description.to_string(),
        }
    }
}

fn builtin_default_models() -> Vec<DefaultModel> {
    vec![
        DefaultModel::new("llama3:latest", "Llama 3", "ollama", "Meta's Llama 3 model"),
        DefaultModel::new("llama3.1:latest", "Llama 3.1", "ollama", "Meta's Llama 3.1 model"),
        DefaultModel::new("mistral:latest", "Mistral", "ollama", "Mistral 7B model"),
        DefaultModel::new("mistral-small:latest", "Mistral Small", "ollama", "Mistral's smaller model"),
        DefaultModel::new("deepseek-r1:latest", "DeepSeek R1", "ollama", "DeepSeek reasoning model"),
        DefaultModel::new("deepseek-coder:latest", "DeepSeek Coder", "ollama", "DeepSeek specialized coding model"),
        DefaultModel::new("phi3:latest", "Phi-3", "ollama", "Microsoft's Phi-3 model"),
        DefaultModel::new("gemma2:latest", "Gemma 2", "ollama", "Google's Gemma 2 model"),
        DefaultModel::new("codellama:latest", "Code Llama", "ollama", "Meta's Code Llama model"),
        DefaultModel::new("gpt2", "GPT-2", "huggingface", "OpenAI's GPT-2 model"),
    ]
}

/// Gateway settings, resolved once at startup and passed by reference.
#[derive(Debug, Clone)]
pub struct Settings {
    pub ollama_base_url: String,
    pub hf_api_url: String,
    pub hf_api_token: Option<String>,
    pub default_models: Vec<DefaultModel>,
    pub reasoning_models: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ollama_base_url: DEFAULT_OLLAMA_BASE_URL.to_string(),
            hf_api_url: DEFAULT_HF_API_URL.to_string(),
            hf_api_token: None,
            default_models: builtin_default_models(),
            reasoning_models: DEFAULT_REASONING_MODELS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Settings {
    /// Build settings from the process environment, falling back to built-in
    /// defaults for anything unset. Warns (but keeps going) on soft
    /// misconfiguration, the same way the gateway degrades elsewhere.
    pub fn from_env() -> Self {
        let mut settings = Settings::default();

        if let Ok(url) = std::env::var("OLLAMA_BASE_URL") {
            settings.ollama_base_url = url;
        } else {
            tracing::warn!(
                "OLLAMA_BASE_URL not set, using default: {}",
                DEFAULT_OLLAMA_BASE_URL
            );
        }

        if let Ok(url) = std::env::var("HF_API_URL") {
            settings.hf_api_url = url;
        }

        match std::env::var("HF_API_TOKEN") {
            Ok(token) if !token.trim().is_empty() => settings.hf_api_token = Some(token),
            _ => {
                tracing::warn!("HF_API_TOKEN not set - HuggingFace API calls may be rate limited");
            }
        }

        if let Ok(json_str) = std::env::var("HERON_DEFAULT_MODELS") {
            match serde_json::from_str::<Vec<DefaultModel>>(&json_str) {
                Ok(models) => settings.default_models = models,
                Err(e) => {
                    tracing::warn!("Failed to parse HERON_DEFAULT_MODELS: {}", e);
                }
            }
        }

        if let Ok(list) = std::env::var("HERON_REASONING_MODELS") {
            settings.reasoning_models = list
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect();
        }

        settings
    }

    /// Whether a model's stream should be run through thinking classification.
    pub fn is_reasoning_model(&self, model_id: &str) -> bool {
        let id = model_id.to_lowercase();
        self.reasoning_models.iter().any(|name| id.contains(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasoning_detection_matches_substrings() {
        let settings = Settings::default();
        assert!(settings.is_reasoning_model("deepseek-r1:latest"));
        assert!(settings.is_reasoning_model("DeepSeek-R1:7b"));
        assert!(settings.is_reasoning_model("qwq:32b"));
        assert!(!settings.is_reasoning_model("llama3:latest"));
        assert!(!settings.is_reasoning_model("gpt2"));
    }

    #[test]
    fn builtin_defaults_cover_both_providers() {
        let settings = Settings::default();
        assert!(settings.default_models.iter().any(|m| m.provider == "ollama"));
        assert!(settings
            .default_models
            .iter()
            .any(|m| m.provider == "huggingface"));
    }
}
