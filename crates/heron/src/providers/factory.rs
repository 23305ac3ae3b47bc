use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;

use super::base::{Provider, ProviderKind};
use super::huggingface::HuggingFaceProvider;
use super::ollama::OllamaProvider;
use crate::config::Settings;

/// Construct the adapter for one provider.
pub fn create(kind: ProviderKind, settings: &Settings) -> Result<Arc<dyn Provider>> {
    match kind {
        ProviderKind::Ollama => Ok(Arc::new(OllamaProvider::new(
            settings.ollama_base_url.clone(),
        )?)),
        ProviderKind::HuggingFace => Ok(Arc::new(HuggingFaceProvider::new(
            settings.hf_api_url.clone(),
            settings.hf_api_token.clone(),
        )?)),
    }
}

/// Build the full provider registry. Adding a backend means adding a
/// `ProviderKind` variant and a `create` arm; nothing downstream branches on
/// provider names.
pub fn create_all(settings: &Settings) -> Result<HashMap<ProviderKind, Arc<dyn Provider>>> {
    let mut providers = HashMap::new();
    for &kind in ProviderKind::ALL {
        providers.insert(kind, create(kind, settings)?);
    }
    Ok(providers)
}
