//! Merged model catalog: live provider listings over configured defaults.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;

use crate::config::Settings;
use crate::error::GatewayError;
use crate::model::ModelDescriptor;
use crate::providers::base::{Provider, ProviderKind};
use crate::token_counter::TokenCounter;

pub struct ModelCatalog {
    providers: HashMap<ProviderKind, Arc<dyn Provider>>,
    token_counter: Arc<TokenCounter>,
    settings: Arc<Settings>,
}

impl ModelCatalog {
    pub fn new(
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

    /// All known models: every provider's live list, plus a stub for any
    /// configured default the provider did not report. Live data wins on the
    /// (provider, id) merge key.
    // TODO: cache the merged list with a TTL; force_refresh currently always
    // refetches because there is no cache to bypass.
    pub async fn list_models(&self, force_refresh: bool) -> Vec<ModelDescriptor> {
        if force_refresh {
            tracing::debug!("Model list refresh forced");
        }

        let fetches = self.providers.values().map(|p| p.list_models());
        let mut models: Vec<ModelDescriptor> = join_all(fetches).await.into_iter().flatten().collect();

        for model in &mut models {
            model.has_reasoning = self.settings.is_reasoning_model(&model.id);
        }

        let live: std::collections::HashSet<(String, String)> = models
            .iter()
            .map(|m| (m.provider.clone(), m.id.clone()))
            .collect();

        for default in &self.settings.default_models {
            if live.contains(&(default.provider.clone(), default.id.clone())) {
                continue;
            }
            tracing::info!("Added default model {} (not installed yet)", default.id);
            let mut stub = ModelDescriptor::new(&default.id, &default.name, &default.provider)
                .with_description(&default.description)
                .as_stub();
            stub.has_reasoning = self.settings.is_reasoning_model(&default.id);
            models.push(stub);
        }

        tracing::info!("Returning {} models", models.len());
        models
    }

    /// Details for one model, straight from its provider. Learned context
    /// lengths feed the shared registry as a side effect.
    pub async fn get_model_details(
        &self,
        provider: &str,
        model_id: &str,
    ) -> Result<ModelDescriptor, GatewayError> {
        let kind: ProviderKind = provider.parse()?;
        let adapter = self
            .providers
            .get(&kind)
            .ok_or_else(|| GatewayError::UnsupportedProvider(provider.to_string()))?;

        let mut descriptor = adapter
            .get_model_info(model_id)
            .await
            .map_err(|e| GatewayError::service(kind.as_str(), model_id, e))?
            .ok_or_else(|| GatewayError::model_not_found(kind.as_str(), model_id))?;

        descriptor.has_reasoning = self.settings.is_reasoning_model(&descriptor.id);
        if let Some(context_length) = descriptor.context_length {
            self.token_counter
                .register_context_window(kind, model_id, context_length);
        }

        tracing::info!("Retrieved details for {}/{}", kind, model_id);
        Ok(descriptor)
    }
}
