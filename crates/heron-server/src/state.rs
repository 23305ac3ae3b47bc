use std::sync::Arc;

use heron::providers::factory;
use heron::{ChatService, ModelCatalog, Settings, TokenCounter};

/// Shared per-process state: one provider registry, one token counter, and
/// the services built over them.
#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<ChatService>,
    pub catalog: Arc<ModelCatalog>,
    pub token_counter: Arc<TokenCounter>,
}

impl AppState {
    pub fn new(settings: Settings) -> anyhow::Result<Arc<Self>> {
        let settings = Arc::new(settings);
        let token_counter = Arc::new(TokenCounter::new());
        let providers = factory::create_all(&settings)?;

        let chat = Arc::new(ChatService::with_providers(
            providers.clone(),
            token_counter.clone(),
            settings.clone(),
        ));
        let catalog = Arc::new(ModelCatalog::new(
            providers,
            token_counter.clone(),
            settings,
        ));

        Ok(Arc::new(Self {
            chat,
            catalog,
            token_counter,
        }))
    }
}
