//! Scriptable in-memory provider for orchestrator and catalog tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_stream::try_stream;
use async_trait::async_trait;

use super::base::{GenerationParams, Provider, ProviderKind, TextStream};
use super::errors::ProviderError;
use crate::model::ModelDescriptor;

pub struct MockProvider {
    kind: ProviderKind,
    response: Mutex<String>,
    fragments: Mutex<Vec<String>>,
    models: Mutex<Vec<ModelDescriptor>>,
    model_info: Mutex<Option<ModelDescriptor>>,
    pub calls: AtomicUsize,
}

impl MockProvider {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            response: Mutex::new(String::new()),
            fragments: Mutex::new(Vec::new()),
            models: Mutex::new(Vec::new()),
            model_info: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_response(self, response: impl Into<String>) -> Self {
        *self.response.lock().unwrap() = response.into();
        self
    }

    pub fn with_fragments<I, S>(self, fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self.fragments.lock().unwrap() = fragments.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_models(self, models: Vec<ModelDescriptor>) -> Self {
        *self.models.lock().unwrap() = models;
        self
    }

    pub fn with_model_info(self, info: ModelDescriptor) -> Self {
        *self.model_info.lock().unwrap() = Some(info);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn generate_text(
        &self,
        _model_id: &str,
        _prompt: &str,
        _params: GenerationParams,
    ) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.response.lock().unwrap().clone())
    }

    async fn generate_stream(
        &self,
        _model_id: &str,
        _prompt: &str,
        _params: GenerationParams,
    ) -> Result<TextStream, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let fragments = self.fragments.lock().unwrap().clone();
        Ok(Box::pin(try_stream! {
            for fragment in fragments {
                yield fragment;
            }
        }))
    }

    async fn get_model_info(&self, _model_id: &str) -> Result<Option<ModelDescriptor>, ProviderError> {
        Ok(self.model_info.lock().unwrap().clone())
    }

    async fn list_models(&self) -> Vec<ModelDescriptor> {
        self.models.lock().unwrap().clone()
    }
}
