use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Structured metadata reported by a provider for one of its models.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ModelMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_length: Option<usize>,
}

impl ModelMetadata {
    pub fn is_empty(&self) -> bool {
        self.family.is_none() && self.parameter_size.is_none() && self.context_length.is_none()
    }
}

/// A model as presented by the catalog: live provider data where available,
/// a configured stub otherwise. Built fresh per request, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ModelDescriptor {
    pub id: String,
    pub name: String,
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub has_reasoning: bool,
    /// False for configured defaults the provider did not report as present.
    #[serde(default = "default_installed")]
    pub installed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ModelMetadata>,
}

fn default_installed() -> bool {
    true
}

impl ModelDescriptor {
    pub fn new(id: impl Into<String>, name: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            provider: provider.into(),
            description: None,
            context_length: None,
            capabilities: Vec::new(),
            has_reasoning: false,
            installed: true,
            metadata: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_context_length(mut self, context_length: Option<usize>) -> Self {
        self.context_length = context_length;
        self
    }

    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_metadata(mut self, metadata: ModelMetadata) -> Self {
        if !metadata.is_empty() {
            self.metadata = Some(metadata);
        }
        self
    }

    pub fn as_stub(mut self) -> Self {
        self.installed = false;
        self
    }
}
