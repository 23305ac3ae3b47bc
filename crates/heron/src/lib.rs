//! Heron is a gateway core that unifies a locally hosted inference server
//! (Ollama) and a hosted model API (HuggingFace) behind one chat interface:
//! provider-agnostic message formatting, approximate context-window
//! accounting, and streaming classification of reasoning markup.

pub mod catalog;
pub mod chat;
pub mod config;
pub mod error;
pub mod message;
pub mod model;
pub mod providers;
pub mod thinking;
pub mod token_counter;

pub use catalog::ModelCatalog;
pub use chat::{ChatOutput, ChatService};
pub use config::Settings;
pub use error::GatewayError;
pub use message::{ChatRequest, Message, Role};
pub use model::ModelDescriptor;
pub use thinking::{Channel, StreamToken, ThinkingClassifier};
pub use token_counter::TokenCounter;
