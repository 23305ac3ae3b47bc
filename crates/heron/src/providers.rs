pub mod base;
pub mod errors;
pub mod factory;
pub mod huggingface;
pub mod ollama;
pub mod utils;

#[cfg(test)]
pub mod mock;

pub use base::{GenerationParams, Provider, ProviderKind, TextStream};
pub use errors::ProviderError;
