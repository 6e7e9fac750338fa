//! Generator module for text generation
//!
//! Provides a trait-based abstraction over chat-style language models. The
//! hosted Mistral client is the only production implementation.

pub mod config;
pub mod mistral;

pub use config::{GeneratorConfig, SamplingParams};
pub use mistral::MistralGenerator;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Speaker of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// One role-tagged message of a chat prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Trait for text generation models
pub trait Generator: Send + Sync {
    /// Generate a reply to a list of chat messages
    fn generate(&self, messages: &[ChatMessage], params: &SamplingParams) -> Result<String>;

    /// Get the model name/identifier
    fn model_name(&self) -> &str;
}

/// Factory function for creating generators
///
/// Returns `None` when no API key is configured.
pub fn create_generator(config: GeneratorConfig) -> Result<Option<Box<dyn Generator>>> {
    if config.api_key.is_none() {
        return Ok(None);
    }
    Ok(Some(Box::new(MistralGenerator::new(config)?)))
}
