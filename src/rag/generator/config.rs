//! Configuration for text generators
//!
//! Defines the client configuration for hosted chat models and the sampling
//! parameters sent with each request.

use crate::config::Settings;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a hosted chat model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Model identifier understood by the service
    pub model_id: String,

    /// Bearer credential; `None` means no generator is available
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible API
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            model_id: crate::config::DEFAULT_GENERATOR_MODEL.to_string(),
            api_key: None,
            base_url: crate::config::DEFAULT_GENERATOR_BASE_URL.to_string(),
            timeout_secs: 60,
        }
    }
}

impl GeneratorConfig {
    /// Create a new generator config with the given model ID
    pub fn new(model_id: &str) -> Self {
        Self {
            model_id: model_id.to_string(),
            ..Default::default()
        }
    }

    /// Build from settings; placeholder or blank keys count as missing
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            model_id: settings.generator_model.clone(),
            api_key: settings.generator_key().map(str::to_string),
            base_url: settings.generator_base_url.clone(),
            ..Default::default()
        }
    }

    pub fn with_api_key(mut self, key: &str) -> Self {
        self.api_key = Some(key.to_string());
        self
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Sampling parameters for text generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingParams {
    /// Temperature (0.0 = deterministic)
    pub temperature: f32,

    /// Maximum new tokens to generate
    pub max_new_tokens: usize,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self::greedy()
    }
}

impl SamplingParams {
    /// Deterministic decoding with room for a full answer
    pub fn greedy() -> Self {
        Self {
            temperature: 0.0,
            max_new_tokens: 1024,
        }
    }

    /// Set temperature
    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = temp;
        self
    }

    /// Set max new tokens
    pub fn with_max_new_tokens(mut self, max_tokens: usize) -> Self {
        self.max_new_tokens = max_tokens;
        self
    }
}
