//! Embedding generation
//!
//! Provides a trait-based embedding interface with local (hashing, candle)
//! and hosted (OpenAI-compatible) backends. Every backend returns
//! L2-normalized vectors, so Euclidean distance between two embeddings is a
//! monotone function of their cosine similarity.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::config::Settings;

pub mod backends;

// Re-exports
pub use backends::*;

/// Represents an embedding vector
pub type Embedding = Vec<f32>;

/// Configuration for embedding generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model name or hub id
    pub model_name: String,
    /// Output dimension for backends that choose their own (token, mock, openai)
    pub dimension: usize,
    /// Maximum sequence length for tokenizer-based backends
    pub max_length: usize,
    /// Inputs per request for hosted backends
    pub batch_size: usize,
    /// Credential for hosted backends
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Base URL for hosted backends
    pub base_url: String,
    /// Vector size to request from hosted backends; left out of requests when unset
    #[serde(default)]
    pub request_dimensions: Option<usize>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_name: crate::config::DEFAULT_EMBEDDING_MODEL.to_string(),
            dimension: 384,
            max_length: 256,
            batch_size: 64,
            api_key: None,
            base_url: crate::config::DEFAULT_OPENAI_BASE_URL.to_string(),
            request_dimensions: None,
        }
    }
}

impl EmbeddingConfig {
    /// Build the embedding configuration from runtime settings
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            model_name: settings.embedding_model.clone(),
            dimension: settings.embedding_dimension,
            api_key: settings.embeddings_api_key.clone(),
            base_url: settings.embeddings_base_url.clone(),
            request_dimensions: settings.embeddings_dimensions,
            ..Default::default()
        }
    }

    pub fn with_model(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = model_name.into();
        self
    }

    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }
}

/// Trait for embedding models
///
/// Implementations must be deterministic for a given model: embedding the
/// same text twice yields the same vector, and `embed_batch` yields exactly
/// what per-item `embed` calls would.
pub trait Embedder: Send + Sync {
    /// Embed a single text
    fn embed(&self, text: &str) -> Result<Embedding>;

    /// Embed multiple texts in batch, preserving order
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>>;

    /// Get the embedding dimension
    fn dimension(&self) -> usize;

    /// Get the model name recorded in indices built with this embedder
    fn model_name(&self) -> &str;
}

/// Normalize an embedding vector (L2 normalization)
pub fn normalize_embedding(embedding: &mut Embedding) {
    let norm = l2_norm(embedding);

    if norm > 0.0 {
        for val in embedding.iter_mut() {
            *val /= norm;
        }
    }
}

pub fn l2_norm(embedding: &[f32]) -> f32 {
    embedding.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Euclidean distance between two vectors of equal length
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}
