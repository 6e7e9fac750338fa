//! Embedding backend implementations
//!
//! `token` and `mock` run without any model files, `openai` calls a hosted
//! OpenAI-compatible endpoint, and `candle` (feature-gated) runs a
//! sentence-transformers BERT model locally.

use crate::embedding::{normalize_embedding, Embedder, Embedding, EmbeddingConfig};
use anyhow::Result;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use unicode_segmentation::UnicodeSegmentation;

pub mod openai;

#[cfg(feature = "candle")]
pub mod candle_bert;

pub use openai::OpenAiEmbedder;

#[cfg(feature = "candle")]
pub use candle_bert::CandleBertEmbedder;

/// Mock embedder for testing (random-looking but deterministic embeddings)
pub struct MockEmbedder {
    config: EmbeddingConfig,
}

impl MockEmbedder {
    /// Create a new mock embedder
    pub fn new(config: EmbeddingConfig) -> Self {
        Self { config }
    }

    /// Generate a deterministic embedding based on text hash
    fn generate_embedding(&self, text: &str) -> Embedding {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let mut state = hasher.finish();

        let mut embedding: Embedding = (0..self.config.dimension)
            .map(|_| {
                // LCG
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                ((state >> 33) % 10000) as f32 / 10000.0 - 0.5
            })
            .collect();

        normalize_embedding(&mut embedding);
        embedding
    }
}

impl Embedder for MockEmbedder {
    fn embed(&self, text: &str) -> Result<Embedding> {
        Ok(self.generate_embedding(text))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        Ok(texts.iter().map(|&text| self.generate_embedding(text)).collect())
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn model_name(&self) -> &str {
        &self.config.model_name
    }
}

/// Hashed bag-of-words embedder
///
/// Lowercased unicode words are hashed into `dimension` buckets and weighted by
/// term frequency. Texts sharing vocabulary end up close together, which is
/// enough for keyword-heavy questions and needs no model download.
pub struct TokenEmbedder {
    dimension: usize,
    model_name: String,
}

impl TokenEmbedder {
    /// Create a new token-based embedder
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            model_name: format!("token-hash-{}", dimension),
        }
    }

    fn bucket(&self, token: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        token.hash(&mut hasher);
        (hasher.finish() % self.dimension as u64) as usize
    }

    fn generate_embedding(&self, text: &str) -> Embedding {
        let mut embedding = vec![0.0; self.dimension];

        let tokens: Vec<String> = text.unicode_words().map(|w| w.to_lowercase()).collect();

        if tokens.is_empty() {
            // Punctuation or whitespace only: a fixed unit vector
            embedding[self.bucket("")] = 1.0;
            return embedding;
        }

        for token in &tokens {
            let idx = self.bucket(token);
            embedding[idx] += 1.0;
        }

        let total_tokens = tokens.len() as f32;
        for val in embedding.iter_mut() {
            *val /= total_tokens;
        }

        normalize_embedding(&mut embedding);
        embedding
    }
}

impl Embedder for TokenEmbedder {
    fn embed(&self, text: &str) -> Result<Embedding> {
        Ok(self.generate_embedding(text))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        Ok(texts.iter().map(|&text| self.generate_embedding(text)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Create an embedder based on backend name
pub fn create_embedder(backend: &str, config: EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    anyhow::ensure!(config.dimension > 0, "embedding dimension must be greater than zero");

    if let Some(model) = ignored_model(backend, &config) {
        tracing::warn!(
            "Embedding model '{}' is ignored by the token backend; indices record 'token-hash-{}'",
            model,
            config.dimension
        );
    }

    match backend {
        "mock" => Ok(Arc::new(MockEmbedder::new(config))),
        "token" => Ok(Arc::new(TokenEmbedder::new(config.dimension))),
        "openai" => Ok(Arc::new(OpenAiEmbedder::from_config(&config)?)),
        #[cfg(feature = "candle")]
        "candle" => Ok(Arc::new(CandleBertEmbedder::new(&config)?)),
        #[cfg(not(feature = "candle"))]
        "candle" => anyhow::bail!("the candle backend requires building with --features candle"),
        other => anyhow::bail!(
            "unknown embedding backend '{}' (expected token, mock, openai or candle)",
            other
        ),
    }
}

/// A configured model name the chosen backend will not load
fn ignored_model<'a>(backend: &str, config: &'a EmbeddingConfig) -> Option<&'a str> {
    (backend == "token" && config.model_name != crate::config::DEFAULT_EMBEDDING_MODEL)
        .then_some(config.model_name.as_str())
}
