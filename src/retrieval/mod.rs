//! Retrieval engines
//!
//! Turns a question into the passages of the indexed document that lie
//! closest to it in embedding space.

use crate::data::Chunk;
use crate::embedding::Embedder;
use crate::error::{RagError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub mod dense;

// Re-exports
pub use dense::*;

/// Search result with chunk and distance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// The passage
    pub chunk: Chunk,
    /// Euclidean distance to the query (lower is better)
    pub distance: f32,
    /// Rank in the result list (1-indexed)
    pub rank: usize,
    /// Position of the passage in the index
    pub position: usize,
}

/// Trait for retrieval engines
pub trait Retriever: Send + Sync {
    /// Retrieve top-k most relevant chunks for a query
    fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>>;

    /// Get the name of this retriever
    fn name(&self) -> &str;
}

/// Dense retriever: embeds the query and searches the vector index
pub struct DenseRetriever {
    index: Arc<VectorIndex>,
    embedder: Arc<dyn Embedder>,
}

impl DenseRetriever {
    /// Pair an index with the embedder used for queries; both must agree on the model
    pub fn new(index: Arc<VectorIndex>, embedder: Arc<dyn Embedder>) -> Result<Self> {
        index.ensure_compatible(embedder.as_ref())?;
        Ok(Self { index, embedder })
    }

    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }
}

impl Retriever for DenseRetriever {
    fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        if query.trim().is_empty() {
            return Err(RagError::invalid_input("query is empty"));
        }

        // Only the shape of the query is logged
        tracing::debug!(
            "Retrieving top-{} passages for a {}-character query",
            top_k,
            query.chars().count()
        );

        let query_embedding = self
            .embedder
            .embed(query)
            .map_err(|e| RagError::service("failed to embed query", e))?;

        self.index.search(&query_embedding, top_k)
    }

    fn name(&self) -> &str {
        "dense"
    }
}
