//! RAG query and response types
//!
//! Defines the data structures at the pipeline's input and output. The
//! `Display` impls here are the only place where distances are presented as
//! similarities.

use crate::retrieval::SearchResult;
use serde::{Deserialize, Serialize};

/// Query input for RAG pipeline
#[derive(Debug, Clone)]
pub struct RagQuery {
    /// The user's question
    pub query: String,
    /// Number of passages to retrieve
    pub top_k: usize,
}

impl RagQuery {
    /// Create a new RAG query
    pub fn new(query: &str) -> Self {
        Self {
            query: query.to_string(),
            top_k: crate::config::DEFAULT_TOP_K,
        }
    }

    /// Set the number of passages to retrieve
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }
}

/// Outcome of the generation step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Answer {
    /// The model produced an answer
    Generated(String),
    /// No generator is configured; only passages are returned
    Skipped,
    /// The generator failed; carries a user-facing description
    Failed(String),
}

impl Answer {
    pub fn text(&self) -> Option<&str> {
        match self {
            Answer::Generated(text) => Some(text),
            _ => None,
        }
    }
}

impl std::fmt::Display for Answer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Answer::Generated(text) => write!(f, "{}", text),
            Answer::Skipped => write!(
                f,
                "No generator API key configured: showing retrieved passages only"
            ),
            Answer::Failed(message) => write!(f, "{}", message),
        }
    }
}

/// Passage reference in a response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    /// Position of the passage in the index
    pub position: usize,
    /// Passage order within the document
    pub chunk_index: usize,
    /// Euclidean distance to the query
    pub distance: f32,
    /// Full passage text
    pub content: String,
}

impl Source {
    pub fn from_result(result: &SearchResult) -> Self {
        Self {
            position: result.position,
            chunk_index: result.chunk.chunk_index,
            distance: result.distance,
            content: result.chunk.content.clone(),
        }
    }

    /// Similarity shown to users
    pub fn similarity(&self) -> f32 {
        1.0 - self.distance
    }

    /// Shortened passage text for display
    pub fn snippet(&self, max_chars: usize) -> String {
        truncate_snippet(&self.content, max_chars)
    }
}

/// Response from RAG pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagResponse {
    /// Generated answer, or why there is none
    pub answer: Answer,
    /// Retrieved passages in rank order
    pub sources: Vec<Source>,
    /// Context block sent to the generator
    pub context: String,
    /// Retrieval time in milliseconds
    pub retrieval_time_ms: u64,
    /// Generation time in milliseconds
    pub generation_time_ms: u64,
}

impl RagResponse {
    /// Get total processing time in milliseconds
    pub fn total_time_ms(&self) -> u64 {
        self.retrieval_time_ms + self.generation_time_ms
    }
}

impl std::fmt::Display for RagResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Answer: {}", self.answer)?;
        writeln!(f, "\nSources ({}):", self.sources.len())?;
        for (i, source) in self.sources.iter().enumerate() {
            writeln!(
                f,
                "  [{}] passage {} (similarity: {:.1}%)",
                i + 1,
                source.chunk_index + 1,
                source.similarity() * 100.0
            )?;
            writeln!(f, "      {}", source.snippet(200).replace('\n', " "))?;
        }
        writeln!(
            f,
            "\nTiming: retrieval={}ms, generation={}ms, total={}ms",
            self.retrieval_time_ms,
            self.generation_time_ms,
            self.total_time_ms()
        )?;
        Ok(())
    }
}

/// Truncate a text snippet to `max_chars` characters, preserving word boundaries
pub fn truncate_snippet(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let truncated: String = text.chars().take(max_chars).collect();
    match truncated.rfind(' ') {
        Some(last_space) if last_space > 0 => format!("{}...", &truncated[..last_space]),
        _ => format!("{}...", truncated),
    }
}
