//! RAG (Retrieval-Augmented Generation) Pipeline
//!
//! Answers questions about an indexed document by retrieving the closest
//! passages and handing them to a hosted chat model.
//!
//! # Architecture
//!
//! ```text
//! User Query
//!     │
//!     ▼
//! ┌─────────────┐
//! │  Retriever  │  ← Embeds the query, searches the session's index
//! └─────────────┘
//!     │
//!     ▼ SearchResults
//! ┌─────────────┐
//! │   Context   │  ← Joins passages into a grounded prompt
//! │   Builder   │
//! └─────────────┘
//!     │
//!     ▼ Chat messages
//! ┌─────────────┐
//! │  Generator  │  ← Mistral (optional; skipped without an API key)
//! └─────────────┘
//!     │
//!     ▼
//! RagResponse (answer + sources)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use paperwhisper::rag::{AnswerSynthesizer, RagPipeline};
//!
//! let pipeline = RagPipeline::new(embedder, AnswerSynthesizer::from_settings(&settings)?);
//! let response = pipeline.ask(&session, "What does the paper conclude?", 4)?;
//!
//! println!("{}", response);
//! ```

pub mod context;
pub mod generator;
pub mod pipeline;
pub mod query;

// Re-exports for convenience
pub use context::ContextBuilder;
pub use generator::{
    ChatMessage, Generator, GeneratorConfig, MistralGenerator, Role, SamplingParams,
};
pub use pipeline::{AnswerSynthesizer, RagPipeline};
pub use query::{Answer, RagQuery, RagResponse, Source};
