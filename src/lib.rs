//! # paperwhisper
//!
//! Ask questions about a single document with retrieval-augmented generation.
//!
//! ## Overview
//!
//! A document (PDF, Markdown or plain text) is extracted page by page, split
//! into overlapping passages and embedded into an exact vector index held by
//! a [`Session`]. Questions are answered by retrieving the closest passages
//! and handing them to a hosted chat model; without a model credential the
//! passages alone are returned.
//!
//! ## Architecture
//!
//! - `data` - Document extraction and chunking
//! - `embedding` - Embedding backends (hashing, hosted, local BERT)
//! - `retrieval` - Flat vector index and dense retriever
//! - `ingest` - Session state and the ingestion pipeline
//! - `rag` - Prompt building, generation and the query pipeline
//! - `config` - Layered settings
//! - `cli` - Command-line interface

pub mod cli;
pub mod config;
pub mod data;
pub mod embedding;
pub mod error;
pub mod ingest;
pub mod rag;
pub mod retrieval;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use config::Settings;
pub use data::{Chunk, Document, Page};
pub use error::{ErrorKind, RagError, Result};
pub use ingest::{IngestOptions, IngestionPipeline, Session, SessionState};
pub use rag::{Answer, AnswerSynthesizer, RagPipeline, RagResponse};
pub use retrieval::{SearchResult, VectorIndex};
