//! Context building for RAG prompts
//!
//! Provides utilities for assembling retrieved passages into
//! chat messages suitable for LLM generation.

mod builder;
mod templates;

pub use builder::{ContextBuilder, PASSAGE_SEPARATOR};
pub use templates::{PromptTemplates, GROUNDED_SYSTEM_PROMPT, GROUNDED_USER_TEMPLATE};
