//! RAG Pipeline orchestration
//!
//! Coordinates retrieval over a session's index with answer generation.
//! Generation is optional: without a configured model the pipeline still
//! returns the retrieved passages.

use std::sync::Arc;
use std::time::Instant;

use crate::config::Settings;
use crate::embedding::Embedder;
use crate::error::{RagError, Result};
use crate::ingest::Session;
use crate::retrieval::{DenseRetriever, Retriever, SearchResult};

use super::context::ContextBuilder;
use super::generator::{create_generator, Generator, GeneratorConfig, SamplingParams};
use super::query::{Answer, RagQuery, RagResponse, Source};

/// Turns retrieved passages and a question into an answer
pub struct AnswerSynthesizer {
    generator: Option<Box<dyn Generator>>,
    context_builder: ContextBuilder,
    params: SamplingParams,
}

impl AnswerSynthesizer {
    /// Create a synthesizer; `None` puts it in retrieval-only mode
    pub fn new(generator: Option<Box<dyn Generator>>) -> Self {
        Self {
            generator,
            context_builder: ContextBuilder::new(),
            params: SamplingParams::greedy(),
        }
    }

    /// Build the generator only when a usable API key is configured
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let generator = create_generator(GeneratorConfig::from_settings(settings))
            .map_err(|e| RagError::service("failed to set up the generator", e))?;

        match &generator {
            Some(g) => tracing::info!("Answer generation enabled with model {}", g.model_name()),
            None => tracing::info!("No generator API key configured, retrieval-only mode"),
        }
        Ok(Self::new(generator))
    }

    pub fn with_context_builder(mut self, builder: ContextBuilder) -> Self {
        self.context_builder = builder;
        self
    }

    pub fn with_sampling_params(mut self, params: SamplingParams) -> Self {
        self.params = params;
        self
    }

    /// Whether a generator is configured
    pub fn is_available(&self) -> bool {
        self.generator.is_some()
    }

    /// The configured generator, for callers that cannot do without one
    pub fn generator(&self) -> Result<&dyn Generator> {
        self.generator
            .as_deref()
            .ok_or_else(|| RagError::model_unavailable("no generator API key configured"))
    }

    pub fn context_builder(&self) -> &ContextBuilder {
        &self.context_builder
    }

    /// Answer `query` from `results`
    pub fn synthesize(&self, query: &str, results: &[SearchResult]) -> Answer {
        let context = self.context_builder.build(results);
        self.answer_with_context(query, &context)
    }

    /// Answer `query` from an already assembled context block
    ///
    /// Never fails: generation errors are turned into [`Answer::Failed`].
    pub fn answer_with_context(&self, query: &str, context: &str) -> Answer {
        let generator = match self.generator() {
            Ok(generator) => generator,
            Err(e) => {
                tracing::debug!("Skipping generation: {}", e);
                return Answer::Skipped;
            }
        };

        let messages = self.context_builder.build_messages(query, context);
        match generator.generate(&messages, &self.params) {
            Ok(text) => Answer::Generated(text),
            Err(e) => {
                tracing::warn!("Answer generation failed: {:#}", e);
                Answer::Failed(format!("Error generating answer: {:#}", e))
            }
        }
    }
}

/// RAG Pipeline for document question-answering
///
/// Orchestrates the query-time workflow:
/// 1. Embed the query and search the session's index
/// 2. Build context from the retrieved passages
/// 3. Generate an answer when a generator is available
pub struct RagPipeline {
    embedder: Arc<dyn Embedder>,
    synthesizer: AnswerSynthesizer,
}

impl RagPipeline {
    pub fn new(embedder: Arc<dyn Embedder>, synthesizer: AnswerSynthesizer) -> Self {
        Self {
            embedder,
            synthesizer,
        }
    }

    /// Top-k passages for `query` from the session's index
    pub fn retrieve(&self, session: &Session, query: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        let index = session
            .index()
            .ok_or_else(|| RagError::not_found("no document has been indexed in this session"))?;
        DenseRetriever::new(index, Arc::clone(&self.embedder))?.retrieve(query, top_k)
    }

    /// Retrieve, then answer
    pub fn ask(&self, session: &Session, query: &str, top_k: usize) -> Result<RagResponse> {
        let retrieval_start = Instant::now();
        let results = self.retrieve(session, query, top_k)?;
        let retrieval_time_ms = retrieval_start.elapsed().as_millis() as u64;

        let context = self.synthesizer.context_builder().build(&results);

        let generation_start = Instant::now();
        let answer = self.synthesizer.answer_with_context(query, &context);
        let generation_time_ms = generation_start.elapsed().as_millis() as u64;

        tracing::info!(
            "Answered query: {} passages, retrieval={}ms, generation={}ms",
            results.len(),
            retrieval_time_ms,
            generation_time_ms
        );

        Ok(RagResponse {
            answer,
            sources: results.iter().map(Source::from_result).collect(),
            context,
            retrieval_time_ms,
            generation_time_ms,
        })
    }

    /// Execute a [`RagQuery`] against the session
    pub fn query(&self, session: &Session, query: &RagQuery) -> Result<RagResponse> {
        self.ask(session, &query.query, query.top_k)
    }

    pub fn synthesizer(&self) -> &AnswerSynthesizer {
        &self.synthesizer
    }
}
