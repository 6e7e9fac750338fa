//! Test doubles shared by unit tests

use crate::data::{Chunk, Document, DocumentExtractor, MultiFormatExtractor, Page};
use crate::embedding::{Embedder, Embedding, TokenEmbedder};
use crate::error::Result;
use crate::rag::generator::{ChatMessage, Generator, SamplingParams};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Chunks laid end to end, as the chunker would produce without overlap
pub(crate) fn chunks_from(texts: &[&str]) -> Vec<Chunk> {
    let mut pos = 0;
    texts
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let len = text.chars().count();
            let chunk = Chunk::new(text.to_string(), pos, pos + len, i);
            pos += len;
            chunk
        })
        .collect()
}

/// Token embedder that counts `embed` and `embed_batch` calls
pub(crate) struct CountingEmbedder {
    inner: TokenEmbedder,
    calls: AtomicUsize,
}

impl CountingEmbedder {
    pub(crate) fn new(dimension: usize) -> Self {
        Self {
            inner: TokenEmbedder::new(dimension),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Embedder for CountingEmbedder {
    fn embed(&self, text: &str) -> anyhow::Result<Embedding> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.embed(text)
    }

    fn embed_batch(&self, texts: &[&str]) -> anyhow::Result<Vec<Embedding>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.embed_batch(texts)
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

/// Embedder whose every call fails
pub(crate) struct FailingEmbedder;

impl Embedder for FailingEmbedder {
    fn embed(&self, _text: &str) -> anyhow::Result<Embedding> {
        anyhow::bail!("embedding service unreachable")
    }

    fn embed_batch(&self, _texts: &[&str]) -> anyhow::Result<Vec<Embedding>> {
        anyhow::bail!("embedding service unreachable")
    }

    fn dimension(&self) -> usize {
        8
    }

    fn model_name(&self) -> &str {
        "failing"
    }
}

/// Embedder that reports 8 dimensions but returns 4
pub(crate) struct WrongDimensionEmbedder;

impl Embedder for WrongDimensionEmbedder {
    fn embed(&self, _text: &str) -> anyhow::Result<Embedding> {
        Ok(vec![0.5; 4])
    }

    fn embed_batch(&self, texts: &[&str]) -> anyhow::Result<Vec<Embedding>> {
        Ok(texts.iter().map(|_| vec![0.5; 4]).collect())
    }

    fn dimension(&self) -> usize {
        8
    }

    fn model_name(&self) -> &str {
        "wrong-dimension"
    }
}

/// Multi-format extractor that counts extraction calls across clones
#[derive(Clone)]
pub(crate) struct CountingExtractor {
    inner: Arc<MultiFormatExtractor>,
    calls: Arc<AtomicUsize>,
}

impl CountingExtractor {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(MultiFormatExtractor::new()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DocumentExtractor for CountingExtractor {
    fn extract_pages(&self, document: &Document) -> Result<Vec<Page>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.extract_pages(document)
    }

    fn can_extract(&self, document: &Document) -> bool {
        self.inner.can_extract(document)
    }
}

/// Generator with a canned reply that records the messages it was sent
#[derive(Clone)]
pub(crate) struct ScriptedGenerator {
    reply: std::result::Result<String, String>,
    seen: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
}

impl ScriptedGenerator {
    pub(crate) fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.seen.lock().unwrap().clone()
    }
}

impl Generator for ScriptedGenerator {
    fn generate(&self, messages: &[ChatMessage], _params: &SamplingParams) -> anyhow::Result<String> {
        self.seen.lock().unwrap().push(messages.to_vec());
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(message) => Err(anyhow::anyhow!("{}", message)),
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}
