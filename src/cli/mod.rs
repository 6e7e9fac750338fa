//! Command-line interface
//!
//! Provides CLI commands for ingest, query, ask and clear. Each command
//! indexes the input document in a fresh session; the heavy lifting runs on
//! the blocking pool under a timeout.

use crate::config::Settings;
use crate::data::Document;
use crate::embedding::{create_embedder, Embedder, EmbeddingConfig};
use crate::error::{ErrorKind, RagError};
use crate::ingest::{clear_persisted, IngestOptions, IngestionPipeline, Session};
use crate::rag::{AnswerSynthesizer, RagPipeline, Source};
use anyhow::{Context, Result};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Length of passage previews printed by `query`
const PREVIEW_CHARS: usize = 300;

/// Drive `future` to completion on a fresh multi-threaded runtime
///
/// Blocking tasks still running when `future` resolves (a timed-out
/// ingestion, say) are abandoned instead of joined, so the process can exit.
pub fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;

    let output = runtime.block_on(future);
    runtime.shutdown_background();
    Ok(output)
}

/// Run `work` on the blocking pool, giving up after `timeout`
async fn run_blocking<T, F>(label: &str, timeout: Duration, work: F) -> Result<T>
where
    F: FnOnce() -> crate::error::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let handle = tokio::task::spawn_blocking(work);
    let joined = tokio::time::timeout(timeout, handle)
        .await
        .map_err(|_| anyhow::anyhow!("{} timed out after {:?}", label, timeout))?;

    joined
        .with_context(|| format!("{} task panicked", label))?
        .with_context(|| format!("{} failed", label))
}

/// Build the configured embedder, mapping backend errors into the core error type
fn build_embedder(settings: &Settings) -> crate::error::Result<Arc<dyn Embedder>> {
    create_embedder(
        &settings.embedding_backend,
        EmbeddingConfig::from_settings(settings),
    )
    .map_err(|e| RagError::service("failed to set up the embedder", e))
}

/// Index `input` into a new session
fn index_document(
    settings: &Settings,
    input: &Path,
    options: &IngestOptions,
) -> crate::error::Result<(Session, Arc<dyn Embedder>)> {
    let embedder = build_embedder(settings)?;
    let pipeline = IngestionPipeline::from_settings(settings, Arc::clone(&embedder));
    let document = Document::from_path(input)?;

    let mut session = Session::new();
    pipeline.ingest(&mut session, document, options)?;
    Ok((session, embedder))
}

/// Execute the ingest command
pub async fn ingest(
    settings: Settings,
    input: PathBuf,
    persist: bool,
    force_rebuild: bool,
    timeout: Duration,
) -> Result<()> {
    tracing::info!("Starting ingestion");
    tracing::info!("  Input: {}", input.display());
    tracing::info!("  Backend: {}", settings.embedding_backend);
    tracing::info!(
        "  Chunk size: {} (overlap {})",
        settings.chunk_size,
        settings.chunk_overlap
    );

    let options = IngestOptions::from_settings(&settings)
        .with_persist(settings.persist || persist)
        .with_force_rebuild(force_rebuild);
    let index_dir = options.index_dir.clone();
    let persisted = options.persist;

    let (session, _) = run_blocking("ingestion", timeout, move || {
        index_document(&settings, &input, &options)
    })
    .await?;

    let index = session
        .index()
        .context("ingestion finished without an index")?;
    let metadata = index.metadata();

    println!("\nIngestion Summary:");
    println!("  Document: {}", session.document_name().unwrap_or("-"));
    println!("  Passages indexed: {}", index.len());
    println!(
        "  Embedding model: {} ({} dims)",
        metadata.model_name, metadata.dimension
    );
    if persisted {
        println!("  Index directory: {}", index_dir.display());
    } else {
        println!("  Index kept in memory only");
    }

    Ok(())
}

/// Execute the query command: retrieval only
pub async fn query(
    settings: Settings,
    input: PathBuf,
    query: String,
    top_k: Option<usize>,
    timeout: Duration,
) -> Result<()> {
    let top_k = top_k.unwrap_or(settings.top_k);
    tracing::info!("Running retrieval (top_k={})", top_k);

    let sources = run_blocking("retrieval", timeout, move || {
        let options = IngestOptions::from_settings(&settings);
        let (session, embedder) = index_document(&settings, &input, &options)?;

        let pipeline = RagPipeline::new(embedder, AnswerSynthesizer::new(None));
        let results = pipeline.retrieve(&session, &query, top_k)?;
        Ok(results.iter().map(Source::from_result).collect::<Vec<_>>())
    })
    .await?;

    println!("\nTop {} passages:", sources.len());
    for (i, source) in sources.iter().enumerate() {
        println!(
            "\n[{}] passage {} (similarity: {:.1}%, distance: {:.4})",
            i + 1,
            source.chunk_index + 1,
            source.similarity() * 100.0,
            source.distance
        );
        println!("{}", source.snippet(PREVIEW_CHARS));
    }

    Ok(())
}

/// Execute the ask command: retrieval plus answer generation
pub async fn ask(
    settings: Settings,
    input: PathBuf,
    query: String,
    top_k: Option<usize>,
    timeout: Duration,
) -> Result<()> {
    let top_k = top_k.unwrap_or(settings.top_k);
    tracing::info!("Answering question (top_k={})", top_k);

    let response = run_blocking("question answering", timeout, move || {
        let synthesizer = AnswerSynthesizer::from_settings(&settings)?;
        let options = IngestOptions::from_settings(&settings);
        let (session, embedder) = index_document(&settings, &input, &options)?;

        RagPipeline::new(embedder, synthesizer).ask(&session, &query, top_k)
    })
    .await?;

    println!("\n{}", response);
    Ok(())
}

/// Execute the clear command
pub async fn clear(settings: Settings) -> Result<()> {
    let index_dir = settings.index_dir();

    match clear_persisted(&index_dir) {
        Ok(()) => println!("Removed persisted index at {}", index_dir.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            println!("No persisted index at {}", index_dir.display())
        }
        Err(e) => {
            return Err(e).with_context(|| {
                format!("failed to remove index at {}", index_dir.display())
            })
        }
    }

    Ok(())
}
