//! Document ingestion
//!
//! Runs extraction, chunking and embedding for a document and stores the
//! resulting index in a [`Session`]. Re-uploading the document a session
//! already holds is free; with persistence enabled an index written by an
//! earlier run is restored instead of rebuilt.

mod session;

pub use session::{Session, SessionState};

use crate::config::Settings;
use crate::data::{
    join_pages, ChunkConfig, Chunker, Document, DocumentExtractor, MultiFormatExtractor,
    RecursiveChunker,
};
use crate::embedding::Embedder;
use crate::error::{ErrorKind, RagError, Result};
use crate::retrieval::VectorIndex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Per-call ingestion options
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Ignore the session cache and any persisted index
    pub force_rebuild: bool,
    /// Restore from and write to `index_dir`
    pub persist: bool,
    /// Location of the persisted index
    pub index_dir: PathBuf,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            force_rebuild: false,
            persist: false,
            index_dir: Settings::default().index_dir(),
        }
    }
}

impl IngestOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            force_rebuild: false,
            persist: settings.persist,
            index_dir: settings.index_dir(),
        }
    }

    pub fn with_force_rebuild(mut self, force: bool) -> Self {
        self.force_rebuild = force;
        self
    }

    pub fn with_persist(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }
}

/// Extractor, chunker and embedder wired together
pub struct IngestionPipeline {
    extractor: Box<dyn DocumentExtractor>,
    chunker: RecursiveChunker,
    embedder: Arc<dyn Embedder>,
}

impl IngestionPipeline {
    pub fn new(
        extractor: Box<dyn DocumentExtractor>,
        chunk_config: ChunkConfig,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            extractor,
            chunker: RecursiveChunker::new(chunk_config),
            embedder,
        }
    }

    /// Pipeline for all supported formats with the configured chunk sizes
    pub fn from_settings(settings: &Settings, embedder: Arc<dyn Embedder>) -> Self {
        Self::new(
            Box::new(MultiFormatExtractor::new()),
            ChunkConfig::new(settings.chunk_size, settings.chunk_overlap),
            embedder,
        )
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// Index `document` into `session`
    ///
    /// On failure the session is left `Empty` and the error is returned.
    pub fn ingest(
        &self,
        session: &mut Session,
        document: Document,
        options: &IngestOptions,
    ) -> Result<Arc<VectorIndex>> {
        if !options.force_rebuild {
            if let Some(index) = session.cached(&document.name) {
                tracing::info!("Reusing session index for '{}'", document.name);
                return Ok(index);
            }
        }

        session.begin_indexing(&document.name);
        let start = Instant::now();

        match self.load_or_build(&document, options) {
            Ok(index) => {
                let index = Arc::new(index);
                tracing::info!(
                    "Document '{}' ready: {} passages in {}ms",
                    document.name,
                    index.len(),
                    start.elapsed().as_millis()
                );
                session.finish_indexing(document.name, Arc::clone(&index));
                Ok(index)
            }
            Err(e) => {
                tracing::warn!("Ingestion of '{}' failed: {}", document.name, e);
                session.clear();
                Err(e)
            }
        }
    }

    fn load_or_build(&self, document: &Document, options: &IngestOptions) -> Result<VectorIndex> {
        if options.persist && !options.force_rebuild {
            match VectorIndex::restore(&options.index_dir, self.embedder.as_ref()) {
                Ok(index) => return Ok(index),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    tracing::debug!("No persisted index at {:?}", options.index_dir);
                }
                Err(e) => {
                    tracing::warn!("Persisted index unusable, rebuilding: {}", e);
                }
            }
        }

        let index = self.build(document)?;

        if options.persist {
            index.persist(&options.index_dir)?;
        }
        Ok(index)
    }

    /// Extract, chunk and embed without touching any cache
    pub fn build(&self, document: &Document) -> Result<VectorIndex> {
        let pages = self.extractor.extract_pages(document)?;
        let text = join_pages(&pages);
        if text.trim().is_empty() {
            return Err(RagError::invalid_input(format!(
                "'{}' contains no extractable text",
                document.name
            )));
        }

        let chunks = self.chunker.chunk(&text)?;
        Ok(VectorIndex::build(chunks, self.embedder.as_ref())?.with_document(&document.name))
    }
}

/// Delete a persisted index directory
pub fn clear_persisted(index_dir: &Path) -> Result<()> {
    if !index_dir.exists() {
        return Err(RagError::not_found(format!("index directory {:?}", index_dir)));
    }
    std::fs::remove_dir_all(index_dir)?;
    tracing::info!("Removed persisted index at {:?}", index_dir);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loaders::tests::build_pdf;
    use crate::retrieval::{DenseRetriever, Retriever, METADATA_FILE, VECTORS_FILE};
    use crate::testing::{CountingEmbedder, CountingExtractor};
    use tempfile::tempdir;

    struct Fixture {
        pipeline: IngestionPipeline,
        extractor: CountingExtractor,
        embedder: Arc<CountingEmbedder>,
    }

    fn fixture(chunk_size: usize, overlap: usize) -> Fixture {
        let extractor = CountingExtractor::new();
        let embedder = Arc::new(CountingEmbedder::new(64));
        let pipeline = IngestionPipeline::new(
            Box::new(extractor.clone()),
            ChunkConfig::new(chunk_size, overlap),
            embedder.clone(),
        );
        Fixture {
            pipeline,
            extractor,
            embedder,
        }
    }

    fn text_doc(name: &str, text: &str) -> Document {
        Document::new(name, text.as_bytes().to_vec())
    }

    const CATS: &str = "Cats are mammals. Dogs are mammals too. Birds are not mammals.";

    #[test]
    fn test_ingest_pdf_end_to_end() {
        let f = fixture(40, 10);
        let mut session = Session::new();
        let doc = Document::new(
            "animals.pdf",
            build_pdf(&["Cats are mammals.", "Dogs are mammals too."]),
        );

        let index = f.pipeline.ingest(&mut session, doc, &IngestOptions::default()).unwrap();

        assert!(session.is_ready());
        assert_eq!(session.document_name(), Some("animals.pdf"));
        assert_eq!(index.metadata().document.as_deref(), Some("animals.pdf"));
        let all: String = index.chunks().iter().map(|c| c.content.as_str()).collect();
        assert!(all.contains("Cats are mammals."));
        assert!(all.contains("Dogs are mammals too."));
    }

    #[test]
    fn test_same_document_uses_session_cache() {
        let f = fixture(40, 10);
        let mut session = Session::new();
        let options = IngestOptions::default();

        let first = f.pipeline.ingest(&mut session, text_doc("a.txt", CATS), &options).unwrap();
        let extract_calls = f.extractor.calls();
        let embed_calls = f.embedder.calls();

        let second = f.pipeline.ingest(&mut session, text_doc("a.txt", CATS), &options).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(f.extractor.calls(), extract_calls);
        assert_eq!(f.embedder.calls(), embed_calls);
    }

    #[test]
    fn test_force_rebuild_bypasses_cache() {
        let f = fixture(40, 10);
        let mut session = Session::new();

        let first = f
            .pipeline
            .ingest(&mut session, text_doc("a.txt", CATS), &IngestOptions::default())
            .unwrap();
        let rebuilt = f
            .pipeline
            .ingest(
                &mut session,
                text_doc("a.txt", CATS),
                &IngestOptions::default().with_force_rebuild(true),
            )
            .unwrap();

        assert_eq!(f.extractor.calls(), 2);
        assert!(!Arc::ptr_eq(&first, &rebuilt));
        assert_eq!(first.chunks(), rebuilt.chunks());
        assert_eq!(first.vectors(), rebuilt.vectors());
    }

    #[test]
    fn test_new_document_replaces_index() {
        let f = fixture(40, 10);
        let mut session = Session::new();
        let options = IngestOptions::default();

        f.pipeline.ingest(&mut session, text_doc("a.txt", CATS), &options).unwrap();
        let index = f
            .pipeline
            .ingest(&mut session, text_doc("b.txt", "Water boils at 100 degrees."), &options)
            .unwrap();

        assert_eq!(session.document_name(), Some("b.txt"));
        assert_eq!(index.len(), 1);
        assert_eq!(f.extractor.calls(), 2);
    }

    #[test]
    fn test_failed_ingest_leaves_session_empty() {
        let f = fixture(40, 10);
        let mut session = Session::new();
        let options = IngestOptions::default();

        f.pipeline.ingest(&mut session, text_doc("a.txt", CATS), &options).unwrap();
        let err = f
            .pipeline
            .ingest(&mut session, Document::new("bad.pdf", b"not a pdf".to_vec()), &options)
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ExtractionFailure);
        assert!(matches!(session.state(), SessionState::Empty));
        assert!(session.index().is_none());
    }

    #[test]
    fn test_document_without_text_is_invalid() {
        let f = fixture(40, 10);
        let mut session = Session::new();

        let err = f
            .pipeline
            .ingest(&mut session, text_doc("blank.txt", "  \n\n "), &IngestOptions::default())
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(f.embedder.calls(), 0);
    }

    #[test]
    fn test_memory_mode_writes_nothing() {
        let dir = tempdir().unwrap();
        let index_dir = dir.path().join("faiss_index");
        let f = fixture(40, 10);
        let mut session = Session::new();
        let options = IngestOptions {
            index_dir: index_dir.clone(),
            ..Default::default()
        };

        f.pipeline.ingest(&mut session, text_doc("a.txt", CATS), &options).unwrap();
        assert!(!index_dir.exists());
    }

    #[test]
    fn test_persisted_index_is_restored() {
        let dir = tempdir().unwrap();
        let options = IngestOptions {
            persist: true,
            index_dir: dir.path().join("faiss_index"),
            ..Default::default()
        };

        let first = fixture(40, 10);
        let built = first
            .pipeline
            .ingest(&mut Session::new(), text_doc("a.txt", CATS), &options)
            .unwrap();
        assert!(options.index_dir.join(METADATA_FILE).is_file());
        assert!(options.index_dir.join(VECTORS_FILE).is_file());

        let second = fixture(40, 10);
        let mut session = Session::new();
        let restored = second
            .pipeline
            .ingest(&mut session, text_doc("a.txt", CATS), &options)
            .unwrap();

        assert_eq!(second.extractor.calls(), 0);
        assert_eq!(restored.chunks(), built.chunks());
        assert!(session.is_ready());

        let retriever = DenseRetriever::new(restored, second.embedder.clone()).unwrap();
        let results = retriever.retrieve("Which animals are mammals?", 2).unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_corrupt_persisted_index_falls_back_to_rebuild() {
        let dir = tempdir().unwrap();
        let options = IngestOptions {
            persist: true,
            index_dir: dir.path().join("faiss_index"),
            ..Default::default()
        };

        fixture(40, 10)
            .pipeline
            .ingest(&mut Session::new(), text_doc("a.txt", CATS), &options)
            .unwrap();
        std::fs::write(options.index_dir.join(VECTORS_FILE), b"junk").unwrap();

        let f = fixture(40, 10);
        let index = f
            .pipeline
            .ingest(&mut Session::new(), text_doc("a.txt", CATS), &options)
            .unwrap();

        assert_eq!(f.extractor.calls(), 1);
        assert!(VectorIndex::restore(&options.index_dir, f.embedder.as_ref()).is_ok());
        assert!(index.len() >= 2);
    }

    #[test]
    fn test_force_rebuild_ignores_persisted_index() {
        let dir = tempdir().unwrap();
        let options = IngestOptions {
            persist: true,
            index_dir: dir.path().join("faiss_index"),
            ..Default::default()
        };

        fixture(40, 10)
            .pipeline
            .ingest(&mut Session::new(), text_doc("a.txt", CATS), &options)
            .unwrap();

        let f = fixture(40, 10);
        f.pipeline
            .ingest(
                &mut Session::new(),
                text_doc("a.txt", CATS),
                &options.clone().with_force_rebuild(true),
            )
            .unwrap();
        assert_eq!(f.extractor.calls(), 1);
    }

    #[test]
    fn test_clear_persisted() {
        let dir = tempdir().unwrap();
        let options = IngestOptions {
            persist: true,
            index_dir: dir.path().join("faiss_index"),
            ..Default::default()
        };
        fixture(40, 10)
            .pipeline
            .ingest(&mut Session::new(), text_doc("a.txt", CATS), &options)
            .unwrap();

        clear_persisted(&options.index_dir).unwrap();
        assert!(!options.index_dir.exists());

        let err = clear_persisted(&options.index_dir).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_options_from_settings() {
        let settings = Settings {
            persist: true,
            data_dir: PathBuf::from("/srv/pw"),
            ..Default::default()
        };
        let options = IngestOptions::from_settings(&settings);

        assert!(options.persist);
        assert!(!options.force_rebuild);
        assert_eq!(options.index_dir, PathBuf::from("/srv/pw/faiss_index"));
    }
}
