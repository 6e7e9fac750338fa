//! Dense retrieval over an exact vector index
//!
//! Vectors are kept in a flat, position-aligned table next to their passages
//! and searched by brute-force Euclidean distance. Documents produce at most a
//! few thousand passages, so an exact scan is fast and gives stable,
//! reproducible rankings.

use crate::data::Chunk;
use crate::embedding::{euclidean_distance, Embedder, Embedding};
use crate::error::{RagError, Result};
use crate::retrieval::SearchResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const METADATA_FILE: &str = "metadata.json";
pub const VECTORS_FILE: &str = "vectors.bin";
pub const PASSAGES_FILE: &str = "passages.json";

/// Index metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMetadata {
    /// Model name used for embeddings
    pub model_name: String,
    /// Embedding dimension
    pub dimension: usize,
    /// Number of chunks indexed
    pub num_chunks: usize,
    /// Index creation timestamp
    pub created_at: DateTime<Utc>,
    /// Name of the source document
    #[serde(default)]
    pub document: Option<String>,
}

/// Flat vector index: one vector per passage, aligned by position
#[derive(Debug, Clone)]
pub struct VectorIndex {
    vectors: Vec<Embedding>,
    chunks: Vec<Chunk>,
    metadata: IndexMetadata,
}

impl VectorIndex {
    /// Embed every passage and build the index
    pub fn build(chunks: Vec<Chunk>, embedder: &dyn Embedder) -> Result<Self> {
        if chunks.is_empty() {
            return Err(RagError::invalid_input("cannot build an index without passages"));
        }

        let dimension = embedder.dimension();
        tracing::debug!(
            "Building vector index: {} chunks, {} dimensions",
            chunks.len(),
            dimension
        );

        let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        let vectors = embedder
            .embed_batch(&texts)
            .map_err(|e| RagError::service("failed to embed passages", e))?;

        if vectors.len() != chunks.len() {
            return Err(RagError::service_msg(format!(
                "embedder returned {} vectors for {} passages",
                vectors.len(),
                chunks.len()
            )));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(RagError::service_msg(format!(
                "embedder returned a vector of dimension {}, expected {}",
                bad.len(),
                dimension
            )));
        }

        let metadata = IndexMetadata {
            model_name: embedder.model_name().to_string(),
            dimension,
            num_chunks: chunks.len(),
            created_at: Utc::now(),
            document: None,
        };

        tracing::info!("Vector index built: {} passages", chunks.len());

        Ok(Self {
            vectors,
            chunks,
            metadata,
        })
    }

    /// Record the source document name in the metadata
    pub fn with_document(mut self, name: impl Into<String>) -> Self {
        self.metadata.document = Some(name.into());
        self
    }

    /// Exact nearest-neighbour search
    ///
    /// Results are sorted by ascending distance; equal distances keep index
    /// order. At most `min(k, len)` results are returned.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        if query.len() != self.metadata.dimension {
            return Err(RagError::invalid_input(format!(
                "query vector has dimension {}, index expects {}",
                query.len(),
                self.metadata.dimension
            )));
        }

        let k = k.min(self.vectors.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .map(|v| euclidean_distance(query, v))
            .enumerate()
            .collect();
        // Stable sort keeps ties in insertion order
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));

        let results: Vec<SearchResult> = scored
            .into_iter()
            .take(k)
            .enumerate()
            .map(|(rank, (position, distance))| SearchResult {
                chunk: self.chunks[position].clone(),
                distance,
                rank: rank + 1,
                position,
            })
            .collect();

        tracing::debug!(
            "Search returned {} of {} passages (best distance {:.4})",
            results.len(),
            self.vectors.len(),
            results[0].distance
        );
        Ok(results)
    }

    /// Check that queries embedded with `embedder` are comparable with this index
    pub fn ensure_compatible(&self, embedder: &dyn Embedder) -> Result<()> {
        if embedder.model_name() != self.metadata.model_name {
            return Err(RagError::invalid_input(format!(
                "index was built with model '{}' but the embedder is '{}'",
                self.metadata.model_name,
                embedder.model_name()
            )));
        }
        if embedder.dimension() != self.metadata.dimension {
            return Err(RagError::invalid_input(format!(
                "index dimension {} does not match embedder dimension {}",
                self.metadata.dimension,
                embedder.dimension()
            )));
        }
        Ok(())
    }

    /// Write the index into `dir`, creating it if needed
    pub fn persist(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;

        fs::write(
            dir.join(METADATA_FILE),
            serde_json::to_string_pretty(&self.metadata)?,
        )?;
        fs::write(dir.join(VECTORS_FILE), vectors_to_bytes(&self.vectors))?;
        fs::write(dir.join(PASSAGES_FILE), serde_json::to_string(&self.chunks)?)?;

        tracing::info!(
            "Vector index persisted to {:?} ({} passages)",
            dir,
            self.chunks.len()
        );
        Ok(())
    }

    /// Load an index written by [`VectorIndex::persist`]
    ///
    /// The embedder must be the one the index was built with.
    pub fn restore(dir: &Path, embedder: &dyn Embedder) -> Result<Self> {
        if !dir.is_dir() {
            return Err(RagError::not_found(format!("index directory {:?}", dir)));
        }
        for file in [METADATA_FILE, VECTORS_FILE, PASSAGES_FILE] {
            if !dir.join(file).is_file() {
                return Err(RagError::not_found(format!("{} in {:?}", file, dir)));
            }
        }

        let metadata: IndexMetadata = serde_json::from_str(&fs::read_to_string(
            dir.join(METADATA_FILE),
        )?)
        .map_err(|e| RagError::service_msg(format!("corrupt index metadata: {}", e)))?;

        if metadata.model_name != embedder.model_name() {
            return Err(RagError::invalid_input(format!(
                "persisted index was built with model '{}' but the embedder is '{}'",
                metadata.model_name,
                embedder.model_name()
            )));
        }

        if metadata.dimension != embedder.dimension() {
            return Err(RagError::service_msg(format!(
                "corrupt index metadata: dimension {} but model '{}' produces {}",
                metadata.dimension,
                metadata.model_name,
                embedder.dimension()
            )));
        }

        let bytes = fs::read(dir.join(VECTORS_FILE))?;
        let vectors = bytes_to_vectors(&bytes, metadata.dimension, metadata.num_chunks)?;

        let chunks: Vec<Chunk> = serde_json::from_str(&fs::read_to_string(
            dir.join(PASSAGES_FILE),
        )?)
        .map_err(|e| RagError::service_msg(format!("corrupt passage file: {}", e)))?;
        if chunks.len() != metadata.num_chunks {
            return Err(RagError::service_msg(format!(
                "passage file holds {} passages, metadata says {}",
                chunks.len(),
                metadata.num_chunks
            )));
        }

        let index = Self {
            vectors,
            chunks,
            metadata,
        };
        index.ensure_compatible(embedder)?;

        tracing::info!(
            "Vector index restored from {:?} ({} passages)",
            dir,
            index.len()
        );
        Ok(index)
    }

    pub fn metadata(&self) -> &IndexMetadata {
        &self.metadata
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn vectors(&self) -> &[Embedding] {
        &self.vectors
    }

    pub fn dimension(&self) -> usize {
        self.metadata.dimension
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Row-major little-endian f32
fn vectors_to_bytes(vectors: &[Embedding]) -> Vec<u8> {
    vectors
        .iter()
        .flat_map(|v| v.iter().flat_map(|x| x.to_le_bytes()))
        .collect()
}

fn bytes_to_vectors(bytes: &[u8], dimension: usize, count: usize) -> Result<Vec<Embedding>> {
    let expected = dimension
        .checked_mul(count)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| {
            RagError::service_msg(format!(
                "corrupt vector data: {} vectors of dimension {} overflow",
                count, dimension
            ))
        })?;
    if dimension == 0 || bytes.len() != expected {
        return Err(RagError::service_msg(format!(
            "corrupt vector data: {} bytes, expected {} ({} vectors of dimension {})",
            bytes.len(),
            expected,
            count,
            dimension
        )));
    }

    Ok(bytes
        .chunks_exact(dimension * 4)
        .map(|row| {
            row.chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect()
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{EmbeddingConfig, MockEmbedder, TokenEmbedder};
    use crate::error::ErrorKind;
    use crate::testing::{chunks_from, FailingEmbedder, WrongDimensionEmbedder};
    use tempfile::tempdir;

    fn mock(model: &str) -> MockEmbedder {
        MockEmbedder::new(EmbeddingConfig::default().with_model(model).with_dimension(16))
    }

    fn sample_index() -> VectorIndex {
        let chunks = chunks_from(&[
            "Rust is a systems programming language",
            "Python is great for data science",
            "The Eiffel tower is in Paris",
            "Borrowing rules prevent data races",
        ]);
        VectorIndex::build(chunks, &TokenEmbedder::new(64)).unwrap()
    }

    #[test]
    fn test_build_aligns_vectors_and_passages() {
        let index = sample_index();

        assert_eq!(index.len(), 4);
        assert_eq!(index.vectors().len(), 4);
        assert_eq!(index.metadata().num_chunks, 4);
        assert_eq!(index.metadata().dimension, 64);
        assert_eq!(index.metadata().model_name, "token-hash-64");
    }

    #[test]
    fn test_search_length_and_order() {
        let index = sample_index();
        let embedder = TokenEmbedder::new(64);
        let query = embedder.embed("data science with Python").unwrap();

        for k in [1, 2, 4, 10] {
            let results = index.search(&query, k).unwrap();
            assert_eq!(results.len(), k.min(4));
            for pair in results.windows(2) {
                assert!(pair[0].distance <= pair[1].distance);
            }
            for (i, r) in results.iter().enumerate() {
                assert_eq!(r.rank, i + 1);
                assert_eq!(index.chunks()[r.position], r.chunk);
            }
        }

        let best = index.search(&query, 1).unwrap();
        assert_eq!(best[0].position, 1);
    }

    #[test]
    fn test_search_k_zero_is_empty() {
        let index = sample_index();
        let query = TokenEmbedder::new(64).embed("anything").unwrap();
        assert!(index.search(&query, 0).unwrap().is_empty());
    }

    #[test]
    fn test_search_ties_keep_index_order() {
        let chunks = chunks_from(&["same text", "other words here", "same text", "same text"]);
        let embedder = TokenEmbedder::new(32);
        let index = VectorIndex::build(chunks, &embedder).unwrap();

        let query = embedder.embed("same text").unwrap();
        let results = index.search(&query, 3).unwrap();

        let positions: Vec<usize> = results.iter().map(|r| r.position).collect();
        assert_eq!(positions, vec![0, 2, 3]);
    }

    #[test]
    fn test_search_wrong_dimension() {
        let index = sample_index();
        let err = index.search(&[0.5; 8], 2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_build_rejects_empty() {
        let err = VectorIndex::build(Vec::new(), &TokenEmbedder::new(8)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_build_embedding_failure() {
        let err = VectorIndex::build(chunks_from(&["text"]), &FailingEmbedder).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ServiceFailure);
        assert!(err.to_string().contains("failed to embed passages"));
    }

    #[test]
    fn test_build_wrong_vector_dimension() {
        let err = VectorIndex::build(chunks_from(&["text"]), &WrongDimensionEmbedder).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ServiceFailure);
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let a = sample_index();
        let b = sample_index();

        assert_eq!(a.vectors(), b.vectors());
        assert_eq!(a.chunks(), b.chunks());
    }

    #[test]
    fn test_persist_restore_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("faiss_index");
        let embedder = TokenEmbedder::new(64);
        let index = sample_index().with_document("paper.pdf");

        index.persist(&path).unwrap();
        let restored = VectorIndex::restore(&path, &embedder).unwrap();

        assert_eq!(restored.metadata(), index.metadata());
        assert_eq!(restored.chunks(), index.chunks());
        assert_eq!(restored.vectors(), index.vectors());

        let query = embedder.embed("systems programming").unwrap();
        let before: Vec<usize> = index.search(&query, 4).unwrap().iter().map(|r| r.position).collect();
        let after: Vec<usize> = restored.search(&query, 4).unwrap().iter().map(|r| r.position).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_restore_missing_directory() {
        let dir = tempdir().unwrap();
        let err = VectorIndex::restore(&dir.path().join("nope"), &mock("m")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_restore_missing_file() {
        let dir = tempdir().unwrap();
        let index = VectorIndex::build(chunks_from(&["a", "b"]), &mock("m")).unwrap();
        index.persist(dir.path()).unwrap();
        fs::remove_file(dir.path().join(PASSAGES_FILE)).unwrap();

        let err = VectorIndex::restore(dir.path(), &mock("m")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_restore_model_mismatch() {
        let dir = tempdir().unwrap();
        let index = VectorIndex::build(chunks_from(&["a", "b"]), &mock("model-a")).unwrap();
        index.persist(dir.path()).unwrap();

        let err = VectorIndex::restore(dir.path(), &mock("model-b")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_restore_truncated_vectors() {
        let dir = tempdir().unwrap();
        let index = VectorIndex::build(chunks_from(&["a", "b"]), &mock("m")).unwrap();
        index.persist(dir.path()).unwrap();

        let bytes = fs::read(dir.path().join(VECTORS_FILE)).unwrap();
        fs::write(dir.path().join(VECTORS_FILE), &bytes[..bytes.len() - 3]).unwrap();

        let err = VectorIndex::restore(dir.path(), &mock("m")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ServiceFailure);
        assert!(err.to_string().contains("corrupt vector data"));
    }

    #[test]
    fn test_restore_corrupt_dimension() {
        let dir = tempdir().unwrap();
        let index = VectorIndex::build(chunks_from(&["a", "b"]), &mock("m")).unwrap();
        index.persist(dir.path()).unwrap();

        let path = dir.path().join(METADATA_FILE);
        let mut metadata: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        metadata["dimension"] = serde_json::json!((usize::MAX / 2) as u64);
        fs::write(&path, metadata.to_string()).unwrap();

        let err = VectorIndex::restore(dir.path(), &mock("m")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ServiceFailure);
        assert!(err.to_string().contains("corrupt index metadata"));
    }

    #[test]
    fn test_bytes_to_vectors_overflow() {
        let err = bytes_to_vectors(&[0u8; 8], usize::MAX / 2, 3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ServiceFailure);
        assert!(err.to_string().contains("overflow"));

        let vectors = bytes_to_vectors(&[0u8; 16], 2, 2).unwrap();
        assert_eq!(vectors, vec![vec![0.0, 0.0], vec![0.0, 0.0]]);
    }

    #[test]
    fn test_ensure_compatible() {
        let index = VectorIndex::build(chunks_from(&["a"]), &mock("m")).unwrap();

        assert!(index.ensure_compatible(&mock("m")).is_ok());
        assert_eq!(
            index.ensure_compatible(&mock("other")).unwrap_err().kind(),
            ErrorKind::InvalidInput
        );
        let wider = MockEmbedder::new(EmbeddingConfig::default().with_model("m").with_dimension(32));
        assert_eq!(
            index.ensure_compatible(&wider).unwrap_err().kind(),
            ErrorKind::InvalidInput
        );
    }
}
