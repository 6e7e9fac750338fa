//! Document ingestion and chunking
//!
//! This module turns uploaded document bytes into per-page text and splits the
//! joined text into overlapping passages for embedding and retrieval.

use crate::error::{RagError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub mod chunkers;
pub mod loaders;

// Re-exports for convenience
pub use chunkers::*;
pub use loaders::*;

/// An uploaded document: raw bytes plus the name that identifies it
#[derive(Clone)]
pub struct Document {
    /// Identifying name (usually the uploaded file name)
    pub name: String,
    /// Raw file contents
    pub bytes: Vec<u8>,
}

impl Document {
    /// Create a new document
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Read a document from disk, named after its file name
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(RagError::not_found(format!("document {}", path.display())));
        }
        let bytes = fs::read(path)?;
        let name = path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());

        Ok(Self::new(name, bytes))
    }

    /// Lowercased file extension of the document name
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

// Document contents are never printed.
impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("name", &self.name)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// Text extracted from one physical page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// 1-based page number
    pub number: u32,
    /// Extracted text; empty when extraction failed
    pub text: String,
    /// Whether extraction of this page failed and was absorbed
    pub failed: bool,
}

impl Page {
    pub fn new(number: u32, text: String) -> Self {
        Self {
            number,
            text,
            failed: false,
        }
    }

    /// Placeholder for a page whose extraction failed
    pub fn failed(number: u32) -> Self {
        Self {
            number,
            text: String::new(),
            failed: true,
        }
    }
}

/// A passage of the joined document text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// The passage text
    pub content: String,
    /// Start position (in characters) in the joined document text
    pub start_pos: usize,
    /// End position (exclusive, in characters)
    pub end_pos: usize,
    /// Chunk index in the document
    pub chunk_index: usize,
}

impl Chunk {
    /// Create a new chunk
    pub fn new(content: String, start_pos: usize, end_pos: usize, chunk_index: usize) -> Self {
        Self {
            content,
            start_pos,
            end_pos,
            chunk_index,
        }
    }

    /// Length of the passage in characters
    pub fn char_len(&self) -> usize {
        self.end_pos - self.start_pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::Write;

    #[test]
    fn test_document_from_path() {
        let mut file = tempfile::NamedTempFile::with_suffix(".txt").unwrap();
        write!(file, "hello").unwrap();

        let doc = Document::from_path(file.path()).unwrap();
        assert_eq!(doc.bytes, b"hello");
        assert!(doc.name.ends_with(".txt"));
        assert_eq!(doc.extension().as_deref(), Some("txt"));
    }

    #[test]
    fn test_document_missing_path() {
        let err = Document::from_path(Path::new("/no/such/paper.pdf")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_debug_hides_contents() {
        let doc = Document::new("secret.txt", b"classified".to_vec());
        let debug = format!("{:?}", doc);
        assert!(debug.contains("secret.txt"));
        assert!(!debug.contains("classified"));
    }
}
