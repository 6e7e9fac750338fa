//! Runtime settings
//!
//! Settings are resolved in layers: built-in defaults, then an optional TOML
//! file, then environment variables.

use crate::error::{RagError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_EMBEDDING_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";
pub const DEFAULT_CHUNK_SIZE: usize = 900;
pub const DEFAULT_CHUNK_OVERLAP: usize = 150;
pub const DEFAULT_TOP_K: usize = 4;
pub const DEFAULT_GENERATOR_MODEL: &str = "mistral-small-latest";
pub const DEFAULT_GENERATOR_BASE_URL: &str = "https://api.mistral.ai/v1";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Name of the persisted index directory inside the data directory
pub const INDEX_DIR_NAME: &str = "faiss_index";

/// Placeholder values shipped in example env files; treated as "no key"
const PLACEHOLDER_KEYS: &[&str] = &["your_mistral_api_key_here", "changeme"];

/// All settings consumed by the pipeline and the CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Embedding model name recorded in every index
    pub embedding_model: String,
    /// Embedding backend: token, mock, openai or candle
    pub embedding_backend: String,
    /// Vector dimension for the hashing backends
    pub embedding_dimension: usize,
    /// Maximum passage length in characters
    pub chunk_size: usize,
    /// Overlap between consecutive passages in characters
    pub chunk_overlap: usize,
    /// Passages returned per query
    pub top_k: usize,
    /// Write the index to disk instead of keeping it in memory only
    pub persist: bool,
    /// Root directory for persisted state
    pub data_dir: PathBuf,
    /// Credential for the generative model; `None` means retrieval-only mode
    pub generator_api_key: Option<String>,
    pub generator_model: String,
    pub generator_base_url: String,
    /// Credential for hosted embeddings (openai backend)
    pub embeddings_api_key: Option<String>,
    pub embeddings_base_url: String,
    /// `dimensions` sent to the embeddings endpoint; most models reject it unless supported
    pub embeddings_dimensions: Option<usize>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_backend: "token".to_string(),
            embedding_dimension: 384,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            top_k: DEFAULT_TOP_K,
            persist: false,
            data_dir: PathBuf::from("./data"),
            generator_api_key: None,
            generator_model: DEFAULT_GENERATOR_MODEL.to_string(),
            generator_base_url: DEFAULT_GENERATOR_BASE_URL.to_string(),
            embeddings_api_key: None,
            embeddings_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            embeddings_dimensions: None,
        }
    }
}

impl Settings {
    /// Resolve settings from an optional TOML file and the process environment
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let mut settings = match config_file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        settings.apply_env(|key| std::env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read settings from a TOML file; missing keys keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(RagError::not_found(format!(
                "config file {}",
                path.display()
            )));
        }
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw)
            .map_err(|e| RagError::invalid_input(format!("bad config {}: {}", path.display(), e)))
    }

    /// Overlay values from an environment lookup function
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("EMBEDDINGS_MODEL") {
            self.embedding_model = v;
        }
        if let Some(v) = lookup("EMBEDDINGS_BACKEND") {
            self.embedding_backend = v;
        }
        if let Some(v) = lookup("CHUNK_SIZE") {
            self.chunk_size = parse_number("CHUNK_SIZE", &v)?;
        }
        if let Some(v) = lookup("CHUNK_OVERLAP") {
            self.chunk_overlap = parse_number("CHUNK_OVERLAP", &v)?;
        }
        if let Some(v) = lookup("TOP_K") {
            self.top_k = parse_number("TOP_K", &v)?;
        }
        if let Some(v) = lookup("PERSIST_INDEX") {
            self.persist = matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(v) = lookup("DATA_DIR") {
            self.data_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("MISTRAL_API_KEY") {
            self.generator_api_key = Some(v);
        }
        if let Some(v) = lookup("MISTRAL_MODEL") {
            self.generator_model = v;
        }
        if let Some(v) = lookup("MISTRAL_BASE_URL") {
            self.generator_base_url = v;
        }
        if let Some(v) = lookup("OPENAI_API_KEY") {
            self.embeddings_api_key = Some(v);
        }
        if let Some(v) = lookup("OPENAI_BASE_URL") {
            self.embeddings_base_url = v;
        }
        if let Some(v) = lookup("OPENAI_EMBEDDING_DIMENSIONS") {
            self.embeddings_dimensions = Some(parse_number("OPENAI_EMBEDDING_DIMENSIONS", &v)?);
        }
        Ok(())
    }

    /// Reject combinations the chunker and retriever cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RagError::invalid_input("chunk_size must be greater than zero"));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::invalid_input(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(RagError::invalid_input("top_k must be greater than zero"));
        }
        Ok(())
    }

    /// Fixed location of the persisted index
    pub fn index_dir(&self) -> PathBuf {
        self.data_dir.join(INDEX_DIR_NAME)
    }

    /// The generator credential, if one is usable
    pub fn generator_key(&self) -> Option<&str> {
        self.generator_api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty() && !PLACEHOLDER_KEYS.contains(key))
    }
}

fn parse_number(key: &str, value: &str) -> Result<usize> {
    value
        .trim()
        .parse()
        .map_err(|_| RagError::invalid_input(format!("{} must be a number, got '{}'", key, value)))
}
