//! Error types for the retrieval pipeline
//!
//! Backends (embedders, generators) report failures as `anyhow::Error`; the
//! pipeline converts them into [`RagError::ServiceFailure`] at the boundary so
//! callers can match on a small, fixed set of kinds.

use thiserror::Error;

/// Errors produced by the retrieval pipeline
#[derive(Error, Debug)]
pub enum RagError {
    /// A document, index directory or session index is missing
    #[error("not found: {0}")]
    NotFound(String),

    /// Empty query, empty text, bad chunking parameters and similar caller mistakes
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The document could not be parsed at all
    #[error("extraction failed: {0}")]
    ExtractionFailure(String),

    /// No generative-model credential is configured
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// An embedding or generation call failed
    #[error("service failure: {message}")]
    ServiceFailure {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Coarse classification of a [`RagError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidInput,
    ExtractionFailure,
    ModelUnavailable,
    ServiceFailure,
    Io,
    Serialization,
}

pub type Result<T> = std::result::Result<T, RagError>;

impl RagError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::ExtractionFailure(msg.into())
    }

    pub fn model_unavailable(msg: impl Into<String>) -> Self {
        Self::ModelUnavailable(msg.into())
    }

    /// Wrap a backend error with a short description of the failed call
    pub fn service(message: impl Into<String>, source: anyhow::Error) -> Self {
        Self::ServiceFailure {
            message: format!("{}: {:#}", message.into(), source),
            source: Some(source.into()),
        }
    }

    /// Service failure without an underlying error value
    pub fn service_msg(message: impl Into<String>) -> Self {
        Self::ServiceFailure {
            message: message.into(),
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::ExtractionFailure(_) => ErrorKind::ExtractionFailure,
            Self::ModelUnavailable(_) => ErrorKind::ModelUnavailable,
            Self::ServiceFailure { .. } => ErrorKind::ServiceFailure,
            Self::Io(_) => ErrorKind::Io,
            Self::Serialization(_) => ErrorKind::Serialization,
        }
    }
}
