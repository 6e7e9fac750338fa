//! Per-session index state
//!
//! A session holds at most one index together with the name of the document
//! it was built from. Sessions are plain values; two sessions never share
//! state unless they are handed the same `Arc<VectorIndex>`.

use crate::retrieval::VectorIndex;
use std::sync::Arc;

/// Lifecycle of a session's index
#[derive(Debug, Clone, Default)]
pub enum SessionState {
    /// No document indexed
    #[default]
    Empty,
    /// A document is being indexed; the previous index is already gone
    Indexing { document: String },
    /// An index is available for queries
    Ready {
        document: String,
        index: Arc<VectorIndex>,
    },
}

/// Explicit session context owned by the caller
#[derive(Debug, Default)]
pub struct Session {
    state: SessionState,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The current index, if the session is ready
    pub fn index(&self) -> Option<Arc<VectorIndex>> {
        match &self.state {
            SessionState::Ready { index, .. } => Some(Arc::clone(index)),
            _ => None,
        }
    }

    /// Name of the document that is indexed or being indexed
    pub fn document_name(&self) -> Option<&str> {
        match &self.state {
            SessionState::Empty => None,
            SessionState::Indexing { document } | SessionState::Ready { document, .. } => {
                Some(document)
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, SessionState::Ready { .. })
    }

    /// Drop the index and return to `Empty`
    pub fn clear(&mut self) {
        if let Some(name) = self.document_name() {
            tracing::info!("Clearing session index for '{}'", name);
        }
        self.state = SessionState::Empty;
    }

    /// Cached index for `document`, if it is the one this session holds
    pub(crate) fn cached(&self, document: &str) -> Option<Arc<VectorIndex>> {
        match &self.state {
            SessionState::Ready { document: name, index } if name == document => {
                Some(Arc::clone(index))
            }
            _ => None,
        }
    }

    pub(crate) fn begin_indexing(&mut self, document: &str) {
        self.state = SessionState::Indexing {
            document: document.to_string(),
        };
    }

    pub(crate) fn finish_indexing(&mut self, document: String, index: Arc<VectorIndex>) {
        self.state = SessionState::Ready { document, index };
    }
}
