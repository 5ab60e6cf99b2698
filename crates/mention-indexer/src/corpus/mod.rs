//! The document corpus boundary.
//!
//! The engine never touches documents directly; it asks a [`DocumentStore`]
//! to list them and serve their content, and consumes [`CorpusEvent`]s that
//! describe mutations.

mod filter;
mod fs;
mod memory;
mod walker;

pub use filter::IgnoreFilter;
pub use fs::{relative_path, FsDocumentStore};
pub use memory::MemoryDocumentStore;
pub use walker::{FileEntry, Walker};

use crate::IndexerError;
use async_trait::async_trait;

/// A document known to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMeta {
    /// Corpus-relative path with `/` separators
    pub path: String,
    /// Modification time (milliseconds since the Unix epoch)
    pub mtime: i64,
}

/// A mutation reported by the document store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorpusEvent {
    /// Document was created
    Created(String),
    /// Document content changed
    Changed(String),
    /// Document was deleted
    Deleted(String),
    /// Document moved from one path to another
    Renamed { from: String, to: String },
    /// The store finished resolving the corpus
    Ready,
}

impl CorpusEvent {
    /// Path the event refers to (the new path for renames).
    pub fn path(&self) -> Option<&str> {
        match self {
            CorpusEvent::Created(p) | CorpusEvent::Changed(p) | CorpusEvent::Deleted(p) => {
                Some(p)
            }
            CorpusEvent::Renamed { to, .. } => Some(to),
            CorpusEvent::Ready => None,
        }
    }
}

/// Source of documents for the indexing engine.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Enumerate every document currently in the corpus.
    ///
    /// Only paths for which [`DocumentStore::is_indexable`] holds are listed.
    /// Failure here is a whole-operation failure.
    async fn list_documents(&self) -> Result<Vec<DocumentMeta>, IndexerError>;

    /// Whether `path` belongs to the corpus at all, as opposed to being
    /// hidden or ignored by the store. Event handlers consult this so a
    /// single event never indexes what a full listing would skip.
    fn is_indexable(&self, path: &str) -> bool {
        let _ = path;
        true
    }

    /// Read the full text of one document.
    async fn read_content(&self, path: &str) -> Result<String, IndexerError>;

    /// Current metadata of one document.
    async fn metadata(&self, path: &str) -> Result<DocumentMeta, IndexerError>;
}
