//! Documents held in memory.

use super::{DocumentMeta, DocumentStore};
use crate::IndexerError;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};

#[derive(Debug, Clone)]
struct Document {
    content: String,
    mtime: i64,
}

/// In-memory corpus for embedding and tests.
///
/// Every write advances a logical clock that stands in for the
/// modification time.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    documents: RwLock<BTreeMap<String, Document>>,
    clock: AtomicI64,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tick(&self) -> i64 {
        self.clock.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Create or overwrite a document.
    pub fn insert(&self, path: &str, content: &str) {
        let mtime = self.tick();
        self.documents.write().insert(
            path.to_string(),
            Document {
                content: content.to_string(),
                mtime,
            },
        );
    }

    /// Bump the modification time without changing content.
    pub fn touch(&self, path: &str) -> bool {
        let mtime = self.tick();
        match self.documents.write().get_mut(path) {
            Some(doc) => {
                doc.mtime = mtime;
                true
            }
            None => false,
        }
    }

    /// Remove a document.
    pub fn remove(&self, path: &str) -> bool {
        self.documents.write().remove(path).is_some()
    }

    /// Move a document, keeping its content and modification time.
    pub fn rename(&self, from: &str, to: &str) -> bool {
        let mut documents = self.documents.write();
        match documents.remove(from) {
            Some(doc) => {
                documents.insert(to.to_string(), doc);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }

    fn missing(path: &str) -> IndexerError {
        IndexerError::Document {
            path: path.to_string(),
            message: "no such document".to_string(),
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn list_documents(&self) -> Result<Vec<DocumentMeta>, IndexerError> {
        Ok(self
            .documents
            .read()
            .iter()
            .map(|(path, doc)| DocumentMeta {
                path: path.clone(),
                mtime: doc.mtime,
            })
            .collect())
    }

    async fn read_content(&self, path: &str) -> Result<String, IndexerError> {
        self.documents
            .read()
            .get(path)
            .map(|doc| doc.content.clone())
            .ok_or_else(|| Self::missing(path))
    }

    async fn metadata(&self, path: &str) -> Result<DocumentMeta, IndexerError> {
        self.documents
            .read()
            .get(path)
            .map(|doc| DocumentMeta {
                path: path.to_string(),
                mtime: doc.mtime,
            })
            .ok_or_else(|| Self::missing(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_and_read() {
        let store = MemoryDocumentStore::new();
        store.insert("a.md", "hello");

        assert_eq!(store.read_content("a.md").await.unwrap(), "hello");
        assert_eq!(store.list_documents().await.unwrap().len(), 1);
        assert!(store.read_content("b.md").await.unwrap_err().is_document_error());
    }

    #[tokio::test]
    async fn test_touch_advances_mtime() {
        let store = MemoryDocumentStore::new();
        store.insert("a.md", "hello");
        let before = store.metadata("a.md").await.unwrap().mtime;

        assert!(store.touch("a.md"));
        let after = store.metadata("a.md").await.unwrap().mtime;

        assert!(after > before);
        assert_eq!(store.read_content("a.md").await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_rename_keeps_content() {
        let store = MemoryDocumentStore::new();
        store.insert("a.md", "hello");

        assert!(store.rename("a.md", "b.md"));
        assert!(!store.rename("a.md", "c.md"));
        assert_eq!(store.read_content("b.md").await.unwrap(), "hello");
        assert!(store.remove("b.md"));
        assert!(store.is_empty());
    }
}
