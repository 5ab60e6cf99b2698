//! Documents on the local file system.

use super::filter::IgnoreFilter;
use super::walker::{mtime_millis, Walker};
use super::{DocumentMeta, DocumentStore};
use crate::IndexerError;
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Serves documents below a root directory.
pub struct FsDocumentStore {
    root: PathBuf,
    follow_symlinks: bool,
    filter: IgnoreFilter,
}

impl FsDocumentStore {
    /// Create a store rooted at `root`, which must exist.
    pub fn new(root: &Path) -> Result<Self, IndexerError> {
        let root = root
            .canonicalize()
            .map_err(|_| IndexerError::NotFound(root.to_path_buf()))?;

        let filter = IgnoreFilter::new(&root);

        Ok(Self {
            root,
            follow_symlinks: false,
            filter,
        })
    }

    /// Follow symlinks while enumerating.
    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Canonical root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of a corpus-relative path, refusing to leave the root.
    fn resolve(&self, path: &str) -> Result<PathBuf, IndexerError> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));

        if escapes {
            return Err(IndexerError::Document {
                path: path.to_string(),
                message: "path is not inside the corpus root".to_string(),
            });
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl DocumentStore for FsDocumentStore {
    async fn list_documents(&self) -> Result<Vec<DocumentMeta>, IndexerError> {
        if !self.root.is_dir() {
            return Err(IndexerError::NotFound(self.root.clone()));
        }

        let walker = Walker::new(&self.root, self.follow_symlinks);
        let entries = tokio::task::spawn_blocking(move || walker.walk())
            .await
            .map_err(|e| IndexerError::Storage(format!("walker task failed: {}", e)))?;

        let documents: Vec<DocumentMeta> = entries
            .into_iter()
            .filter_map(|entry| {
                relative_path(&self.root, &entry.path).map(|path| DocumentMeta {
                    path,
                    mtime: entry.mtime,
                })
            })
            .collect();

        debug!(root = ?self.root, count = documents.len(), "Listed documents");

        Ok(documents)
    }

    fn is_indexable(&self, path: &str) -> bool {
        !self.filter.is_ignored(path)
    }

    async fn read_content(&self, path: &str) -> Result<String, IndexerError> {
        let full = self.resolve(path)?;
        tokio::fs::read_to_string(&full)
            .await
            .map_err(|e| IndexerError::Document {
                path: path.to_string(),
                message: e.to_string(),
            })
    }

    async fn metadata(&self, path: &str) -> Result<DocumentMeta, IndexerError> {
        let full = self.resolve(path)?;
        let metadata = tokio::fs::metadata(&full)
            .await
            .map_err(|e| IndexerError::Document {
                path: path.to_string(),
                message: e.to_string(),
            })?;

        Ok(DocumentMeta {
            path: path.to_string(),
            mtime: mtime_millis(&metadata),
        })
    }
}

/// Corpus-relative form of `path` (with `/` separators), if it lies below `root`.
pub fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}
