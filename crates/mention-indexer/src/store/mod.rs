//! Index store: mentions, occurrences and file fingerprints.
//!
//! Occurrences are keyed by `(path, line, line start, token start)` in an
//! ordered map, so all occurrences of one document form a contiguous range.
//! A secondary index maps mention names to their occurrence keys. Every
//! method takes the table lock once, which makes each call atomic to readers.

mod persist;

pub use persist::{Manifest, SCHEMA_VERSION};

use crate::model::{FileFingerprint, Mention, Occurrence, OccurrenceKey};
use crate::IndexerError;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Row counts of the three tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreStats {
    pub mentions: usize,
    pub occurrences: usize,
    pub files: usize,
}

#[derive(Debug, Default)]
struct Tables {
    mentions: BTreeMap<String, Mention>,
    occurrences: BTreeMap<OccurrenceKey, Occurrence>,
    files: BTreeMap<String, FileFingerprint>,
    by_mention: BTreeMap<String, BTreeSet<OccurrenceKey>>,
}

impl Tables {
    fn insert_occurrence(&mut self, occurrence: Occurrence) {
        let key = occurrence.key();
        self.by_mention
            .entry(occurrence.mention.clone())
            .or_default()
            .insert(key.clone());
        if let Some(previous) = self.occurrences.insert(key.clone(), occurrence) {
            self.unlink(&previous.mention, &key);
        }
    }

    fn remove_occurrence(&mut self, key: &OccurrenceKey) -> Option<Occurrence> {
        let removed = self.occurrences.remove(key)?;
        self.unlink(&removed.mention, key);
        Some(removed)
    }

    /// Drop `key` from the secondary index of `mention` unless it still points there.
    fn unlink(&mut self, mention: &str, key: &OccurrenceKey) {
        if self
            .occurrences
            .get(key)
            .is_some_and(|current| current.mention == mention)
        {
            return;
        }
        if let Some(keys) = self.by_mention.get_mut(mention) {
            keys.remove(key);
            if keys.is_empty() {
                self.by_mention.remove(mention);
            }
        }
    }

    fn path_keys(&self, path: &str) -> Vec<OccurrenceKey> {
        self.occurrences
            .range(OccurrenceKey::path_start(path)..=OccurrenceKey::path_end(path))
            .map(|(k, _)| k.clone())
            .collect()
    }

    fn remove_path(&mut self, path: &str) -> Vec<Occurrence> {
        self.path_keys(path)
            .iter()
            .filter_map(|key| self.remove_occurrence(key))
            .collect()
    }
}

/// Key-ordered store for the three index tables.
pub struct IndexStore {
    tables: RwLock<Tables>,
    location: Option<PathBuf>,
}

impl IndexStore {
    /// Create a store that lives only in memory.
    pub fn in_memory() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            location: None,
        }
    }

    /// Open a persisted store in `dir`.
    ///
    /// A missing index or one written with another schema version opens
    /// empty, so the next full load rebuilds it.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, IndexerError> {
        let dir = dir.into();
        let mut tables = Tables::default();

        if let Some(persisted) = persist::load(&dir).await? {
            for mention in persisted.mentions {
                tables.mentions.insert(mention.name.clone(), mention);
            }
            for file in persisted.files {
                tables.files.insert(file.path.clone(), file);
            }
            for occurrence in persisted.occurrences {
                tables.insert_occurrence(occurrence);
            }
        }

        Ok(Self {
            tables: RwLock::new(tables),
            location: Some(dir),
        })
    }

    /// Directory name for a corpus root (first 16 hex digits of its SHA-256).
    pub fn corpus_key(root: &Path) -> String {
        let mut hasher = Sha256::new();
        hasher.update(root.to_string_lossy().as_bytes());
        let result = hasher.finalize();
        format!("{:x}", result)[..16].to_string()
    }

    /// Where the store persists to, if anywhere.
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    /// Write the tables to disk. No-op for in-memory stores.
    pub async fn flush(&self) -> Result<(), IndexerError> {
        let Some(dir) = &self.location else {
            return Ok(());
        };

        let snapshot = {
            let tables = self.tables.read();
            persist::PersistedTables {
                mentions: tables.mentions.values().cloned().collect(),
                occurrences: tables.occurrences.values().cloned().collect(),
                files: tables.files.values().cloned().collect(),
            }
        };

        persist::save(dir, &snapshot).await
    }

    /// Row counts.
    pub fn stats(&self) -> StoreStats {
        let tables = self.tables.read();
        StoreStats {
            mentions: tables.mentions.len(),
            occurrences: tables.occurrences.len(),
            files: tables.files.len(),
        }
    }

    // Mentions

    pub fn get_mention(&self, name: &str) -> Option<Mention> {
        self.tables.read().mentions.get(name).cloned()
    }

    pub fn put_mention(&self, mention: Mention) {
        self.tables
            .write()
            .mentions
            .insert(mention.name.clone(), mention);
    }

    pub fn put_mentions(&self, mentions: impl IntoIterator<Item = Mention>) {
        let mut tables = self.tables.write();
        for mention in mentions {
            tables.mentions.insert(mention.name.clone(), mention);
        }
    }

    /// Delete mentions by name, returning the removed records.
    pub fn delete_mentions<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Vec<Mention> {
        let mut tables = self.tables.write();
        names
            .into_iter()
            .filter_map(|name| tables.mentions.remove(name))
            .collect()
    }

    /// All mention names in key order.
    pub fn mention_names(&self) -> Vec<String> {
        self.tables.read().mentions.keys().cloned().collect()
    }

    pub fn mentions(&self) -> Vec<Mention> {
        self.tables.read().mentions.values().cloned().collect()
    }

    // File fingerprints

    pub fn get_file(&self, path: &str) -> Option<FileFingerprint> {
        self.tables.read().files.get(path).cloned()
    }

    pub fn put_file(&self, file: FileFingerprint) {
        self.tables.write().files.insert(file.path.clone(), file);
    }

    pub fn delete_file(&self, path: &str) -> Option<FileFingerprint> {
        self.tables.write().files.remove(path)
    }

    /// Delete file entries by path, returning how many existed.
    pub fn delete_files<'a>(&self, paths: impl IntoIterator<Item = &'a str>) -> usize {
        let mut tables = self.tables.write();
        paths
            .into_iter()
            .filter(|path| tables.files.remove(*path).is_some())
            .count()
    }

    pub fn file_paths(&self) -> BTreeSet<String> {
        self.tables.read().files.keys().cloned().collect()
    }

    // Occurrences

    pub fn occurrences_by_path(&self, path: &str) -> Vec<Occurrence> {
        let tables = self.tables.read();
        tables
            .occurrences
            .range(OccurrenceKey::path_start(path)..=OccurrenceKey::path_end(path))
            .map(|(_, o)| o.clone())
            .collect()
    }

    /// Occurrences of a mention, ordered by path and position.
    pub fn occurrences_by_mention(&self, name: &str) -> Vec<Occurrence> {
        let tables = self.tables.read();
        tables
            .by_mention
            .get(name)
            .into_iter()
            .flatten()
            .filter_map(|key| tables.occurrences.get(key).cloned())
            .collect()
    }

    pub fn occurrence_count(&self, name: &str) -> usize {
        self.tables
            .read()
            .by_mention
            .get(name)
            .map(|keys| keys.len())
            .unwrap_or(0)
    }

    /// The occurrence whose token covers `offset` on `line` of `path`.
    pub fn occurrence_at(&self, path: &str, line: usize, offset: usize) -> Option<Occurrence> {
        let tables = self.tables.read();
        tables
            .occurrences
            .range(OccurrenceKey::path_start(path)..=OccurrenceKey::path_end(path))
            .map(|(_, o)| o)
            .find(|o| o.covers(line, offset))
            .cloned()
    }

    pub fn put_occurrences(&self, occurrences: impl IntoIterator<Item = Occurrence>) {
        let mut tables = self.tables.write();
        for occurrence in occurrences {
            tables.insert_occurrence(occurrence);
        }
    }

    /// Delete every occurrence at `path`, returning the removed records.
    pub fn delete_occurrences_by_path(&self, path: &str) -> Vec<Occurrence> {
        self.tables.write().remove_path(path)
    }

    /// Replace the occurrence set of `path` in one step.
    pub fn replace_path_occurrences(
        &self,
        path: &str,
        occurrences: Vec<Occurrence>,
    ) -> Vec<Occurrence> {
        let mut tables = self.tables.write();
        let removed = tables.remove_path(path);
        for occurrence in occurrences {
            debug_assert_eq!(occurrence.path, path);
            tables.insert_occurrence(occurrence);
        }
        removed
    }

    /// Move every occurrence from `old_path` to `new_path`, re-keying them.
    ///
    /// Occurrences already recorded at `new_path` are dropped first.
    pub fn rename_path(&self, old_path: &str, new_path: &str) -> usize {
        let mut tables = self.tables.write();
        let moved = tables.remove_path(old_path);
        let replaced = tables.remove_path(new_path);
        if !replaced.is_empty() {
            debug!(path = %new_path, count = replaced.len(), "Dropped occurrences at rename target");
        }

        let count = moved.len();
        for mut occurrence in moved {
            occurrence.path = new_path.to_string();
            tables.insert_occurrence(occurrence);
        }
        count
    }

    /// Delete occurrences by key, returning the removed records.
    pub fn delete_occurrences(&self, keys: &[OccurrenceKey]) -> Vec<Occurrence> {
        let mut tables = self.tables.write();
        keys.iter()
            .filter_map(|key| tables.remove_occurrence(key))
            .collect()
    }

    /// Keys of occurrences whose path is not in `paths`.
    pub fn occurrence_keys_outside(&self, paths: &BTreeSet<String>) -> Vec<OccurrenceKey> {
        self.tables
            .read()
            .occurrences
            .keys()
            .filter(|k| !paths.contains(&k.path))
            .cloned()
            .collect()
    }

    /// Distinct mention names that have at least one occurrence.
    pub fn occurrence_mention_names(&self) -> BTreeSet<String> {
        self.tables.read().by_mention.keys().cloned().collect()
    }
}

impl Default for IndexStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::document_fingerprint;
    use tempfile::tempdir;

    fn occurrence(mention: &str, path: &str, line: usize, start: usize) -> Occurrence {
        Occurrence {
            mention: mention.to_string(),
            path: path.to_string(),
            line_number: line,
            line_start: line * 10,
            line_end: line * 10 + 9,
            start,
            end: start + mention.len() + 1,
            text: format!("line with @{}", mention),
            is_task_complete: false,
        }
    }

    fn file(path: &str) -> FileFingerprint {
        FileFingerprint {
            path: path.to_string(),
            fingerprint: document_fingerprint(path),
            mtime: 1,
        }
    }

    #[test]
    fn test_mentions_crud() {
        let store = IndexStore::in_memory();
        store.put_mention(Mention::new("Bob"));
        store.put_mentions([Mention::new("Alice"), Mention::primary("Me")]);

        assert_eq!(store.mention_names(), vec!["Alice", "Bob", "Me"]);
        assert!(store.get_mention("Me").unwrap().is_primary);

        let removed = store.delete_mentions(["Bob", "Nobody"]);
        assert_eq!(removed.len(), 1);
        assert!(store.get_mention("Bob").is_none());
    }

    #[test]
    fn test_files_crud() {
        let store = IndexStore::in_memory();
        store.put_file(file("a.md"));
        store.put_file(file("b.md"));

        assert_eq!(store.get_file("a.md").unwrap().mtime, 1);
        assert!(store.delete_file("a.md").is_some());
        assert!(store.delete_file("a.md").is_none());
        assert_eq!(store.delete_files(["b.md", "c.md"]), 1);
        assert!(store.file_paths().is_empty());
    }

    #[test]
    fn test_occurrence_queries() {
        let store = IndexStore::in_memory();
        store.put_occurrences([
            occurrence("Alice", "a.md", 1, 0),
            occurrence("Bob", "a.md", 2, 4),
            occurrence("Alice", "b.md", 1, 3),
            occurrence("Alice", "a.md.bak", 1, 0),
        ]);

        assert_eq!(store.occurrences_by_path("a.md").len(), 2);
        assert_eq!(store.occurrences_by_mention("Alice").len(), 3);
        assert_eq!(store.occurrence_count("Bob"), 1);
        assert_eq!(store.occurrences_by_path("a.md.bak").len(), 1);
        assert_eq!(store.occurrence_mention_names().len(), 2);
    }

    #[test]
    fn test_occurrence_at() {
        let store = IndexStore::in_memory();
        store.put_occurrences([occurrence("Dave", "a.md", 3, 10)]);

        assert_eq!(store.occurrence_at("a.md", 3, 12).unwrap().mention, "Dave");
        assert!(store.occurrence_at("a.md", 3, 15).is_none());
        assert!(store.occurrence_at("a.md", 2, 12).is_none());
        assert!(store.occurrence_at("b.md", 3, 12).is_none());
    }

    #[test]
    fn test_replace_path_occurrences() {
        let store = IndexStore::in_memory();
        store.put_occurrences([
            occurrence("Alice", "a.md", 1, 0),
            occurrence("Bob", "a.md", 2, 0),
            occurrence("Bob", "b.md", 1, 0),
        ]);

        let removed = store.replace_path_occurrences("a.md", vec![occurrence("Carol", "a.md", 1, 0)]);

        assert_eq!(removed.len(), 2);
        assert_eq!(store.occurrence_count("Alice"), 0);
        assert_eq!(store.occurrence_count("Bob"), 1);
        assert_eq!(store.occurrence_count("Carol"), 1);
        assert!(!store.occurrence_mention_names().contains("Alice"));
    }

    #[test]
    fn test_overwriting_key_moves_secondary_index() {
        let store = IndexStore::in_memory();
        store.put_occurrences([occurrence("Alice", "a.md", 1, 0)]);
        store.put_occurrences([occurrence("Bob", "a.md", 1, 0)]);

        assert_eq!(store.occurrence_count("Alice"), 0);
        assert_eq!(store.occurrence_count("Bob"), 1);
        assert_eq!(store.stats().occurrences, 1);
    }

    #[test]
    fn test_rename_path_rekeys() {
        let store = IndexStore::in_memory();
        store.put_occurrences([
            occurrence("Alice", "a.md", 1, 0),
            occurrence("Alice", "a.md", 2, 0),
            occurrence("Bob", "b.md", 1, 0),
        ]);

        let moved = store.rename_path("a.md", "b.md");

        assert_eq!(moved, 2);
        assert!(store.occurrences_by_path("a.md").is_empty());
        let at_b = store.occurrences_by_path("b.md");
        assert_eq!(at_b.len(), 2);
        assert!(at_b.iter().all(|o| o.path == "b.md" && o.mention == "Alice"));
        assert_eq!(store.occurrence_count("Bob"), 0);
    }

    #[test]
    fn test_occurrence_keys_outside() {
        let store = IndexStore::in_memory();
        store.put_occurrences([occurrence("Alice", "a.md", 1, 0), occurrence("Bob", "b.md", 1, 0)]);

        let live: BTreeSet<String> = ["a.md".to_string()].into_iter().collect();
        let stale = store.occurrence_keys_outside(&live);
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].path, "b.md");

        let removed = store.delete_occurrences(&stale);
        assert_eq!(removed[0].mention, "Bob");
        assert_eq!(store.stats().occurrences, 1);
    }

    #[test]
    fn test_corpus_key() {
        let key = IndexStore::corpus_key(Path::new("/notes/vault"));
        assert_eq!(key.len(), 16);
        assert_eq!(key, IndexStore::corpus_key(Path::new("/notes/vault")));
        assert_ne!(key, IndexStore::corpus_key(Path::new("/notes/other")));
    }

    #[tokio::test]
    async fn test_flush_and_reopen() {
        let temp_dir = tempdir().unwrap();
        let store = IndexStore::open(temp_dir.path()).await.unwrap();
        store.put_mention(Mention::primary("Me"));
        store.put_mention(Mention::new("Alice"));
        store.put_occurrences([occurrence("Alice", "a.md", 1, 0)]);
        store.put_file(file("a.md"));
        store.flush().await.unwrap();

        let reopened = IndexStore::open(temp_dir.path()).await.unwrap();
        assert_eq!(reopened.stats(), store.stats());
        assert_eq!(reopened.occurrences_by_mention("Alice").len(), 1);
        assert_eq!(reopened.get_file("a.md"), store.get_file("a.md"));
        assert!(reopened.get_mention("Me").unwrap().is_primary);
    }

    #[tokio::test]
    async fn test_open_missing_is_empty() {
        let temp_dir = tempdir().unwrap();
        let store = IndexStore::open(temp_dir.path().join("nothing")).await.unwrap();
        assert_eq!(store.stats(), StoreStats::default());
    }

    #[tokio::test]
    async fn test_in_memory_flush_is_noop() {
        let store = IndexStore::in_memory();
        assert!(store.location().is_none());
        store.flush().await.unwrap();
    }
}
