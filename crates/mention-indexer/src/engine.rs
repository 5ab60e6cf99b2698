//! The incremental indexing engine.
//!
//! Every mutation (full load, create, change, delete, rename) runs inside one
//! exclusion region, a FIFO-fair async mutex, for its whole duration.
//! Occurrences are the source of truth; a mention's record is recomputed
//! from its occurrences whenever a document touching it is reindexed.
//! Observers hear about a mention only when its occurrence fingerprint
//! changed, after the operation has been written to the store.

use crate::corpus::{CorpusEvent, DocumentMeta, DocumentStore};
use crate::dispatcher::{ChangeDispatcher, SubscriptionId};
use crate::extract::{document_lines, is_completed_task, TokenExtractor};
use crate::fingerprint::{document_fingerprint, occurrence_fingerprint, Fingerprint};
use crate::model::{FileFingerprint, Mention, Occurrence};
use crate::store::{IndexStore, StoreStats};
use crate::IndexerError;
use mention_core::MentionConfig;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Summary of a full-corpus load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Eligible documents enumerated
    pub documents: usize,
    /// Documents whose occurrences were rebuilt
    pub reindexed: usize,
    /// Documents skipped because they were unchanged
    pub unchanged: usize,
    /// Documents that could not be read (left untouched for a later retry)
    pub failed: usize,
    /// File entries dropped for documents that disappeared
    pub removed_files: usize,
    /// Mentions garbage-collected
    pub removed_mentions: usize,
    /// Wall time in milliseconds
    pub duration_ms: u64,
}

/// What handling one corpus event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// The document was reindexed
    Reindexed { notified: usize },
    /// Content fingerprint matched the cache; nothing written
    Unchanged,
    /// The event does not concern an indexable document
    Ignored,
    /// The document was dropped from the index
    Removed { notified: usize },
    /// Occurrences moved to a new path
    Renamed { moved: usize, notified: usize },
    /// A full-corpus load ran
    Loaded(LoadReport),
}

#[derive(Debug, Default)]
struct EngineState {
    initialized: bool,
    ready_seen: bool,
    last_load_documents: Option<usize>,
}

/// A document read and fingerprinted, waiting to be indexed.
struct IndexableDocument {
    path: String,
    mtime: i64,
    content: String,
    fingerprint: Fingerprint,
}

/// A notification held back until the operation commits.
struct PendingChange {
    mention: Mention,
    path: String,
}

/// Notifications of one operation, at most one per mention and path.
#[derive(Default)]
struct PendingChanges {
    changes: Vec<PendingChange>,
    index: HashMap<(String, String), usize>,
}

impl PendingChanges {
    /// Queue a notification. Returns false when `(mention, path)` is already
    /// queued; the queued entry then carries the newer mention record.
    fn push(&mut self, mention: Mention, path: &str) -> bool {
        let key = (mention.name.clone(), path.to_string());
        if let Some(&slot) = self.index.get(&key) {
            self.changes[slot].mention = mention;
            return false;
        }
        self.index.insert(key, self.changes.len());
        self.changes.push(PendingChange {
            mention,
            path: path.to_string(),
        });
        true
    }

    fn iter(&self) -> impl Iterator<Item = &PendingChange> {
        self.changes.iter()
    }
}

#[derive(Debug, Default)]
struct GcStats {
    files: usize,
    occurrences: usize,
    mentions: usize,
}

/// Keeps the mention index in step with a document store.
pub struct IndexEngine {
    config: MentionConfig,
    documents: Arc<dyn DocumentStore>,
    store: Arc<IndexStore>,
    extractor: TokenExtractor,
    dispatcher: ChangeDispatcher,
    gate: Mutex<EngineState>,
    shut_down: AtomicBool,
}

impl IndexEngine {
    /// Create an engine. The configuration is validated here.
    pub fn new(
        config: MentionConfig,
        documents: Arc<dyn DocumentStore>,
        store: Arc<IndexStore>,
    ) -> Result<Self, IndexerError> {
        config.validate()?;
        let extractor = TokenExtractor::new(&config.trigger_phrase)?;

        Ok(Self {
            config,
            documents,
            store,
            extractor,
            dispatcher: ChangeDispatcher::new(),
            gate: Mutex::new(EngineState::default()),
            shut_down: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &MentionConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<IndexStore> {
        &self.store
    }

    // Lifecycle

    /// Create the primary mention and load the corpus.
    pub async fn initialize(&self) -> Result<LoadReport, IndexerError> {
        let mut state = self.enter().await?;

        self.ensure_primary_mention();

        let mut pending = PendingChanges::default();
        let report = self.load_corpus_locked(&mut pending).await?;
        state.initialized = true;
        state.last_load_documents = Some(report.documents);

        self.commit(pending).await?;
        Ok(report)
    }

    /// Run a full-corpus load. Safe to repeat.
    pub async fn load_corpus(&self) -> Result<LoadReport, IndexerError> {
        let mut state = self.enter().await?;

        let mut pending = PendingChanges::default();
        let report = self.load_corpus_locked(&mut pending).await?;
        state.last_load_documents = Some(report.documents);

        self.commit(pending).await?;
        Ok(report)
    }

    /// The document store finished resolving its corpus.
    ///
    /// Only the first signal counts, and it reloads only when the startup
    /// load found no documents.
    pub async fn corpus_ready(&self) -> Result<ChangeOutcome, IndexerError> {
        let mut state = self.enter().await?;

        if state.ready_seen {
            return Ok(ChangeOutcome::Ignored);
        }
        state.ready_seen = true;

        if !state.initialized || state.last_load_documents != Some(0) {
            debug!("Corpus ready, no reload needed");
            return Ok(ChangeOutcome::Ignored);
        }

        info!("Corpus ready after an empty startup load, reloading");
        let mut pending = PendingChanges::default();
        let report = self.load_corpus_locked(&mut pending).await?;
        state.last_load_documents = Some(report.documents);

        self.commit(pending).await?;
        Ok(ChangeOutcome::Loaded(report))
    }

    /// Flush the store and drop all subscribers. Later mutations fail.
    pub async fn shutdown(&self) -> Result<(), IndexerError> {
        let _state = self.gate.lock().await;

        if self.shut_down.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        self.dispatcher.clear();
        self.store.flush().await?;

        info!("Index engine shut down");
        Ok(())
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    // Corpus events

    /// Dispatch one event from the document store.
    pub async fn handle_event(&self, event: CorpusEvent) -> Result<ChangeOutcome, IndexerError> {
        match event {
            CorpusEvent::Created(path) => self.document_created(&path).await,
            CorpusEvent::Changed(path) => self.document_changed(&path).await,
            CorpusEvent::Deleted(path) => self.document_deleted(&path).await,
            CorpusEvent::Renamed { from, to } => self.document_renamed(&from, &to).await,
            CorpusEvent::Ready => self.corpus_ready().await,
        }
    }

    /// A document's content may have changed.
    pub async fn document_changed(&self, path: &str) -> Result<ChangeOutcome, IndexerError> {
        let _state = self.enter().await?;
        if !self.is_indexable(path) {
            return Ok(ChangeOutcome::Ignored);
        }

        let Some(doc) = self.read_if_changed(path).await? else {
            debug!(path = %path, "Content unchanged");
            return Ok(ChangeOutcome::Unchanged);
        };

        let mut pending = PendingChanges::default();
        let notified = self.reindex(&doc, &mut pending);
        self.collect_garbage(None);

        self.commit(pending).await?;
        Ok(ChangeOutcome::Reindexed { notified })
    }

    /// A document appeared.
    pub async fn document_created(&self, path: &str) -> Result<ChangeOutcome, IndexerError> {
        let _state = self.enter().await?;
        if !self.is_indexable(path) {
            return Ok(ChangeOutcome::Ignored);
        }

        let mut pending = PendingChanges::default();
        let outcome = self.create_locked(path, &mut pending).await?;

        self.commit(pending).await?;
        Ok(outcome)
    }

    /// A document disappeared.
    pub async fn document_deleted(&self, path: &str) -> Result<ChangeOutcome, IndexerError> {
        let _state = self.enter().await?;

        let mut pending = PendingChanges::default();
        let outcome = self.delete_locked(path, &mut pending);

        self.commit(pending).await?;
        Ok(outcome)
    }

    /// A document moved from `from` to `to`.
    ///
    /// Moving out of the indexable set acts as a delete, moving into it as a
    /// create.
    pub async fn document_renamed(
        &self,
        from: &str,
        to: &str,
    ) -> Result<ChangeOutcome, IndexerError> {
        let _state = self.enter().await?;

        let known = self.is_known(from);
        let eligible = self.is_indexable(to);

        let mut pending = PendingChanges::default();
        let outcome = match (known, eligible) {
            (false, false) => ChangeOutcome::Ignored,
            (true, false) => self.delete_locked(from, &mut pending),
            (false, true) => self.create_locked(to, &mut pending).await?,
            (true, true) => self.rename_locked(from, to, &mut pending).await?,
        };

        self.commit(pending).await?;
        Ok(outcome)
    }

    // Queries

    /// Names of every mention, the primary one included.
    pub fn mention_names(&self) -> BTreeSet<String> {
        self.store.mention_names().into_iter().collect()
    }

    pub fn mention(&self, name: &str) -> Option<Mention> {
        self.store.get_mention(name)
    }

    /// The mention whose token covers byte `offset` of 1-based `line` in `path`.
    pub fn mention_at(&self, path: &str, line: usize, offset: usize) -> Option<String> {
        self.store
            .occurrence_at(path, line, offset)
            .map(|o| o.mention)
    }

    /// Every occurrence of a mention, ordered by path and position.
    pub fn occurrences_for(&self, name: &str) -> Vec<Occurrence> {
        self.store.occurrences_by_mention(name)
    }

    pub fn stats(&self) -> StoreStats {
        self.store.stats()
    }

    /// Register an observer for `(mention, path)` changes.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Mention, &str) + Send + Sync + 'static,
    {
        self.dispatcher.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.dispatcher.unsubscribe(id)
    }

    // Internals; callers hold the gate.

    async fn enter(&self) -> Result<MutexGuard<'_, EngineState>, IndexerError> {
        let state = self.gate.lock().await;
        if self.is_shut_down() {
            return Err(IndexerError::ShutDown);
        }
        Ok(state)
    }

    /// Deliver held notifications, then persist.
    async fn commit(&self, pending: PendingChanges) -> Result<(), IndexerError> {
        for change in pending.iter() {
            self.dispatcher.notify(&change.mention, &change.path);
        }
        self.store.flush().await
    }

    fn ensure_primary_mention(&self) {
        let name = self.config.primary_mention.as_str();

        let demoted: Vec<Mention> = self
            .store
            .mentions()
            .into_iter()
            .filter(|m| m.is_primary && m.name != name)
            .map(|mut m| {
                m.is_primary = false;
                m
            })
            .collect();
        if !demoted.is_empty() {
            info!(count = demoted.len(), "Primary mention renamed, demoting previous");
            self.store.put_mentions(demoted);
        }

        match self.store.get_mention(name) {
            Some(existing) if existing.is_primary => {}
            Some(mut existing) => {
                existing.is_primary = true;
                self.store.put_mention(existing);
            }
            None => self.store.put_mention(Mention::primary(name)),
        }
    }

    async fn load_corpus_locked(
        &self,
        pending: &mut PendingChanges,
    ) -> Result<LoadReport, IndexerError> {
        let start = Instant::now();

        let documents: Vec<DocumentMeta> = self
            .documents
            .list_documents()
            .await?
            .into_iter()
            .filter(|d| self.config.is_eligible(&d.path))
            .collect();

        info!(documents = documents.len(), "Loading corpus");

        let live: BTreeSet<String> = documents.iter().map(|d| d.path.clone()).collect();
        let mut report = LoadReport {
            documents: documents.len(),
            ..Default::default()
        };

        for meta in &documents {
            match self.read_if_stale(meta).await {
                Ok(Some(doc)) => {
                    self.reindex(&doc, pending);
                    report.reindexed += 1;
                }
                Ok(None) => report.unchanged += 1,
                Err(e) if e.is_document_error() => {
                    warn!(path = %meta.path, error = %e, "Skipping unreadable document");
                    report.failed += 1;
                }
                Err(e) => return Err(e),
            }
        }

        let gc = self.collect_garbage(Some(&live));
        report.removed_files = gc.files;
        report.removed_mentions = gc.mentions;
        report.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            documents = report.documents,
            reindexed = report.reindexed,
            unchanged = report.unchanged,
            failed = report.failed,
            removed_files = report.removed_files,
            removed_mentions = report.removed_mentions,
            duration_ms = report.duration_ms,
            "Corpus loaded"
        );

        Ok(report)
    }

    /// Full-load staleness: no cache entry, or both mtime and content changed.
    async fn read_if_stale(
        &self,
        meta: &DocumentMeta,
    ) -> Result<Option<IndexableDocument>, IndexerError> {
        let cached = self.store.get_file(&meta.path);
        if cached.as_ref().is_some_and(|c| c.mtime == meta.mtime) {
            return Ok(None);
        }

        let content = self.documents.read_content(&meta.path).await?;
        let fingerprint = document_fingerprint(&content);
        if cached.is_some_and(|c| c.fingerprint == fingerprint) {
            return Ok(None);
        }

        Ok(Some(IndexableDocument {
            path: meta.path.clone(),
            mtime: meta.mtime,
            content,
            fingerprint,
        }))
    }

    /// Event staleness: content fingerprint differs from the cache.
    async fn read_if_changed(&self, path: &str) -> Result<Option<IndexableDocument>, IndexerError> {
        let meta = self.documents.metadata(path).await?;
        let content = self.documents.read_content(path).await?;
        let fingerprint = document_fingerprint(&content);

        if self
            .store
            .get_file(path)
            .is_some_and(|c| c.fingerprint == fingerprint)
        {
            return Ok(None);
        }

        Ok(Some(IndexableDocument {
            path: meta.path,
            mtime: meta.mtime,
            content,
            fingerprint,
        }))
    }

    /// Rebuild the occurrences of one document and reconcile its mentions.
    ///
    /// Returns the number of notifications queued.
    fn reindex(&self, doc: &IndexableDocument, pending: &mut PendingChanges) -> usize {
        let path = doc.path.as_str();

        let before: BTreeMap<String, Option<Fingerprint>> = self
            .mentions_at(path)
            .into_iter()
            .map(|m| (m.name, m.occurrence_fingerprint))
            .collect();

        let mut occurrences = Vec::new();
        let mut touched: BTreeSet<String> = BTreeSet::new();

        if self.extractor.may_contain_mentions(&doc.content) {
            for line in document_lines(&doc.content) {
                for token in self.extractor.matches(line.text) {
                    touched.insert(token.name.to_string());
                    occurrences.push(Occurrence {
                        mention: token.name.to_string(),
                        path: doc.path.clone(),
                        line_number: line.number,
                        line_start: line.start,
                        line_end: line.end,
                        start: token.start,
                        end: token.end,
                        text: line.text.to_string(),
                        is_task_complete: is_completed_task(line.text),
                    });
                }
            }
        }

        // Mentions exist before their occurrences do
        let created: Vec<Mention> = touched
            .iter()
            .filter(|name| self.store.get_mention(name).is_none())
            .map(|name| Mention::new(name.as_str()))
            .collect();
        self.store.put_mentions(created);

        let count = occurrences.len();
        self.store.replace_path_occurrences(path, occurrences);

        let mut notified = 0;
        for name in &touched {
            let Some(mention) = self.refresh_fingerprint(name) else {
                continue;
            };
            let changed = match before.get(name) {
                Some(previous) => *previous != mention.occurrence_fingerprint,
                None => true,
            };
            if changed && pending.push(mention, path) {
                notified += 1;
            }
        }

        for name in before.keys().filter(|name| !touched.contains(*name)) {
            if let Some(mention) = self.refresh_fingerprint(name) {
                if pending.push(mention, path) {
                    notified += 1;
                }
            }
        }

        self.store.put_file(FileFingerprint {
            path: doc.path.clone(),
            fingerprint: doc.fingerprint,
            mtime: doc.mtime,
        });

        debug!(
            path = %path,
            occurrences = count,
            mentions = touched.len(),
            notified,
            "Indexed document"
        );

        notified
    }

    async fn create_locked(
        &self,
        path: &str,
        pending: &mut PendingChanges,
    ) -> Result<ChangeOutcome, IndexerError> {
        let had_entry = self.store.get_file(path).is_some();

        let Some(doc) = self.read_if_changed(path).await? else {
            return Ok(ChangeOutcome::Unchanged);
        };

        let notified = self.reindex(&doc, pending);
        if had_entry {
            self.collect_garbage(None);
        }

        Ok(ChangeOutcome::Reindexed { notified })
    }

    fn delete_locked(&self, path: &str, pending: &mut PendingChanges) -> ChangeOutcome {
        if !self.is_known(path) {
            return ChangeOutcome::Ignored;
        }

        let affected = self.mentions_at(path);

        let removed = self.store.delete_occurrences_by_path(path);
        self.store.delete_file(path);

        let mut notified = 0;
        for mention in affected {
            let mention = self.refresh_fingerprint(&mention.name).unwrap_or(mention);
            if pending.push(mention, path) {
                notified += 1;
            }
        }
        self.collect_garbage(None);

        info!(path = %path, occurrences = removed.len(), mentions = notified, "Removed document");

        ChangeOutcome::Removed { notified }
    }

    async fn rename_locked(
        &self,
        from: &str,
        to: &str,
        pending: &mut PendingChanges,
    ) -> Result<ChangeOutcome, IndexerError> {
        // Read first: a failed read must leave the index untouched
        let meta = self.documents.metadata(to).await?;
        let content = self.documents.read_content(to).await?;
        let fingerprint = document_fingerprint(&content);

        let previous = self.store.get_file(from);
        let affected = self.mentions_at(from);
        let displaced = self.mentions_at(to);

        let moved = self.store.rename_path(from, to);
        self.store.delete_file(from);

        let mut notified = 0;
        for mention in displaced {
            let mention = self.refresh_fingerprint(&mention.name).unwrap_or(mention);
            if pending.push(mention, to) {
                notified += 1;
            }
        }
        for mention in affected {
            if pending.push(mention, to) {
                notified += 1;
            }
        }

        let doc = IndexableDocument {
            path: to.to_string(),
            mtime: meta.mtime,
            content,
            fingerprint,
        };

        let content_changed = previous.map_or(true, |p| p.fingerprint != fingerprint);
        if content_changed {
            debug!(path = %to, "Renamed document also changed, reindexing");
            notified += self.reindex(&doc, pending);
        } else {
            self.store.put_file(FileFingerprint {
                path: doc.path,
                fingerprint: doc.fingerprint,
                mtime: doc.mtime,
            });
        }
        self.collect_garbage(None);

        info!(from = %from, to = %to, occurrences = moved, "Renamed document");

        Ok(ChangeOutcome::Renamed { moved, notified })
    }

    /// Drop stale file entries (when `live` is given), orphaned occurrences
    /// and unreferenced non-primary mentions.
    fn collect_garbage(&self, live: Option<&BTreeSet<String>>) -> GcStats {
        let mut stats = GcStats::default();

        if let Some(live) = live {
            let stale: Vec<String> = self
                .store
                .file_paths()
                .into_iter()
                .filter(|p| !live.contains(p))
                .collect();
            stats.files = self.store.delete_files(stale.iter().map(String::as_str));
        }

        let known = self.store.file_paths();
        let orphans = self.store.occurrence_keys_outside(&known);
        let removed = self.store.delete_occurrences(&orphans);
        stats.occurrences = removed.len();
        let affected: BTreeSet<String> = removed.into_iter().map(|o| o.mention).collect();

        let referenced = self.store.occurrence_mention_names();
        let unreferenced: Vec<String> = self
            .store
            .mentions()
            .into_iter()
            .filter(|m| !m.is_primary && !referenced.contains(&m.name))
            .map(|m| m.name)
            .collect();
        stats.mentions = self
            .store
            .delete_mentions(unreferenced.iter().map(String::as_str))
            .len();

        for name in &affected {
            self.refresh_fingerprint(name);
        }

        if stats.files + stats.occurrences + stats.mentions > 0 {
            debug!(
                files = stats.files,
                occurrences = stats.occurrences,
                mentions = stats.mentions,
                "Garbage collected"
            );
        }

        stats
    }

    /// Recompute a mention's fingerprint from its global occurrence set.
    fn refresh_fingerprint(&self, name: &str) -> Option<Mention> {
        let mut mention = self.store.get_mention(name)?;
        let occurrences = self.store.occurrences_by_mention(name);

        mention.occurrence_fingerprint = if occurrences.is_empty() {
            None
        } else {
            Some(occurrence_fingerprint(
                occurrences.iter().map(|o| o.text.as_str()),
            ))
        };

        self.store.put_mention(mention.clone());
        Some(mention)
    }

    /// Whether the configuration and the document store both admit `path`.
    fn is_indexable(&self, path: &str) -> bool {
        self.config.is_eligible(path) && self.documents.is_indexable(path)
    }

    /// Mentions with at least one occurrence at `path`.
    fn mentions_at(&self, path: &str) -> Vec<Mention> {
        let names: BTreeSet<String> = self
            .store
            .occurrences_by_path(path)
            .into_iter()
            .map(|o| o.mention)
            .collect();

        names
            .iter()
            .filter_map(|name| self.store.get_mention(name))
            .collect()
    }

    fn is_known(&self, path: &str) -> bool {
        self.store.get_file(path).is_some() || !self.store.occurrences_by_path(path).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::MemoryDocumentStore;
    use parking_lot::Mutex as SyncMutex;

    fn engine_with(docs: &[(&str, &str)]) -> (IndexEngine, Arc<MemoryDocumentStore>) {
        let documents = Arc::new(MemoryDocumentStore::new());
        for (path, content) in docs {
            documents.insert(path, content);
        }
        let engine = IndexEngine::new(
            MentionConfig::default(),
            documents.clone(),
            Arc::new(IndexStore::in_memory()),
        )
        .unwrap();
        (engine, documents)
    }

    fn record(engine: &IndexEngine) -> Arc<SyncMutex<Vec<(String, String)>>> {
        let seen = Arc::new(SyncMutex::new(Vec::new()));
        let sink = seen.clone();
        engine.subscribe(move |m, p| sink.lock().push((m.name.clone(), p.to_string())));
        seen
    }

    #[tokio::test]
    async fn test_initialize_indexes_corpus() {
        let (engine, _) = engine_with(&[("a.md", "@Alice\n@Bob\n@Alice")]);

        let report = engine.initialize().await.unwrap();

        assert_eq!(report.documents, 1);
        assert_eq!(report.reindexed, 1);
        assert_eq!(engine.occurrences_for("Alice").len(), 2);
        assert_eq!(engine.occurrences_for("Bob").len(), 1);
        assert!(engine.mention_names().contains("Me"));
    }

    #[tokio::test]
    async fn test_fingerprints_match_occurrences_after_commit() {
        let (engine, documents) = engine_with(&[("a.md", "@Alice one"), ("b.md", "@Alice two")]);
        engine.initialize().await.unwrap();

        documents.insert("b.md", "nobody");
        engine.document_changed("b.md").await.unwrap();

        let alice = engine.mention("Alice").unwrap();
        assert_eq!(
            alice.occurrence_fingerprint,
            Some(occurrence_fingerprint(["@Alice one"]))
        );
    }

    #[tokio::test]
    async fn test_disappearing_mention_notified_without_trigger() {
        let (engine, documents) = engine_with(&[("a.md", "@Bob"), ("b.md", "@Bob too")]);
        engine.initialize().await.unwrap();
        let seen = record(&engine);

        documents.insert("a.md", "plain text");
        engine.document_changed("a.md").await.unwrap();

        assert_eq!(*seen.lock(), vec![("Bob".to_string(), "a.md".to_string())]);
        assert_eq!(engine.occurrences_for("Bob").len(), 1);
    }

    #[tokio::test]
    async fn test_ineligible_paths_ignored() {
        let (engine, documents) = engine_with(&[("image.png", "@Alice")]);
        engine.initialize().await.unwrap();

        documents.insert("notes.txt", "@Bob");
        let outcome = engine.document_created("notes.txt").await.unwrap();

        assert_eq!(outcome, ChangeOutcome::Ignored);
        assert_eq!(engine.mention_names().len(), 1);
    }

    #[tokio::test]
    async fn test_corpus_ready_reloads_only_after_empty_start() {
        let (engine, documents) = engine_with(&[]);
        engine.initialize().await.unwrap();

        documents.insert("late.md", "@Late");
        let outcome = engine.corpus_ready().await.unwrap();
        assert!(matches!(outcome, ChangeOutcome::Loaded(ref r) if r.reindexed == 1));
        assert!(engine.mention_names().contains("Late"));

        assert_eq!(engine.corpus_ready().await.unwrap(), ChangeOutcome::Ignored);
    }

    #[tokio::test]
    async fn test_corpus_ready_ignored_when_start_was_not_empty() {
        let (engine, _) = engine_with(&[("a.md", "@A")]);
        engine.initialize().await.unwrap();

        assert_eq!(engine.corpus_ready().await.unwrap(), ChangeOutcome::Ignored);
    }

    #[tokio::test]
    async fn test_primary_mention_renamed_in_config() {
        let documents = Arc::new(MemoryDocumentStore::new());
        let store = Arc::new(IndexStore::in_memory());
        store.put_mention(Mention::primary("OldMe"));

        let config = MentionConfig {
            primary_mention: "Me".to_string(),
            ..Default::default()
        };
        let engine = IndexEngine::new(config, documents, store).unwrap();
        engine.initialize().await.unwrap();

        let names = engine.mention_names();
        assert!(names.contains("Me"));
        assert!(!names.contains("OldMe"));
    }

    #[tokio::test]
    async fn test_shutdown_rejects_mutations() {
        let (engine, _) = engine_with(&[]);
        engine.initialize().await.unwrap();
        engine.shutdown().await.unwrap();

        assert!(engine.is_shut_down());
        assert!(matches!(
            engine.document_changed("a.md").await,
            Err(IndexerError::ShutDown)
        ));
        engine.shutdown().await.unwrap();
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = MentionConfig {
            trigger_phrase: String::new(),
            ..Default::default()
        };
        let result = IndexEngine::new(
            config,
            Arc::new(MemoryDocumentStore::new()),
            Arc::new(IndexStore::in_memory()),
        );
        assert!(matches!(result, Err(IndexerError::Config(_))));
    }
}
