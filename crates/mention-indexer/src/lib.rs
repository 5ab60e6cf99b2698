//! Mention Indexer
//!
//! This crate keeps an index of `@name` mentions across a corpus of
//! documents, including:
//! - Token extraction with a configurable trigger phrase
//! - An ordered, persisted store of mentions, occurrences and file fingerprints
//! - An incremental engine reacting to create, change, delete and rename events
//! - Change notifications driven by occurrence fingerprints
//! - File system enumeration and debounced watching

pub mod corpus;
pub mod dispatcher;
pub mod engine;
mod error;
pub mod extract;
pub mod fingerprint;
pub mod model;
pub mod store;
pub mod watcher;

pub use corpus::{CorpusEvent, DocumentMeta, DocumentStore, FsDocumentStore, MemoryDocumentStore};
pub use dispatcher::{ChangeCallback, ChangeDispatcher, SubscriptionId};
pub use engine::{ChangeOutcome, IndexEngine, LoadReport};
pub use error::IndexerError;
pub use extract::{extract, is_completed_task, TokenExtractor, TokenMatch};
pub use fingerprint::{document_fingerprint, occurrence_fingerprint, Fingerprint};
pub use model::{FileFingerprint, Mention, Occurrence, OccurrenceKey};
pub use store::{IndexStore, StoreStats};
pub use watcher::FileWatcher;
