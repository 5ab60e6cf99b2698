//! Records held by the index store.

use crate::fingerprint::Fingerprint;
use serde::{Deserialize, Serialize};

/// A named entity referenced by mention tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mention {
    /// Mention name (token without trigger)
    pub name: String,
    /// The self mention; never garbage-collected
    pub is_primary: bool,
    /// Fingerprint over the line texts of all current occurrences
    pub occurrence_fingerprint: Option<Fingerprint>,
}

impl Mention {
    /// A mention seen for the first time.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_primary: false,
            occurrence_fingerprint: None,
        }
    }

    /// The primary (self) mention.
    pub fn primary(name: impl Into<String>) -> Self {
        Self {
            is_primary: true,
            ..Self::new(name)
        }
    }
}

/// One appearance of a mention in a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    /// Name of the mention
    pub mention: String,
    /// Corpus-relative document path
    pub path: String,
    /// 1-based line number
    pub line_number: usize,
    /// Byte offset of the line start within the document
    pub line_start: usize,
    /// Byte offset of the line end within the document
    pub line_end: usize,
    /// Byte offset of the token start within the line
    pub start: usize,
    /// Byte offset one past the token end within the line
    pub end: usize,
    /// Full line text
    pub text: String,
    /// Whether the line is a closed checklist item
    pub is_task_complete: bool,
}

impl Occurrence {
    /// Store key of this occurrence.
    pub fn key(&self) -> OccurrenceKey {
        OccurrenceKey {
            path: self.path.clone(),
            line_number: self.line_number,
            line_start: self.line_start,
            start: self.start,
        }
    }

    /// Whether `offset` on `line` falls inside the token.
    pub fn covers(&self, line: usize, offset: usize) -> bool {
        self.line_number == line && self.start <= offset && offset < self.end
    }
}

/// Identity of an occurrence. Orders by path first so a path is a contiguous range.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OccurrenceKey {
    pub path: String,
    pub line_number: usize,
    pub line_start: usize,
    pub start: usize,
}

impl OccurrenceKey {
    /// Smallest key for `path`.
    pub fn path_start(path: &str) -> Self {
        Self {
            path: path.to_string(),
            line_number: 0,
            line_start: 0,
            start: 0,
        }
    }

    /// Largest key for `path`.
    pub fn path_end(path: &str) -> Self {
        Self {
            path: path.to_string(),
            line_number: usize::MAX,
            line_start: usize::MAX,
            start: usize::MAX,
        }
    }
}

/// Per-document bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFingerprint {
    /// Corpus-relative document path
    pub path: String,
    /// Fingerprint of the document content at last index
    pub fingerprint: Fingerprint,
    /// Last known modification time (milliseconds since the Unix epoch)
    pub mtime: i64,
}
