//! Mention token extraction.
//!
//! A mention is the trigger literal followed by either a bare run of
//! letters, digits, `-`, `_` and `,`, or a double-quoted run that may also
//! contain spaces:
//!
//! ```text
//! @Alice  @team-lead  @"Jane Doe"
//! ```
//!
//! A trigger that starts with punctuation must not follow a word character,
//! so `mail@example` is not a mention. A trigger that starts with a word
//! character must start a word, so `cc:Bob` matches but `xcc:Bob` does not.
//! The mention name is the token without the trigger; quotes stay, so
//! `@"Bob"` and `@Bob` are different mentions. Offsets are byte offsets into
//! the line.

use crate::IndexerError;
use mention_core::ConfigError;
use regex::{Matches, Regex};

/// Prefix of a closed checklist item.
const TASK_COMPLETE_PREFIX: &str = "- [x]";

/// One mention token found in a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenMatch<'h> {
    /// Full token text including the trigger
    pub token: &'h str,
    /// Mention name: the token without the trigger
    pub name: &'h str,
    /// Byte offset of the token start within the line
    pub start: usize,
    /// Byte offset one past the token end within the line
    pub end: usize,
}

/// Compiled extractor for one trigger phrase.
#[derive(Debug, Clone)]
pub struct TokenExtractor {
    trigger: String,
    pattern: Regex,
}

impl TokenExtractor {
    /// Compile an extractor for `trigger`.
    pub fn new(trigger: &str) -> Result<Self, IndexerError> {
        if trigger.is_empty() {
            return Err(ConfigError::EmptyTrigger.into());
        }

        let boundary = match trigger.chars().next() {
            Some(c) if is_word_char(c) => r"\b",
            _ => r"\B",
        };
        let escaped = regex::escape(trigger);
        let pattern = Regex::new(&format!(
            r#"{boundary}{escaped}(?:[\p{{L}}0-9_,\-]+|"[\p{{L}}0-9_,\- ]+")"#
        ))
        .map_err(|_| ConfigError::InvalidTrigger(trigger.to_string()))?;

        Ok(Self {
            trigger: trigger.to_string(),
            pattern,
        })
    }

    /// The trigger phrase this extractor matches.
    pub fn trigger(&self) -> &str {
        &self.trigger
    }

    /// Cheap pre-check: content without the trigger literal has no mentions.
    pub fn may_contain_mentions(&self, content: &str) -> bool {
        content.contains(self.trigger.as_str())
    }

    /// Scan `line` left to right. Calling again restarts the scan.
    pub fn matches<'r, 'h>(&'r self, line: &'h str) -> TokenMatches<'r, 'h> {
        TokenMatches {
            inner: self.pattern.find_iter(line),
            trigger_len: self.trigger.len(),
        }
    }
}

/// Lazy iterator over the mention tokens of one line.
pub struct TokenMatches<'r, 'h> {
    inner: Matches<'r, 'h>,
    trigger_len: usize,
}

impl<'r, 'h> Iterator for TokenMatches<'r, 'h> {
    type Item = TokenMatch<'h>;

    fn next(&mut self) -> Option<Self::Item> {
        let whole = self.inner.next()?;
        let token = whole.as_str();

        Some(TokenMatch {
            token,
            name: &token[self.trigger_len..],
            start: whole.start(),
            end: whole.end(),
        })
    }
}

/// Extract every mention token of `line` for a one-off trigger.
pub fn extract<'h>(line: &'h str, trigger: &str) -> Result<Vec<TokenMatch<'h>>, IndexerError> {
    let extractor = TokenExtractor::new(trigger)?;
    Ok(extractor.matches(line).collect())
}

/// Whether `c` counts as a word character for `\b` and `\B`.
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Whether a line is a closed checklist item (`- [x] ...`).
pub fn is_completed_task(line: &str) -> bool {
    line.trim_start().starts_with(TASK_COMPLETE_PREFIX)
}

/// A line of a document with its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentLine<'a> {
    /// 1-based line number
    pub number: usize,
    /// Byte offset of the line start within the document
    pub start: usize,
    /// Byte offset of the line end (excluding the line break)
    pub end: usize,
    /// Line text without the line break
    pub text: &'a str,
}

/// Split a document into lines, keeping byte offsets.
///
/// Lines are separated by `\n`; a trailing `\r` is not part of the text.
pub fn document_lines(content: &str) -> impl Iterator<Item = DocumentLine<'_>> {
    let mut offset = 0;
    content.split('\n').enumerate().map(move |(index, raw)| {
        let start = offset;
        offset += raw.len() + 1;
        let text = raw.strip_suffix('\r').unwrap_or(raw);
        DocumentLine {
            number: index + 1,
            start,
            end: start + text.len(),
            text,
        }
    })
}
