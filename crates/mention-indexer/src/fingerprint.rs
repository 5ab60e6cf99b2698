//! Content fingerprints.
//!
//! SHA-256 truncated to 64 bits. Used to decide whether a document needs
//! reindexing and whether a mention's visible occurrences changed.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// A 64-bit content fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint(u64);

impl Fingerprint {
    /// Raw fingerprint value.
    pub fn value(&self) -> u64 {
        self.0
    }

    fn from_digest(hasher: Sha256) -> Self {
        let digest = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        Self(u64::from_be_bytes(bytes))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Fingerprint of a whole document.
pub fn document_fingerprint(content: &str) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Fingerprint::from_digest(hasher)
}

/// Fingerprint of a mention's occurrence set, given each occurrence's line text.
///
/// Order of the input does not matter.
pub fn occurrence_fingerprint<'a, I>(texts: I) -> Fingerprint
where
    I: IntoIterator<Item = &'a str>,
{
    let mut texts: Vec<&str> = texts.into_iter().collect();
    texts.sort_unstable();

    let mut hasher = Sha256::new();
    hasher.update((texts.len() as u64).to_le_bytes());
    for text in texts {
        hasher.update((text.len() as u64).to_le_bytes());
        hasher.update(text.as_bytes());
    }
    Fingerprint::from_digest(hasher)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_fingerprint() {
        let fp1 = document_fingerprint("hello world");
        let fp2 = document_fingerprint("hello world");
        let fp3 = document_fingerprint("different");

        assert_eq!(fp1, fp2);
        assert_ne!(fp1, fp3);
        assert_eq!(fp1.to_string().len(), 16);
    }

    #[test]
    fn test_document_fingerprint_known_value() {
        // sha256("") = e3b0c44298fc1c14...
        assert_eq!(document_fingerprint("").to_string(), "e3b0c44298fc1c14");
    }

    #[test]
    fn test_occurrence_fingerprint_ignores_order() {
        let a = occurrence_fingerprint(["- call @Bob", "@Bob said hi"]);
        let b = occurrence_fingerprint(["@Bob said hi", "- call @Bob"]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_occurrence_fingerprint_is_unambiguous() {
        let joined = occurrence_fingerprint(["ab"]);
        let split = occurrence_fingerprint(["a", "b"]);
        assert_ne!(joined, split);
    }

    #[test]
    fn test_occurrence_fingerprint_counts_duplicates() {
        let once = occurrence_fingerprint(["@Alice"]);
        let twice = occurrence_fingerprint(["@Alice", "@Alice"]);
        assert_ne!(once, twice);
    }

    #[test]
    fn test_empty_occurrence_set() {
        let empty: [&str; 0] = [];
        assert_eq!(occurrence_fingerprint(empty), occurrence_fingerprint(empty));
        assert_ne!(occurrence_fingerprint(empty), occurrence_fingerprint([""]));
    }
}
