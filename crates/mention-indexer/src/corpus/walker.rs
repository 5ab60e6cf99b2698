//! Corpus enumeration.
//!
//! Hidden entries and anything matched by `.gitignore`, `.ignore` or the
//! global git excludes never reach the index.

use ignore::{DirEntry, WalkBuilder};
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::trace;

/// A regular file found under the corpus root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: PathBuf,
    /// Milliseconds since the Unix epoch
    pub mtime: i64,
}

/// Lists the files of a corpus.
#[derive(Debug, Clone)]
pub struct Walker {
    root: PathBuf,
    follow_symlinks: bool,
}

impl Walker {
    pub fn new(root: &Path, follow_symlinks: bool) -> Self {
        Self {
            root: root.to_path_buf(),
            follow_symlinks,
        }
    }

    /// Every visible, non-ignored regular file, ordered by path.
    ///
    /// Entries that cannot be read are left out.
    pub fn walk(&self) -> Vec<FileEntry> {
        let mut files: Vec<FileEntry> = WalkBuilder::new(&self.root)
            .standard_filters(true)
            .follow_links(self.follow_symlinks)
            .build()
            .filter_map(|result| match result {
                Ok(entry) => to_file_entry(entry),
                Err(e) => {
                    trace!(error = %e, "Skipping unreadable entry");
                    None
                }
            })
            .collect();

        files.sort_by(|a, b| a.path.cmp(&b.path));
        files
    }
}

fn to_file_entry(entry: DirEntry) -> Option<FileEntry> {
    if !entry.file_type()?.is_file() {
        return None;
    }
    let mtime = mtime_millis(&entry.metadata().ok()?);
    Some(FileEntry {
        path: entry.into_path(),
        mtime,
    })
}

/// Modification time of `metadata` in milliseconds since the Unix epoch, or 0.
pub(crate) fn mtime_millis(metadata: &Metadata) -> i64 {
    metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |d| d.as_millis() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn relative_names(root: &Path, entries: &[FileEntry]) -> Vec<String> {
        entries
            .iter()
            .map(|e| {
                e.path
                    .strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn test_empty_corpus() {
        let vault = tempdir().unwrap();
        assert!(Walker::new(vault.path(), false).walk().is_empty());
    }

    #[test]
    fn test_ignored_and_hidden_notes_skipped() {
        let vault = tempdir().unwrap();
        let root = vault.path();

        // ignore files apply inside a git work tree
        fs::create_dir(root.join(".git")).unwrap();
        fs::write(root.join(".gitignore"), "archive/\n").unwrap();
        fs::create_dir_all(root.join("archive")).unwrap();
        fs::create_dir_all(root.join(".obsidian")).unwrap();
        fs::write(root.join("archive/old.md"), "@Old").unwrap();
        fs::write(root.join(".obsidian/workspace.md"), "@Hidden").unwrap();
        fs::write(root.join(".draft.md"), "@Draft").unwrap();
        fs::write(root.join("today.md"), "@Today").unwrap();

        let entries = Walker::new(root, false).walk();
        assert_eq!(relative_names(root, &entries), vec!["today.md"]);
    }

    #[test]
    fn test_nested_notes_sorted_with_mtime() {
        let vault = tempdir().unwrap();
        let root = vault.path();

        fs::create_dir_all(root.join("projects/alpha")).unwrap();
        fs::write(root.join("projects/alpha/plan.md"), "@Alice").unwrap();
        fs::write(root.join("inbox.md"), "").unwrap();
        fs::write(root.join("zettel.md"), "").unwrap();

        let entries = Walker::new(root, false).walk();

        assert_eq!(
            relative_names(root, &entries),
            vec!["inbox.md", "projects/alpha/plan.md", "zettel.md"]
        );
        assert!(entries.iter().all(|e| e.mtime > 0));
    }
}
