//! File system watcher feeding corpus events to the engine.
//!
//! Uses FSEvents on macOS and inotify on Linux, debounced so that an editor
//! save produces one event. Renames are reported as a single
//! [`CorpusEvent::Renamed`] when both ends are inside the root.

use crate::corpus::{relative_path, CorpusEvent};
use crate::IndexerError;
use mention_core::WatchConfig;
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode};
use notify_debouncer_full::{new_debouncer, DebounceEventResult, Debouncer, RecommendedCache};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Events buffered before the debouncer thread blocks.
const EVENT_BUFFER: usize = 1024;

/// Debounced, recursive watch over one corpus root.
///
/// Watching stops when the value is dropped.
pub struct FileWatcher {
    root: PathBuf,
    events: mpsc::Receiver<CorpusEvent>,
    _debouncer: Debouncer<RecommendedWatcher, RecommendedCache>,
}

impl FileWatcher {
    /// Start watching `root` with the configured debounce window.
    pub fn start(root: &Path, config: &WatchConfig) -> Result<Self, IndexerError> {
        let root = root
            .canonicalize()
            .map_err(|_| IndexerError::NotFound(root.to_path_buf()))?;

        let (sender, events) = mpsc::channel(EVENT_BUFFER);
        let event_root = root.clone();

        let handler = move |result: DebounceEventResult| {
            let batch = match result {
                Ok(batch) => batch,
                Err(errors) => {
                    for e in errors {
                        warn!(error = %e, "Watch backend reported an error");
                    }
                    return;
                }
            };

            for change in batch
                .iter()
                .filter_map(|debounced| convert_event(&event_root, &debounced.event))
            {
                // Receiver gone means the watcher is being dropped
                if sender.blocking_send(change).is_err() {
                    return;
                }
            }
        };

        let mut debouncer =
            new_debouncer(Duration::from_millis(config.debounce_ms), None, handler)
                .map_err(|e| IndexerError::Watcher(e.to_string()))?;
        debouncer
            .watch(&root, RecursiveMode::Recursive)
            .map_err(|e| IndexerError::Watcher(e.to_string()))?;

        info!(root = ?root, debounce_ms = config.debounce_ms, "Watching corpus");

        Ok(Self {
            root,
            events,
            _debouncer: debouncer,
        })
    }

    /// Canonical root being watched.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Wait for the next corpus event.
    pub async fn next(&mut self) -> Option<CorpusEvent> {
        self.events.recv().await
    }

    /// Take an already queued event, if any.
    pub fn try_next(&mut self) -> Option<CorpusEvent> {
        self.events.try_recv().ok()
    }
}

/// Convert a notify event into a corpus event relative to `root`.
fn convert_event(root: &Path, event: &Event) -> Option<CorpusEvent> {
    let relative = |path: &PathBuf| relative_path(root, path);

    let change = match &event.kind {
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let from = event.paths.first()?;
            let to = event.paths.get(1)?;
            if to.is_dir() {
                return None;
            }
            match (relative(from), relative(to)) {
                (Some(from), Some(to)) => CorpusEvent::Renamed { from, to },
                (Some(from), None) => CorpusEvent::Deleted(from),
                (None, Some(to)) => CorpusEvent::Created(to),
                (None, None) => return None,
            }
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            CorpusEvent::Deleted(relative(event.paths.first()?)?)
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            let path = event.paths.first()?;
            if path.is_dir() {
                return None;
            }
            CorpusEvent::Created(relative(path)?)
        }
        EventKind::Modify(ModifyKind::Name(_)) => {
            // One-sided rename without direction: decide by existence
            let path = event.paths.first()?;
            if path.is_dir() {
                return None;
            }
            if path.exists() {
                CorpusEvent::Created(relative(path)?)
            } else {
                CorpusEvent::Deleted(relative(path)?)
            }
        }
        EventKind::Create(_) => {
            let path = event.paths.first()?;
            if path.is_dir() {
                return None;
            }
            CorpusEvent::Created(relative(path)?)
        }
        EventKind::Modify(_) => {
            let path = event.paths.first()?;
            if path.is_dir() {
                return None;
            }
            CorpusEvent::Changed(relative(path)?)
        }
        EventKind::Remove(_) => CorpusEvent::Deleted(relative(event.paths.first()?)?),
        EventKind::Any | EventKind::Access(_) | EventKind::Other => return None,
    };

    debug!(event = ?change, "Corpus change detected");

    Some(change)
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, RemoveKind};
    use tempfile::tempdir;

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        Event {
            kind,
            paths: paths.iter().map(PathBuf::from).collect(),
            attrs: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_start_on_existing_root() {
        let vault = tempdir().unwrap();
        let mut watcher = FileWatcher::start(vault.path(), &WatchConfig::default()).unwrap();

        assert_eq!(watcher.root(), vault.path().canonicalize().unwrap());
        assert!(watcher.try_next().is_none());
    }

    #[tokio::test]
    async fn test_new_note_is_reported() {
        let vault = tempdir().unwrap();
        let config = WatchConfig { debounce_ms: 50 };
        let mut watcher = FileWatcher::start(vault.path(), &config).unwrap();

        std::fs::write(vault.path().join("note.md"), "@Alice").unwrap();

        let change = tokio::time::timeout(Duration::from_secs(10), watcher.next())
            .await
            .expect("no event within the timeout")
            .expect("watcher channel closed");
        assert_eq!(change.path(), Some("note.md"));
    }

    #[test]
    fn test_start_on_missing_root() {
        let result = FileWatcher::start(Path::new("/definitely/not/here"), &WatchConfig::default());
        assert!(matches!(result, Err(IndexerError::NotFound(_))));
    }

    #[test]
    fn test_convert_create() {
        let change = convert_event(
            Path::new("/vault"),
            &event(EventKind::Create(CreateKind::File), &["/vault/notes/a.md"]),
        );
        assert_eq!(change, Some(CorpusEvent::Created("notes/a.md".into())));
    }

    #[test]
    fn test_convert_modify() {
        let change = convert_event(
            Path::new("/vault"),
            &event(
                EventKind::Modify(ModifyKind::Data(DataChange::Content)),
                &["/vault/a.md"],
            ),
        );
        assert_eq!(change, Some(CorpusEvent::Changed("a.md".into())));
    }

    #[test]
    fn test_convert_delete() {
        let change = convert_event(
            Path::new("/vault"),
            &event(EventKind::Remove(RemoveKind::File), &["/vault/a.md"]),
        );
        assert_eq!(change, Some(CorpusEvent::Deleted("a.md".into())));
    }

    #[test]
    fn test_convert_rename_both() {
        let change = convert_event(
            Path::new("/vault"),
            &event(
                EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
                &["/vault/a.md", "/vault/b.md"],
            ),
        );
        assert_eq!(
            change,
            Some(CorpusEvent::Renamed {
                from: "a.md".into(),
                to: "b.md".into()
            })
        );
    }

    #[test]
    fn test_convert_rename_out_of_root_is_delete() {
        let change = convert_event(
            Path::new("/vault"),
            &event(
                EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
                &["/vault/a.md", "/trash/a.md"],
            ),
        );
        assert_eq!(change, Some(CorpusEvent::Deleted("a.md".into())));
    }

    #[test]
    fn test_convert_rename_halves() {
        let from = convert_event(
            Path::new("/vault"),
            &event(
                EventKind::Modify(ModifyKind::Name(RenameMode::From)),
                &["/vault/a.md"],
            ),
        );
        let to = convert_event(
            Path::new("/vault"),
            &event(
                EventKind::Modify(ModifyKind::Name(RenameMode::To)),
                &["/vault/b.md"],
            ),
        );
        assert_eq!(from, Some(CorpusEvent::Deleted("a.md".into())));
        assert_eq!(to, Some(CorpusEvent::Created("b.md".into())));
    }

    #[test]
    fn test_convert_outside_root_ignored() {
        let change = convert_event(
            Path::new("/vault"),
            &event(EventKind::Create(CreateKind::File), &["/other/a.md"]),
        );
        assert!(change.is_none());
    }

    #[test]
    fn test_convert_access_ignored() {
        let change = convert_event(
            Path::new("/vault"),
            &event(EventKind::Access(AccessKind::Read), &["/vault/a.md"]),
        );
        assert!(change.is_none());
    }
}
