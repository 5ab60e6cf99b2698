//! Single-path form of the walker's filters.
//!
//! Events name one path at a time, so the ignore rules the walker applies
//! while descending are re-evaluated here for that path alone: hidden
//! components, `.ignore` files, and inside a git work tree `.gitignore`,
//! `.git/info/exclude` and the global excludes file.

use ignore::gitignore::Gitignore;
use ignore::Match;
use std::path::{Path, PathBuf};

/// Decides whether the walker would list a corpus-relative path.
#[derive(Debug)]
pub struct IgnoreFilter {
    root: PathBuf,
    in_git: bool,
    /// Matchers from directories above the root, deepest first
    outer: Vec<(PathBuf, Gitignore)>,
    global: Option<Gitignore>,
}

impl IgnoreFilter {
    pub fn new(root: &Path) -> Self {
        let git_top = root.ancestors().find(|dir| dir.join(".git").exists());
        let in_git = git_top.is_some();

        let mut outer = Vec::new();
        for dir in root.ancestors().skip(1) {
            for file in ignore_file_names(in_git) {
                if let Some(matcher) = load(&dir.join(file)) {
                    outer.push((dir.to_path_buf(), matcher));
                }
            }
            if Some(dir) == git_top {
                break;
            }
        }

        let mut global = None;
        if let Some(top) = git_top {
            if let Some(matcher) = load(&top.join(".git/info/exclude")) {
                outer.push((top.to_path_buf(), matcher));
            }
            let (matcher, _) = Gitignore::global();
            global = (!matcher.is_empty()).then_some(matcher);
        }

        Self {
            root: root.to_path_buf(),
            in_git,
            outer,
            global,
        }
    }

    /// Whether `path` (relative, `/`-separated) is hidden or ignored.
    pub fn is_ignored(&self, path: &str) -> bool {
        let relative = Path::new(path);

        let hidden = relative
            .components()
            .any(|c| c.as_os_str().to_string_lossy().starts_with('.'));
        if hidden {
            return true;
        }

        // Ignore files inside the root are read on each call; they change.
        for dir in relative.ancestors().skip(1) {
            let Ok(below) = relative.strip_prefix(dir) else {
                continue;
            };
            for file in ignore_file_names(self.in_git) {
                if let Some(matcher) = load(&self.root.join(dir).join(file)) {
                    if let Some(ignored) = decide(&matcher, below) {
                        return ignored;
                    }
                }
            }
        }

        for (dir, matcher) in &self.outer {
            let below = match self.root.strip_prefix(dir) {
                Ok(prefix) => prefix.join(relative),
                Err(_) => continue,
            };
            if let Some(ignored) = decide(matcher, &below) {
                return ignored;
            }
        }

        self.global
            .as_ref()
            .and_then(|matcher| decide(matcher, relative))
            .unwrap_or(false)
    }
}

/// Ignore files consulted per directory, highest precedence first.
fn ignore_file_names(in_git: bool) -> &'static [&'static str] {
    if in_git {
        &[".ignore", ".gitignore"]
    } else {
        &[".ignore"]
    }
}

fn load(file: &Path) -> Option<Gitignore> {
    if !file.is_file() {
        return None;
    }
    let (matcher, _) = Gitignore::new(file);
    (!matcher.is_empty()).then_some(matcher)
}

/// `Some(true)` if ignored, `Some(false)` if whitelisted, `None` if unmatched.
fn decide(matcher: &Gitignore, relative: &Path) -> Option<bool> {
    match matcher.matched_path_or_any_parents(relative, false) {
        Match::Ignore(_) => Some(true),
        Match::Whitelist(_) => Some(false),
        Match::None => None,
    }
}
