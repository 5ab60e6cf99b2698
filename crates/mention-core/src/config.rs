//! Configuration for the mention index.

use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MentionConfig {
    /// Literal that starts a mention token
    #[serde(default = "default_trigger_phrase")]
    pub trigger_phrase: String,

    /// Name of the self mention that always exists
    #[serde(default = "default_primary_mention")]
    pub primary_mention: String,

    /// Path prefixes that are never indexed
    #[serde(default)]
    pub ignored_paths: Vec<String>,

    /// Document extensions eligible for indexing (without the dot)
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Data directory for the persisted index
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Filesystem watching
    #[serde(default)]
    pub watch: WatchConfig,
}

/// Filesystem watch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Debounce window for filesystem events in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

fn default_trigger_phrase() -> String {
    "@".to_string()
}

fn default_primary_mention() -> String {
    "Me".to_string()
}

fn default_extensions() -> Vec<String> {
    vec!["md".to_string()]
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mentions")
}

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mentions")
        .join("config.yaml")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_debounce_ms() -> u64 {
    500
}

impl Default for MentionConfig {
    fn default() -> Self {
        Self {
            trigger_phrase: default_trigger_phrase(),
            primary_mention: default_primary_mention(),
            ignored_paths: Vec::new(),
            extensions: default_extensions(),
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            watch: WatchConfig::default(),
        }
    }
}

impl MentionConfig {
    /// Load configuration from the default location.
    ///
    /// A missing file yields the defaults; a file that exists but cannot be
    /// read, parsed or validated is an error.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = default_config_path();

        if config_path.exists() {
            return Self::load_from(&config_path);
        }

        tracing::debug!(path = ?config_path, "No config file, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config: Self =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        config.normalize();
        config.validate()?;

        tracing::debug!(path = ?path, "Loaded config");

        Ok(config)
    }

    /// Reject settings the indexer cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trigger_phrase.is_empty() {
            return Err(ConfigError::EmptyTrigger);
        }
        if self
            .trigger_phrase
            .chars()
            .any(|c| c.is_whitespace() || c == '"')
        {
            return Err(ConfigError::InvalidTrigger(self.trigger_phrase.clone()));
        }

        if !is_valid_mention_name(&self.primary_mention) {
            return Err(ConfigError::InvalidPrimaryMention(
                self.primary_mention.clone(),
            ));
        }

        if self.extensions.iter().all(|e| e.trim().is_empty()) {
            return Err(ConfigError::NoExtensions);
        }

        Ok(())
    }

    /// Normalize ignored paths (trailing `/`) and extensions (no dot, lowercase).
    pub fn normalize(&mut self) {
        self.ignored_paths = self
            .ignored_paths
            .iter()
            .filter_map(|p| normalize_prefix(p))
            .collect();

        self.extensions = self
            .extensions
            .iter()
            .map(|e| e.trim().trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
    }

    /// Whether a corpus-relative path lies under an ignored prefix.
    pub fn is_excluded(&self, path: &str) -> bool {
        self.ignored_paths
            .iter()
            .filter_map(|p| normalize_prefix(p))
            .any(|prefix| path.starts_with(&prefix))
    }

    /// Whether a corpus-relative path should be indexed at all.
    pub fn is_eligible(&self, path: &str) -> bool {
        if self.is_excluded(path) {
            return false;
        }

        let extension = match Path::new(path).extension().and_then(|e| e.to_str()) {
            Some(ext) => ext.to_lowercase(),
            None => return false,
        };

        self.extensions
            .iter()
            .any(|e| e.trim().trim_start_matches('.').eq_ignore_ascii_case(&extension))
    }

    /// Directory holding persisted index data.
    pub fn index_dir(&self) -> PathBuf {
        self.data_dir.join("index")
    }
}

/// Whether `name` can be written as a mention token.
///
/// Names are stored exactly as written after the trigger, so a name with
/// spaces keeps its quotes: `Bob`, `"Jane Doe"`.
pub fn is_valid_mention_name(name: &str) -> bool {
    let name_char = |c: char| c.is_alphabetic() || c.is_ascii_digit() || matches!(c, '-' | '_' | ',');

    match name.strip_prefix('"').and_then(|n| n.strip_suffix('"')) {
        Some(inner) => !inner.is_empty() && inner.chars().all(|c| name_char(c) || c == ' '),
        None => !name.is_empty() && name.chars().all(name_char),
    }
}

fn normalize_prefix(prefix: &str) -> Option<String> {
    let trimmed = prefix.trim().trim_start_matches("./").trim_start_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.ends_with('/') {
        Some(trimmed.to_string())
    } else {
        Some(format!("{}/", trimmed))
    }
}
