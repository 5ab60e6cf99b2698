//! On-disk layout of the index store.
//!
//! `manifest.json` carries the schema version and is written last;
//! `index.msgpack` holds the three tables.

use crate::model::{FileFingerprint, Mention, Occurrence};
use crate::IndexerError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

/// Version of the persisted table format. Bump on any record layout change.
pub const SCHEMA_VERSION: u32 = 1;

const MANIFEST_FILE: &str = "manifest.json";
const TABLES_FILE: &str = "index.msgpack";

/// Describes a persisted index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub schema_version: u32,
    pub saved_at: DateTime<Utc>,
    pub mentions: usize,
    pub occurrences: usize,
    pub files: usize,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub(super) struct PersistedTables {
    pub mentions: Vec<Mention>,
    pub occurrences: Vec<Occurrence>,
    pub files: Vec<FileFingerprint>,
}

/// Load persisted tables. `None` means there is nothing usable to load.
pub(super) async fn load(dir: &Path) -> Result<Option<PersistedTables>, IndexerError> {
    let manifest_path = dir.join(MANIFEST_FILE);
    if !manifest_path.exists() {
        debug!(path = ?manifest_path, "No persisted index");
        return Ok(None);
    }

    let json = tokio::fs::read_to_string(&manifest_path).await?;
    let manifest: Manifest = serde_json::from_str(&json)
        .map_err(|e| IndexerError::Storage(format!("corrupt manifest: {}", e)))?;

    if manifest.schema_version != SCHEMA_VERSION {
        warn!(
            found = manifest.schema_version,
            expected = SCHEMA_VERSION,
            "Index schema changed, rebuilding"
        );
        return Ok(None);
    }

    let tables_path = dir.join(TABLES_FILE);
    if !tables_path.exists() {
        return Err(IndexerError::Storage(format!(
            "manifest present but {} is missing",
            tables_path.display()
        )));
    }

    let data = tokio::fs::read(&tables_path).await?;
    let tables: PersistedTables = rmp_serde::from_slice(&data)
        .map_err(|e| IndexerError::Storage(format!("corrupt index tables: {}", e)))?;

    info!(
        path = ?dir,
        mentions = tables.mentions.len(),
        occurrences = tables.occurrences.len(),
        files = tables.files.len(),
        "Loaded persisted index"
    );

    Ok(Some(tables))
}

/// Write tables then manifest, each atomically.
pub(super) async fn save(dir: &Path, tables: &PersistedTables) -> Result<(), IndexerError> {
    tokio::fs::create_dir_all(dir).await?;

    let data = rmp_serde::to_vec(tables)?;
    let temp_path = dir.join(".index.msgpack.tmp");
    tokio::fs::write(&temp_path, &data).await?;
    tokio::fs::rename(&temp_path, dir.join(TABLES_FILE)).await?;

    let manifest = Manifest {
        schema_version: SCHEMA_VERSION,
        saved_at: Utc::now(),
        mentions: tables.mentions.len(),
        occurrences: tables.occurrences.len(),
        files: tables.files.len(),
    };
    let json = serde_json::to_string_pretty(&manifest)?;
    let temp_path = dir.join(".manifest.json.tmp");
    tokio::fs::write(&temp_path, &json).await?;
    tokio::fs::rename(&temp_path, dir.join(MANIFEST_FILE)).await?;

    debug!(path = ?dir, size = data.len(), "Saved index");

    Ok(())
}
