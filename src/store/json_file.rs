//! JSON file backend for the progress table.
//!
//! Layout: one JSON object keyed by user id, each value a `ProgressRecord`
//! (`completed_steps` as a sorted array, `feedback_scores` as an object keyed
//! by step index, timestamps RFC 3339 UTC). Writes go to a sibling temp file
//! which is fsynced and renamed over the target, so a crash leaves either the
//! old or the new table on disk.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use super::traits::{ProgressStore, ProgressTable};
use crate::error::StoreError;
use crate::tutorial::model::ProgressRecord;

/// File-backed progress store.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }

    fn io_error(&self, path: &Path, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

#[async_trait]
impl ProgressStore for JsonFileStore {
    async fn load(&self) -> Result<ProgressTable, StoreError> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "No progress file yet, starting empty");
                return Ok(ProgressTable::new());
            }
            Err(e) => return Err(self.io_error(&self.path, e)),
        };

        let parsed: BTreeMap<String, ProgressRecord> =
            serde_json::from_str(&raw).map_err(|e| StoreError::Corrupt {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            })?;

        if let Some((key, record)) = parsed.iter().find(|(k, r)| **k != r.user_id) {
            return Err(StoreError::Corrupt {
                path: self.path.display().to_string(),
                reason: format!("entry {key:?} holds record for user {:?}", record.user_id),
            });
        }

        info!(path = %self.path.display(), records = parsed.len(), "Progress table loaded");
        Ok(parsed.into_iter().collect())
    }

    async fn save_all(&self, records: &ProgressTable) -> Result<(), StoreError> {
        // Sorted keys keep the file diff-friendly.
        let ordered: BTreeMap<&String, &ProgressRecord> = records.iter().collect();
        let json = serde_json::to_string_pretty(&ordered)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(parent, e))?;
        }

        let temp_path = self.temp_path();
        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| self.io_error(&temp_path, e))?;
        file.write_all(json.as_bytes())
            .await
            .map_err(|e| self.io_error(&temp_path, e))?;
        file.sync_all()
            .await
            .map_err(|e| self.io_error(&temp_path, e))?;
        drop(file);

        fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| self.io_error(&self.path, e))?;

        debug!(path = %self.path.display(), records = records.len(), "Progress table saved");
        Ok(())
    }
}
