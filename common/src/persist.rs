// Durable job definition store
//
// Keeps the active job definitions in one JSON file. Writes go through a
// temp file and rename so a crash mid-write leaves the previous snapshot
// intact. Load never fails: a missing or corrupt file is an empty set.

use crate::errors::PersistenceError;
use crate::models::PersistedJob;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

pub struct JobStore {
    path: PathBuf,
}

impl JobStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all persisted job records.
    ///
    /// Startup must never be blocked by the store, so read and parse
    /// failures are logged and produce an empty set instead of an error.
    #[tracing::instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn load(&self) -> Vec<PersistedJob> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::debug!("No job store file yet; starting with an empty set");
                return Vec::new();
            }
            Err(err) => {
                tracing::warn!(error = %err, "Failed to read job store; starting with an empty set");
                return Vec::new();
            }
        };

        match serde_json::from_slice::<Vec<PersistedJob>>(&bytes) {
            Ok(records) => {
                tracing::debug!(count = records.len(), "Loaded persisted job definitions");
                records
            }
            Err(err) => {
                tracing::warn!(error = %err, "Job store is corrupt; starting with an empty set");
                Vec::new()
            }
        }
    }

    /// Atomically replace the stored job set
    #[tracing::instrument(skip(self, records), fields(path = %self.path.display(), count = records.len()))]
    pub async fn save(&self, records: &[PersistedJob]) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_vec_pretty(records)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &json).await?;
        fs::rename(&tmp, &self.path).await?;

        tracing::debug!("Persisted job definitions");
        Ok(())
    }
}
