//! Durable snapshot persistence for financial state.
//!
//! Balances and the ledger must be on disk before a caller is acknowledged
//! and before any event is broadcast. Snapshots are whole-file JSON written
//! to a temp file and renamed into place, so a crash mid-write leaves the
//! previous snapshot intact. Ephemeral room state is never snapshotted.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::PathBuf;
use tracing::debug;

use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: Option<PathBuf>,
}

impl SnapshotStore {
    #[must_use]
    pub const fn new(dir: PathBuf) -> Self {
        Self { dir: Some(dir) }
    }

    /// A store that keeps nothing. Used when no data dir is configured.
    #[must_use]
    pub const fn disabled() -> Self {
        Self { dir: None }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.dir.is_some()
    }

    /// Write `value` as `<dir>/<name>.json`, atomically via temp + rename.
    pub async fn write<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };

        tokio::fs::create_dir_all(dir).await?;
        let bytes = serde_json::to_vec_pretty(value)?;

        let final_path = dir.join(format!("{name}.json"));
        let tmp_path = dir.join(format!("{name}.json.tmp"));
        tokio::fs::write(&tmp_path, &bytes).await?;
        tokio::fs::rename(&tmp_path, &final_path).await?;

        debug!(snapshot = name, bytes = bytes.len(), "Snapshot written");
        Ok(())
    }

    /// Read `<dir>/<name>.json`, or `None` when no snapshot exists yet.
    pub async fn read<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        let Some(dir) = &self.dir else {
            return Ok(None);
        };

        let path = dir.join(format!("{name}.json"));
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let value = serde_json::from_slice(&bytes)?;
                Ok(Some(value))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Io(e)),
        }
    }
}
