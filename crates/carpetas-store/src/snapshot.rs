//! JSON snapshot files.
//!
//! Writes go to a sibling temp file that is then renamed over the target,
//! so a reader never sees a half-written snapshot.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use carpetas_core::error::{AppError, ErrorKind};
use carpetas_core::result::AppResult;

/// A JSON file holding one serialized value.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    /// Target path.
    path: PathBuf,
}

impl SnapshotFile {
    /// Create a handle for the snapshot at `path`. Nothing is touched yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The snapshot path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and deserialize the snapshot. `None` if the file does not exist.
    pub async fn load<T: DeserializeOwned>(&self) -> AppResult<Option<T>> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to read snapshot: {}", self.path.display()),
                    e,
                ));
            }
        };
        let value = serde_json::from_slice(&bytes).map_err(|e| {
            AppError::with_source(
                ErrorKind::Serialization,
                format!("Corrupt snapshot {}: {e}", self.path.display()),
                e,
            )
        })?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "Snapshot loaded");
        Ok(Some(value))
    }

    /// Serialize and atomically replace the snapshot.
    pub async fn save<T: Serialize + ?Sized>(&self, value: &T) -> AppResult<()> {
        let json = serde_json::to_vec_pretty(value)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to create snapshot directory: {}", parent.display()),
                    e,
                )
            })?;
        }

        let tmp = self.path.with_extension("json.tmp");
        let mut file = fs::File::create(&tmp).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create temp snapshot: {}", tmp.display()),
                e,
            )
        })?;
        file.write_all(&json).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&tmp, &self.path).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to replace snapshot: {}", self.path.display()),
                e,
            )
        })?;

        debug!(path = %self.path.display(), bytes = json.len(), "Snapshot written");
        Ok(())
    }
}
