//! JSON collection persistence
//!
//! Handles saving and loading the document collection to/from the filesystem.
//! The whole collection is rewritten on every save using an atomic write
//! (write to a temp file, then rename), so the backing file is never left
//! partially written.
//!
//! Storage location: `~/.local/share/scanview/` (configurable via `Config`)
//!
//! Files:
//! - `documents.json` - JSON array of documents, pretty-printed (2 spaces)
//! - `filtered/` - outputs of image manipulation

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::error::{StorageError, StorageResult};
use crate::config::Config;
use crate::models::Document;

/// Persistence layer for the document collection
pub struct JsonPersistence {
    config: Config,
}

impl JsonPersistence {
    /// Create a new persistence handler with the given configuration
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Path of the backing file
    pub fn path(&self) -> PathBuf {
        self.config.documents_path()
    }

    /// Check if the backing file exists on disk
    ///
    /// Fails when existence can't be determined, e.g. when the data
    /// directory is not a directory or can't be searched.
    pub async fn exists(&self) -> StorageResult<bool> {
        let path = self.path();
        fs::try_exists(&path)
            .await
            .map_err(|e| StorageError::from_read(e, path))
    }

    /// Create the data directory and the filtered-output directory
    pub async fn ensure_dirs(&self) -> StorageResult<()> {
        for dir in [self.config.data_dir.clone(), self.config.filtered_dir()] {
            fs::create_dir_all(&dir)
                .await
                .map_err(|source| StorageError::CreateDirectory {
                    path: dir.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Load the collection from disk
    ///
    /// Returns `None` if the backing file doesn't exist.
    /// Returns an error if the file exists but can't be read or parsed.
    pub async fn load(&self) -> StorageResult<Option<Vec<Document>>> {
        let path = self.path();

        if !self.exists().await? {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| StorageError::from_read(e, path.clone()))?;
        debug!("Read {} characters from {:?}", content.len(), path);

        let docs: Vec<Document> =
            serde_json::from_str(&content).map_err(|e| StorageError::InvalidFormat {
                path: path.clone(),
                details: e.to_string(),
            })?;

        Ok(Some(docs))
    }

    /// Save the full collection, replacing whatever is on disk
    ///
    /// The data directory must already exist; it is not created here.
    pub async fn save(&self, docs: &[Document]) -> StorageResult<()> {
        let json = serde_json::to_string_pretty(docs)?;
        let path = self.path();

        atomic_write(&path, json.as_bytes()).await?;
        debug!("Saved {} documents ({} bytes) to {:?}", docs.len(), json.len(), path);

        Ok(())
    }
}

/// Write data to a file atomically
///
/// 1. Write to a uniquely named temp file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
///
/// Concurrent writers each use their own temp file; the last rename wins.
async fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = path.with_file_name(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()));

    let write = async {
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(data).await?;
        file.sync_all().await
    };
    if let Err(e) = write.await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(StorageError::from_io(e, path.to_path_buf()));
    }

    if let Err(source) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(StorageError::AtomicWriteFailed {
            from: temp_path,
            to: path.to_path_buf(),
            source,
        });
    }

    Ok(())
}
