//! Append-only visitor logs.
//!
//! Each [`LogCategory`] maps to one flat text file under the log directory.
//! Writers never edit existing bytes: the only destructive operation is
//! [`LogStore::clear`], which removes the whole file.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, error, info};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error_handling::types::StorageError;
use crate::storage::types::{ClearOutcome, LogCategory, LogDownload};

/// Separator written after every entry.
pub const RECORD_SEPARATOR: &str = "\n\n";

pub struct LogStore {
    base_path: PathBuf,
    // One writer at a time per file, so an entry's bytes are always contiguous.
    locks: HashMap<LogCategory, Mutex<()>>,
}

impl LogStore {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Result<Self, StorageError> {
        let base_path = base_path.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_path).map_err(|e| {
            error!("Failed to create log dir {}: {}", base_path.display(), e);
            StorageError::Io(e)
        })?;
        info!("LogStore initialized at {}", base_path.display());

        let locks = LogCategory::ALL
            .iter()
            .map(|category| (*category, Mutex::new(())))
            .collect();
        Ok(Self { base_path, locks })
    }

    pub fn path_for(&self, category: LogCategory) -> PathBuf {
        self.base_path.join(category.file_name())
    }

    fn lock_for(&self, category: LogCategory) -> &Mutex<()> {
        // Every category gets a lock in `new`
        &self.locks[&category]
    }

    /// Placeholder returned by [`LogStore::read_all`] when the log is absent.
    pub fn placeholder(category: LogCategory) -> String {
        format!(
            "Log file '{}' has not been created yet or is empty.",
            category.file_name()
        )
    }

    /// Appends one entry followed by [`RECORD_SEPARATOR`] as a single write.
    pub async fn append(&self, category: LogCategory, text: &str) -> Result<(), StorageError> {
        let path = self.path_for(category);
        let mut record = String::with_capacity(text.len() + RECORD_SEPARATOR.len());
        record.push_str(text.trim_end());
        record.push_str(RECORD_SEPARATOR);

        let _guard = self.lock_for(category).lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| {
                error!("Open append failed {}: {}", path.display(), e);
                StorageError::Io(e)
            })?;
        file.write_all(record.as_bytes()).await.map_err(|e| {
            error!("Write failed {}: {}", path.display(), e);
            StorageError::Io(e)
        })?;
        file.flush().await.map_err(StorageError::Io)?;
        debug!("Appended {} byte(s) to {}", record.len(), path.display());
        Ok(())
    }

    /// Full contents of the log, or [`LogStore::placeholder`] if it does not exist yet.
    pub async fn read_all(&self, category: LogCategory) -> Result<String, StorageError> {
        let path = self.path_for(category);
        match fs::read(&path).await {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::placeholder(category)),
            Err(e) => {
                error!("Read failed {}: {}", path.display(), e);
                Err(StorageError::Io(e))
            }
        }
    }

    pub async fn download(&self, category: LogCategory) -> Result<LogDownload, StorageError> {
        let path = self.path_for(category);
        match fs::read(&path).await {
            Ok(bytes) => Ok(LogDownload {
                file_name: category.file_name().to_string(),
                bytes,
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound(format!(
                "Log file '{}' does not exist",
                category.file_name()
            ))),
            Err(e) => {
                error!("Read failed {}: {}", path.display(), e);
                Err(StorageError::Io(e))
            }
        }
    }

    /// Deletes the log. Clearing an absent log succeeds with `NothingToClear`.
    pub async fn clear(&self, category: LogCategory) -> Result<ClearOutcome, StorageError> {
        let path = self.path_for(category);
        let _guard = self.lock_for(category).lock().await;
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!("Cleared log {}", path.display());
                Ok(ClearOutcome::Cleared)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Nothing to clear at {}", path.display());
                Ok(ClearOutcome::NothingToClear)
            }
            Err(e) => {
                error!("Failed to remove {}: {}", path.display(), e);
                Err(StorageError::Io(e))
            }
        }
    }
}
