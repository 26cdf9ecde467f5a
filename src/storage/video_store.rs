//! Uploaded video files and the single "active video" pointer.
//!
//! Videos live as plain files in one directory. The pointer is a small JSON
//! record (`{"activeVideo": "/videos/<file>"}`) replaced atomically through a
//! temporary file and a rename. Readers treat a missing, corrupt or dangling
//! record as "no active video".

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use bytes::Buf;
use chrono::{DateTime, Utc};
use futures_util::{pin_mut, Stream, StreamExt};
use log::{debug, error, info, warn};
use regex::Regex;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error_handling::types::StorageError;
use crate::storage::types::{ActiveVideoRecord, UploadSource, VideoAsset};

// A single path component that is neither hidden nor a traversal
static FILE_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^/\\\x00.][^/\\\x00]*$").expect("file name pattern"));

static EXTENSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]{1,10}$").expect("extension pattern"));

pub struct VideoAssetStore {
    videos_dir: PathBuf,
    active_record_path: PathBuf,
    max_upload_bytes: u64,
    // Serialises pointer writes, and delete + pointer clear as one step
    pointer_lock: Mutex<()>,
}

impl VideoAssetStore {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(
        videos_dir: P,
        active_record_path: Q,
        max_upload_bytes: u64,
    ) -> Result<Self, StorageError> {
        let videos_dir = videos_dir.as_ref().to_path_buf();
        let active_record_path = active_record_path.as_ref().to_path_buf();

        std::fs::create_dir_all(&videos_dir).map_err(|e| {
            error!("Failed to create videos dir {}: {}", videos_dir.display(), e);
            StorageError::Io(e)
        })?;
        if let Some(parent) = active_record_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                error!("Failed to create record dir {}: {}", parent.display(), e);
                StorageError::Io(e)
            })?;
        }
        info!(
            "VideoAssetStore initialized at {} (active record: {})",
            videos_dir.display(),
            active_record_path.display()
        );

        Ok(Self {
            videos_dir,
            active_record_path,
            max_upload_bytes,
            pointer_lock: Mutex::new(()),
        })
    }

    pub fn videos_dir(&self) -> &Path {
        &self.videos_dir
    }

    /// Every stored video, in directory enumeration order.
    pub async fn list(&self) -> Result<Vec<VideoAsset>, StorageError> {
        let mut entries = fs::read_dir(&self.videos_dir).await.map_err(|e| {
            error!("Failed to read videos dir {}: {}", self.videos_dir.display(), e);
            StorageError::Io(e)
        })?;

        let mut assets = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(StorageError::Io)? {
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(_) => continue,
            };
            if name.starts_with('.') {
                continue;
            }
            let metadata = match entry.metadata().await {
                Ok(m) if m.is_file() => m,
                _ => continue,
            };
            assets.push(VideoAsset {
                file_name: name,
                size_bytes: metadata.len(),
                uploaded_at: metadata
                    .modified()
                    .map(DateTime::<Utc>::from)
                    .unwrap_or_else(|_| Utc::now()),
            });
        }
        debug!("Listed {} video(s)", assets.len());
        Ok(assets)
    }

    /// Writes an upload under a fresh collision-free name.
    ///
    /// The client's file name only contributes its extension. Bytes go to a
    /// hidden `.part` file first and are renamed into place once complete, so
    /// a failed upload never shows up in [`VideoAssetStore::list`].
    pub async fn store<S, B, E>(&self, upload: UploadSource<S>) -> Result<VideoAsset, StorageError>
    where
        S: Stream<Item = Result<B, E>>,
        B: Buf,
        E: fmt::Display,
    {
        let UploadSource {
            original_name,
            stream,
        } = upload;
        if original_name.trim().is_empty() {
            return Err(StorageError::UploadRejected(
                "No file was supplied".to_string(),
            ));
        }

        let file_name = storage_name(&original_name);
        let final_path = self.videos_dir.join(&file_name);
        let part_path = self.videos_dir.join(format!(".{}.part", file_name));

        let mut file = File::create(&part_path).await.map_err(|e| {
            error!("Create failed {}: {}", part_path.display(), e);
            StorageError::Io(e)
        })?;

        pin_mut!(stream);
        let copied = copy_stream(&mut stream, &mut file, self.max_upload_bytes).await;
        drop(file);

        let size_bytes = match copied {
            Ok(n) => n,
            Err(e) => {
                if let Err(cleanup) = fs::remove_file(&part_path).await {
                    warn!("Failed to remove partial upload {}: {}", part_path.display(), cleanup);
                }
                return Err(e);
            }
        };

        fs::rename(&part_path, &final_path).await.map_err(|e| {
            error!(
                "Rename failed {} -> {}: {}",
                part_path.display(),
                final_path.display(),
                e
            );
            StorageError::Io(e)
        })?;
        info!(
            "Stored upload '{}' as {} ({} bytes)",
            original_name, file_name, size_bytes
        );

        Ok(VideoAsset {
            file_name,
            size_bytes,
            uploaded_at: Utc::now(),
        })
    }

    /// Removes a video. If it was the active one, the pointer is cleared in
    /// the same step; a failure to clear it is logged, not returned.
    pub async fn delete(&self, file_name: &str) -> Result<(), StorageError> {
        let name = validate_file_name(file_name)?;
        let path = self.videos_dir.join(name);

        let _guard = self.pointer_lock.lock().await;
        match fs::remove_file(&path).await {
            Ok(()) => info!("Deleted video {}", path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::NotFound(format!(
                    "Video '{}' does not exist",
                    name
                )))
            }
            Err(e) => {
                error!("Failed to delete video {}: {}", path.display(), e);
                return Err(StorageError::Io(e));
            }
        }

        let record = self.read_record().await;
        if record.as_ref().and_then(|r| r.file_name()) == Some(name) {
            match self.write_record(&ActiveVideoRecord::default()).await {
                Ok(()) => info!("Cleared active video pointer after deleting {}", name),
                Err(e) => error!(
                    "Deleted active video {} but could not clear the pointer: {}",
                    name, e
                ),
            }
        }
        Ok(())
    }

    /// Points the active video at `file_name`. Existence is not checked here;
    /// [`VideoAssetStore::get_active`] resolves dangling pointers on read.
    pub async fn set_active(&self, file_name: &str) -> Result<(), StorageError> {
        let name = validate_file_name(file_name)?;
        let _guard = self.pointer_lock.lock().await;
        self.write_record(&ActiveVideoRecord::for_file(name)).await?;
        info!("Active video set to {}", name);
        Ok(())
    }

    /// File name of the active video, or `None` when no usable pointer exists.
    pub async fn get_active(&self) -> Option<String> {
        let record = self.read_record().await?;
        let name = record.file_name()?;
        if validate_file_name(name).is_err() {
            warn!("Ignoring active video record with invalid name '{}'", name);
            return None;
        }
        match fs::metadata(self.videos_dir.join(name)).await {
            Ok(m) if m.is_file() => Some(name.to_string()),
            _ => {
                debug!("Active video pointer to {} is dangling", name);
                None
            }
        }
    }

    async fn read_record(&self) -> Option<ActiveVideoRecord> {
        let content = match fs::read_to_string(&self.active_record_path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(
                    "Failed to read active video record {}: {}",
                    self.active_record_path.display(),
                    e
                );
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(
                    "Corrupt active video record {}: {}",
                    self.active_record_path.display(),
                    e
                );
                None
            }
        }
    }

    async fn write_record(&self, record: &ActiveVideoRecord) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(record)
            .map_err(|e| StorageError::Io(std::io::Error::new(ErrorKind::InvalidData, e)))?;
        let tmp_path = self.active_record_path.with_extension("json.tmp");
        fs::write(&tmp_path, json).await.map_err(|e| {
            error!("Write failed {}: {}", tmp_path.display(), e);
            StorageError::Io(e)
        })?;
        fs::rename(&tmp_path, &self.active_record_path)
            .await
            .map_err(|e| {
                error!(
                    "Rename failed {} -> {}: {}",
                    tmp_path.display(),
                    self.active_record_path.display(),
                    e
                );
                StorageError::Io(e)
            })
    }
}

async fn copy_stream<S, B, E>(
    stream: &mut std::pin::Pin<&mut S>,
    file: &mut File,
    limit: u64,
) -> Result<u64, StorageError>
where
    S: Stream<Item = Result<B, E>>,
    B: Buf,
    E: fmt::Display,
{
    let mut written = 0u64;
    while let Some(chunk) = stream.next().await {
        let mut chunk = chunk.map_err(|e| {
            StorageError::UploadRejected(format!("Upload stream interrupted: {}", e))
        })?;
        written += chunk.remaining() as u64;
        if written > limit {
            return Err(StorageError::UploadRejected(format!(
                "File exceeds the {} byte upload limit",
                limit
            )));
        }
        let bytes = chunk.copy_to_bytes(chunk.remaining());
        file.write_all(&bytes).await?;
    }
    file.flush().await?;
    Ok(written)
}

/// `<UTC timestamp>-<random>[.<ext>]`; only a plain alphanumeric extension
/// of the client's name survives.
fn storage_name(original_name: &str) -> String {
    let stamp = Utc::now().format("%Y%m%d%H%M%S%3f");
    let random = Uuid::new_v4().simple().to_string();
    let suffix = &random[..8];
    match sanitized_extension(original_name) {
        Some(ext) => format!("{}-{}.{}", stamp, suffix, ext),
        None => format!("{}-{}", stamp, suffix),
    }
}

fn sanitized_extension(original_name: &str) -> Option<String> {
    let base = original_name
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();
    let (_, ext) = base.rsplit_once('.')?;
    if EXTENSION_RE.is_match(ext) {
        Some(ext.to_ascii_lowercase())
    } else {
        None
    }
}

fn validate_file_name(file_name: &str) -> Result<&str, StorageError> {
    let name = file_name.trim();
    if name.is_empty() {
        return Err(StorageError::InvalidInput("File name is required".to_string()));
    }
    if !FILE_NAME_RE.is_match(name) {
        return Err(StorageError::InvalidInput(format!(
            "Invalid file name '{}'",
            name
        )));
    }
    Ok(name)
}
