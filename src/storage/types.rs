use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error_handling::types::StorageError;

/// URL prefix under which stored videos are served.
pub const VIDEO_URL_PREFIX: &str = "/videos/";

/// The two independent visitor logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogCategory {
    /// Coarse, IP-derived locations.
    Ip,
    /// Browser-granted coordinates.
    Precise,
}

impl LogCategory {
    pub const ALL: [LogCategory; 2] = [LogCategory::Ip, LogCategory::Precise];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogCategory::Ip => "ip",
            LogCategory::Precise => "precise",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            LogCategory::Ip => "ip_logs.txt",
            LogCategory::Precise => "precise_logs.txt",
        }
    }
}

impl fmt::Display for LogCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogCategory {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ip" => Ok(LogCategory::Ip),
            "precise" => Ok(LogCategory::Precise),
            other => Err(StorageError::InvalidCategory(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearOutcome {
    Cleared,
    /// The log did not exist; clearing it is still a success.
    NothingToClear,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogDownload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoAsset {
    pub file_name: String,
    pub size_bytes: u64,
    pub uploaded_at: DateTime<Utc>,
}

/// An incoming upload: the client-side file name plus a stream of body chunks.
///
/// The stream is whatever the transport hands over (a multipart part, a file
/// reader in tests); the store only needs `Stream<Item = Result<impl Buf, E>>`.
pub struct UploadSource<S> {
    pub original_name: String,
    pub stream: S,
}

impl<S> UploadSource<S> {
    pub fn new(original_name: impl Into<String>, stream: S) -> Self {
        Self {
            original_name: original_name.into(),
            stream,
        }
    }
}

/// On-disk form of the active video pointer, `{"activeVideo": "/videos/<file>"}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActiveVideoRecord {
    #[serde(rename = "activeVideo", default)]
    pub active_video: String,
}

impl ActiveVideoRecord {
    pub fn for_file(file_name: &str) -> Self {
        Self {
            active_video: format!("{}{}", VIDEO_URL_PREFIX, file_name),
        }
    }

    /// File name referenced by the record, accepting both the `/videos/<file>`
    /// form and a bare file name. `None` when the record is empty.
    pub fn file_name(&self) -> Option<&str> {
        let name = self
            .active_video
            .strip_prefix(VIDEO_URL_PREFIX)
            .unwrap_or(&self.active_video)
            .trim();
        if name.is_empty() {
            None
        } else {
            Some(name)
        }
    }
}
