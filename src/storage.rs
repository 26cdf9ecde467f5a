//! Storage subsystem
//!
//! Persistent state of the service, all of it on the local filesystem.
//!
//! Components:
//! - `log_store`: the two append-only visitor logs (`ip`, `precise`).
//! - `video_store`: uploaded video files and the active-video pointer record.
//! - `types`: shared data types used by both stores.

pub mod log_store;
pub mod types;
pub mod video_store;

pub use log_store::LogStore;
pub use types::{ClearOutcome, LogCategory, LogDownload, UploadSource, VideoAsset};
pub use video_store::VideoAssetStore;
