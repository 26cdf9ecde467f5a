use std::sync::Arc;

use chrono::{Duration, FixedOffset, Utc};
use log::info;

use crate::configuration::Config;
use crate::controller::{AdminController, PublicLoggingController};
use crate::error_handling::types::ControllerError;
use crate::geo_lookup::GeoLookup;
use crate::session_management::SessionManager;
use crate::storage::{LogStore, VideoAssetStore};

/// Everything a request handler needs, built once at startup.
pub struct AppState {
    pub config: Config,
    pub admin: AdminController,
    pub public: PublicLoggingController,
}

impl AppState {
    pub fn from_config(config: &Config) -> Result<Self, ControllerError> {
        let session_ttl = i64::try_from(config.auth.session_ttl_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .filter(|ttl| Utc::now().checked_add_signed(*ttl).is_some())
            .ok_or_else(|| {
                ControllerError::InitializationFailed("session TTL is too large".to_string())
            })?;
        let offset = FixedOffset::east_opt(config.logging.timestamp_utc_offset_minutes * 60)
            .ok_or_else(|| {
                ControllerError::InitializationFailed("invalid log timestamp offset".to_string())
            })?;

        let sessions = Arc::new(SessionManager::new(
            config.auth.admin_password.clone(),
            session_ttl,
        ));
        let videos = Arc::new(VideoAssetStore::new(
            config.storage.videos_dir(),
            config.storage.active_video_file(),
            config.storage.max_upload_bytes,
        )?);
        let logs = Arc::new(LogStore::new(config.storage.logs_dir())?);
        let geo = Arc::new(GeoLookup::new(&config.geo)?);

        info!(
            "Application state ready (videos: {}, logs: {})",
            config.storage.videos_dir().display(),
            config.storage.logs_dir().display()
        );

        Ok(Self {
            config: config.clone(),
            admin: AdminController::new(sessions, videos, Arc::clone(&logs)),
            public: PublicLoggingController::new(geo, logs, offset),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn builds_directories_from_config() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.storage.data_dir = dir.path().to_path_buf();

        let state = AppState::from_config(&config).unwrap();
        assert!(dir.path().join("public").join("videos").is_dir());
        assert!(dir.path().join("data").is_dir());
        assert!(!state.admin.sessions().is_configured());
    }

    #[test]
    fn oversized_session_ttl_is_an_init_error() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.storage.data_dir = dir.path().to_path_buf();
        config.auth.session_ttl_secs = 20_000_000_000_000;

        assert!(matches!(
            AppState::from_config(&config),
            Err(ControllerError::InitializationFailed(_))
        ));
    }
}
