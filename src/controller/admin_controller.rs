use std::fmt;
use std::sync::Arc;

use bytes::Buf;
use futures_util::Stream;
use log::{error, info};

use crate::error_handling::types::{AppError, AuthError, StorageError};
use crate::session_management::{Session, SessionManager};
use crate::storage::types::VIDEO_URL_PREFIX;
use crate::storage::{
    ClearOutcome, LogCategory, LogDownload, LogStore, UploadSource, VideoAsset, VideoAssetStore,
};

/// Everything the operator can do once logged in, plus the login itself.
pub struct AdminController {
    sessions: Arc<SessionManager>,
    videos: Arc<VideoAssetStore>,
    logs: Arc<LogStore>,
}

impl AdminController {
    pub fn new(
        sessions: Arc<SessionManager>,
        videos: Arc<VideoAssetStore>,
        logs: Arc<LogStore>,
    ) -> Self {
        Self {
            sessions,
            videos,
            logs,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    pub fn videos(&self) -> &Arc<VideoAssetStore> {
        &self.videos
    }

    pub fn login(&self, password: &str) -> Result<Session, AppError> {
        Ok(self.sessions.login(password)?)
    }

    pub fn authorize(&self, token: Option<&str>) -> Result<Session, AppError> {
        let token = token.ok_or(AuthError::Unauthenticated)?;
        Ok(self.sessions.authorize(token)?)
    }

    pub fn logout(&self, token: Option<&str>) {
        if let Some(token) = token {
            self.sessions.logout(token);
        }
    }

    pub async fn list_videos(&self) -> Result<Vec<VideoAsset>, AppError> {
        self.videos.list().await.map_err(storage_failure)
    }

    pub async fn upload_video<S, B, E>(
        &self,
        upload: Option<UploadSource<S>>,
    ) -> Result<VideoAsset, AppError>
    where
        S: Stream<Item = Result<B, E>>,
        B: Buf,
        E: fmt::Display,
    {
        let upload = upload.ok_or_else(|| {
            AppError::UploadRejected("Please choose a file to upload".to_string())
        })?;
        self.videos.store(upload).await.map_err(storage_failure)
    }

    pub async fn set_active_video(&self, file_name: Option<&str>) -> Result<(), AppError> {
        let file_name = required_file_name(file_name)?;
        self.videos
            .set_active(file_name)
            .await
            .map_err(storage_failure)
    }

    /// Deletes a video; if it was the active one the pointer is cleared too.
    pub async fn delete_video(&self, file_name: Option<&str>) -> Result<(), AppError> {
        let file_name = required_file_name(file_name)?;
        self.videos.delete(file_name).await.map_err(storage_failure)
    }

    /// Public URL of the active video, or an empty string.
    pub async fn active_video_url(&self) -> String {
        match self.videos.get_active().await {
            Some(name) => format!("{}{}", VIDEO_URL_PREFIX, name),
            None => String::new(),
        }
    }

    pub async fn read_log(&self, category: &str) -> Result<String, AppError> {
        let category: LogCategory = category.parse()?;
        self.logs.read_all(category).await.map_err(storage_failure)
    }

    pub async fn download_log(&self, category: &str) -> Result<LogDownload, AppError> {
        let category: LogCategory = category.parse()?;
        self.logs.download(category).await.map_err(storage_failure)
    }

    pub async fn clear_log(&self, category: &str) -> Result<ClearOutcome, AppError> {
        let category: LogCategory = category.parse()?;
        let outcome = self.logs.clear(category).await.map_err(storage_failure)?;
        info!("Admin cleared the {} log ({:?})", category, outcome);
        Ok(outcome)
    }
}

fn required_file_name(file_name: Option<&str>) -> Result<&str, AppError> {
    match file_name.map(str::trim) {
        Some(name) if !name.is_empty() => Ok(name),
        _ => Err(AppError::InvalidInput("File name is required".to_string())),
    }
}

fn storage_failure(err: StorageError) -> AppError {
    if let StorageError::Io(ref e) = err {
        error!("Storage failure while serving an admin request: {}", e);
    }
    err.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use chrono::Duration;
    use futures_util::stream;
    use tempfile::TempDir;

    fn controller(dir: &TempDir) -> AdminController {
        let sessions = Arc::new(SessionManager::new(
            Some("S3cr3t!".to_string()),
            Duration::days(7),
        ));
        let videos = Arc::new(
            VideoAssetStore::new(
                dir.path().join("videos"),
                dir.path().join("data").join("config.json"),
                1 << 20,
            )
            .unwrap(),
        );
        let logs = Arc::new(LogStore::new(dir.path().join("logs")).unwrap());
        AdminController::new(sessions, videos, logs)
    }

    fn body(data: &'static [u8]) -> UploadSource<impl Stream<Item = Result<Bytes, std::io::Error>>> {
        UploadSource::new("clip.mp4", stream::iter(vec![Ok(Bytes::from_static(data))]))
    }

    #[tokio::test]
    async fn login_authorize_logout_cycle() {
        let dir = TempDir::new().unwrap();
        let admin = controller(&dir);
        assert!(matches!(admin.login("nope"), Err(AppError::InvalidCredentials)));
        let session = admin.login("S3cr3t!").unwrap();
        assert!(admin.authorize(Some(session.id.as_str())).is_ok());
        admin.logout(Some(session.id.as_str()));
        assert!(matches!(
            admin.authorize(Some(session.id.as_str())),
            Err(AppError::Unauthenticated)
        ));
        assert!(matches!(admin.authorize(None), Err(AppError::Unauthenticated)));
        admin.logout(None);
    }

    #[tokio::test]
    async fn upload_requires_a_file() {
        let dir = TempDir::new().unwrap();
        let admin = controller(&dir);
        let none: Option<UploadSource<stream::Iter<std::vec::IntoIter<Result<Bytes, std::io::Error>>>>> =
            None;
        assert!(matches!(
            admin.upload_video(none).await,
            Err(AppError::UploadRejected(_))
        ));
        let asset = admin.upload_video(Some(body(b"1234"))).await.unwrap();
        assert_eq!(asset.size_bytes, 4);
        assert_eq!(admin.list_videos().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_of_active_video_empties_url() {
        let dir = TempDir::new().unwrap();
        let admin = controller(&dir);
        let asset = admin.upload_video(Some(body(b"video"))).await.unwrap();
        admin.set_active_video(Some(asset.file_name.as_str())).await.unwrap();
        assert_eq!(
            admin.active_video_url().await,
            format!("/videos/{}", asset.file_name)
        );

        admin.delete_video(Some(asset.file_name.as_str())).await.unwrap();
        assert_eq!(admin.active_video_url().await, "");
    }

    #[tokio::test]
    async fn missing_file_name_is_invalid_input() {
        let dir = TempDir::new().unwrap();
        let admin = controller(&dir);
        for input in [None, Some(""), Some("  ")] {
            assert!(matches!(
                admin.set_active_video(input).await,
                Err(AppError::InvalidInput(_))
            ));
            assert!(matches!(
                admin.delete_video(input).await,
                Err(AppError::InvalidInput(_))
            ));
        }
        assert!(matches!(
            admin.delete_video(Some("ghost.mp4")).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn log_operations_reject_unknown_category() {
        let dir = TempDir::new().unwrap();
        let admin = controller(&dir);
        assert!(matches!(
            admin.read_log("bogus").await,
            Err(AppError::InvalidCategory(_))
        ));
        assert!(matches!(
            admin.download_log("bogus").await,
            Err(AppError::InvalidCategory(_))
        ));
        assert!(matches!(
            admin.clear_log("bogus").await,
            Err(AppError::InvalidCategory(_))
        ));
        assert_eq!(
            admin.clear_log("ip").await.unwrap(),
            ClearOutcome::NothingToClear
        );
        assert!(matches!(
            admin.download_log("precise").await,
            Err(AppError::NotFound(_))
        ));
    }
}
