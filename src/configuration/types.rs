use serde::Deserialize;
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_SESSION_TTL_SECS: u64 = 7 * 24 * 60 * 60;
pub const MAX_SESSION_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

#[derive(Debug, PartialEq, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    /// Optional directory served at `/` (landing page assets).
    pub public_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: String::from("0.0.0.0"),
            port: DEFAULT_PORT,
            public_dir: None,
        }
    }
}

#[derive(Debug, PartialEq, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    /// Defaults to `<data_dir>/public/videos`.
    pub videos_dir: Option<PathBuf>,
    /// Defaults to `<data_dir>/data/config.json`.
    pub active_video_file: Option<PathBuf>,
    /// Defaults to `<data_dir>`.
    pub logs_dir: Option<PathBuf>,
    pub max_upload_bytes: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            videos_dir: None,
            active_video_file: None,
            logs_dir: None,
            max_upload_bytes: 512 * 1024 * 1024,
        }
    }
}

impl StorageConfig {
    pub fn videos_dir(&self) -> PathBuf {
        self.videos_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("public").join("videos"))
    }

    pub fn active_video_file(&self) -> PathBuf {
        self.active_video_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join("data").join("config.json"))
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.logs_dir.clone().unwrap_or_else(|| self.data_dir.clone())
    }
}

#[derive(PartialEq, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub admin_password: Option<String>,
    pub session_ttl_secs: u64,
    pub sweep_interval_secs: u64,
    pub cookie_secure: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_password: None,
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            sweep_interval_secs: 300,
            cookie_secure: false,
        }
    }
}

// Hand-written so the secret never ends up in a log line.
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field(
                "admin_password",
                &self.admin_password.as_ref().map(|_| "<redacted>"),
            )
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("sweep_interval_secs", &self.sweep_interval_secs)
            .field("cookie_secure", &self.cookie_secure)
            .finish()
    }
}

#[derive(Debug, PartialEq, Clone, Deserialize)]
#[serde(default)]
pub struct GeoConfig {
    pub ip_api_url: String,
    pub reverse_geocode_url: String,
    pub user_agent: String,
    pub timeout_ms: u64,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            ip_api_url: String::from("http://ip-api.com/json"),
            reverse_geocode_url: String::from("https://nominatim.openstreetmap.org/reverse"),
            user_agent: String::from("PreciseLogger/1.0"),
            timeout_ms: 4000,
        }
    }
}

#[derive(Debug, PartialEq, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Offset applied to the timestamps written into the visitor logs.
    pub timestamp_utc_offset_minutes: i32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            timestamp_utc_offset_minutes: 7 * 60,
        }
    }
}
