use super::types::*;
use crate::error_handling::types::ConfigError;
use clap::Parser;
use log::{debug, info};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Command-line arguments of the `geoframe` binary.
///
/// Every flag is optional: values given here (or through the matching
/// environment variable) override whatever the configuration file says.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "geoframe")]
#[command(about = "Visitor location logger with a session-gated video admin panel")]
pub struct CliArgs {
    /// Path to a TOML configuration file
    pub config_file: Option<PathBuf>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Address to bind the HTTP server to
    #[arg(long)]
    pub bind_address: Option<String>,

    /// Shared secret for the admin panel
    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: Option<String>,

    /// Root directory for logs, videos and the active-video record
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

/// Application configuration.
///
/// Loaded from a TOML file whose sections mirror the fields below. Every key
/// has a default, so an empty file (or no file at all) yields a runnable
/// configuration bound to port 3000 with data stored in the working
/// directory.
///
/// # Examples
///
/// ```
/// use geoframe::configuration::config::Config;
///
/// let config = Config::from_toml_str("[server]\nport = 8080\n").unwrap();
/// assert_eq!(config.server.port, 8080);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub geo: GeoConfig,
    pub logging: LoggingConfig,
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::TomlError(e.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        debug!("Reading configuration from {}", path.display());
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Builds the effective configuration: file (if any), then CLI/env
    /// overrides, then validation.
    pub fn load(args: &CliArgs) -> Result<Self, ConfigError> {
        let mut config = match &args.config_file {
            Some(path) => Self::from_file(path)?,
            None => {
                info!("No configuration file given, using defaults");
                Self::default()
            }
        };
        config.apply_overrides(args);
        config.validate()?;
        Ok(config)
    }

    pub fn apply_overrides(&mut self, args: &CliArgs) {
        if let Some(port) = args.port {
            self.server.port = port;
        }
        if let Some(ref bind_address) = args.bind_address {
            self.server.bind_address = bind_address.clone();
        }
        if let Some(ref password) = args.admin_password {
            self.auth.admin_password = Some(password.clone());
        }
        if let Some(ref data_dir) = args.data_dir {
            self.storage.data_dir = data_dir.clone();
        }
        // An empty secret is as good as none
        if self.auth.admin_password.as_deref() == Some("") {
            self.auth.admin_password = None;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::NotInRange(
                "server.port must be between 1 and 65535".to_string(),
            ));
        }
        if self.server.bind_address.parse::<std::net::IpAddr>().is_err() {
            return Err(ConfigError::NotInRange(format!(
                "server.bind_address '{}' is not an IP address",
                self.server.bind_address
            )));
        }
        if !(1..=MAX_SESSION_TTL_SECS).contains(&self.auth.session_ttl_secs) {
            return Err(ConfigError::NotInRange(format!(
                "auth.session_ttl_secs must be within 1..={}",
                MAX_SESSION_TTL_SECS
            )));
        }
        if self.auth.sweep_interval_secs == 0 {
            return Err(ConfigError::NotInRange(
                "auth.sweep_interval_secs must be positive".to_string(),
            ));
        }
        if !(1..=30_000).contains(&self.geo.timeout_ms) {
            return Err(ConfigError::NotInRange(
                "geo.timeout_ms must be within 1..=30000".to_string(),
            ));
        }
        if self.storage.max_upload_bytes == 0 {
            return Err(ConfigError::NotInRange(
                "storage.max_upload_bytes must be positive".to_string(),
            ));
        }
        if !(-14 * 60..=14 * 60).contains(&self.logging.timestamp_utc_offset_minutes) {
            return Err(ConfigError::NotInRange(
                "logging.timestamp_utc_offset_minutes must be within +/-840".to_string(),
            ));
        }
        if let Some(ref dir) = self.server.public_dir {
            if !dir.is_dir() {
                return Err(ConfigError::DirectoryDoesNotExist(dir.display().to_string()));
            }
        }
        Ok(())
    }
}
