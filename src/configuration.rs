//! Runtime configuration: TOML file, command-line flags and environment.

pub mod config;
pub mod types;

pub use config::{CliArgs, Config};
pub use types::{AuthConfig, GeoConfig, LoggingConfig, ServerConfig, StorageConfig};
