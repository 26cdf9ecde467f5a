use std::fmt;

use warp::http::StatusCode;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    DirectoryDoesNotExist(String),
    NotInRange(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::DirectoryDoesNotExist(e) => write!(f, "Directory error: {}", e),
            ConfigError::NotInRange(e) => write!(f, "Value out of range: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    NotFound(String),
    InvalidInput(String),
    InvalidCategory(String),
    UploadRejected(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Io(e) => write!(f, "Storage IO error: {}", e),
            StorageError::NotFound(e) => write!(f, "Not found: {}", e),
            StorageError::InvalidInput(e) => write!(f, "Invalid input: {}", e),
            StorageError::InvalidCategory(e) => write!(f, "Invalid log category: {}", e),
            StorageError::UploadRejected(e) => write!(f, "Upload rejected: {}", e),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum AuthError {
    InvalidCredentials,
    /// No admin secret configured; every login attempt is refused.
    ServerMisconfigured,
    Unauthenticated,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidCredentials => write!(f, "Invalid credentials"),
            AuthError::ServerMisconfigured => write!(f, "No admin secret is configured"),
            AuthError::Unauthenticated => write!(f, "Missing or expired session"),
        }
    }
}

impl std::error::Error for AuthError {}

/// Failures of the external geolocation services. These are absorbed inside
/// `geo_lookup` and only ever show up in the server log.
#[derive(Debug)]
pub enum GeoError {
    ClientBuild(String),
    Transport(String),
    Timeout,
    UpstreamStatus(u16),
    MalformedBody(String),
    ProviderFailed(String),
}

impl fmt::Display for GeoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeoError::ClientBuild(e) => write!(f, "HTTP client construction failed: {}", e),
            GeoError::Transport(e) => write!(f, "Upstream transport error: {}", e),
            GeoError::Timeout => write!(f, "Upstream request timed out"),
            GeoError::UpstreamStatus(code) => write!(f, "Upstream answered with status {}", code),
            GeoError::MalformedBody(e) => write!(f, "Upstream body could not be decoded: {}", e),
            GeoError::ProviderFailed(e) => write!(f, "Provider reported failure: {}", e),
        }
    }
}

impl std::error::Error for GeoError {}

impl From<reqwest::Error> for GeoError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GeoError::Timeout
        } else if err.is_decode() {
            GeoError::MalformedBody(err.to_string())
        } else {
            GeoError::Transport(err.to_string())
        }
    }
}

#[derive(Debug)]
pub enum WebError {
    BindFailed(String),
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebError::BindFailed(e) => write!(f, "Web server bind failed: {}", e),
        }
    }
}

impl std::error::Error for WebError {}

#[derive(Debug)]
pub enum ControllerError {
    StorageError(StorageError),
    GeoError(GeoError),
    InitializationFailed(String),
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::StorageError(e) => write!(f, "Storage error: {}", e),
            ControllerError::GeoError(e) => write!(f, "Geolocation error: {}", e),
            ControllerError::InitializationFailed(e) => write!(f, "Initialization failed: {}", e),
        }
    }
}

impl std::error::Error for ControllerError {}

impl From<StorageError> for ControllerError {
    fn from(err: StorageError) -> Self {
        ControllerError::StorageError(err)
    }
}

impl From<GeoError> for ControllerError {
    fn from(err: GeoError) -> Self {
        ControllerError::GeoError(err)
    }
}

/// Errors as seen at the HTTP boundary.
///
/// Each variant maps to exactly one status code. `public_message` is what the
/// caller gets to read; the `Display` output keeps the detail for the server log.
#[derive(Debug)]
pub enum AppError {
    InvalidInput(String),
    Unauthenticated,
    InvalidCredentials,
    ServerMisconfigured,
    NotFound(String),
    InvalidCategory(String),
    UploadRejected(String),
    StorageFailure(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_)
            | AppError::InvalidCategory(_)
            | AppError::UploadRejected(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::ServerMisconfigured => StatusCode::SERVICE_UNAVAILABLE,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::StorageFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn public_message(&self) -> String {
        match self {
            AppError::InvalidInput(msg)
            | AppError::NotFound(msg)
            | AppError::UploadRejected(msg) => msg.clone(),
            AppError::InvalidCategory(category) => {
                format!("Invalid log category '{}'", category)
            }
            AppError::Unauthenticated => "Unauthorized".to_string(),
            AppError::InvalidCredentials => "Invalid password".to_string(),
            AppError::ServerMisconfigured => "Admin login is not available".to_string(),
            AppError::StorageFailure(_) => "Internal storage error".to_string(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::InvalidInput(e) => write!(f, "Invalid input: {}", e),
            AppError::Unauthenticated => write!(f, "Unauthenticated"),
            AppError::InvalidCredentials => write!(f, "Invalid credentials"),
            AppError::ServerMisconfigured => write!(f, "Server misconfigured"),
            AppError::NotFound(e) => write!(f, "Not found: {}", e),
            AppError::InvalidCategory(e) => write!(f, "Invalid category: {}", e),
            AppError::UploadRejected(e) => write!(f, "Upload rejected: {}", e),
            AppError::StorageFailure(e) => write!(f, "Storage failure: {}", e),
        }
    }
}

impl std::error::Error for AppError {}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Io(e) => AppError::StorageFailure(e.to_string()),
            StorageError::NotFound(e) => AppError::NotFound(e),
            StorageError::InvalidInput(e) => AppError::InvalidInput(e),
            StorageError::InvalidCategory(e) => AppError::InvalidCategory(e),
            StorageError::UploadRejected(e) => AppError::UploadRejected(e),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => AppError::InvalidCredentials,
            AuthError::ServerMisconfigured => AppError::ServerMisconfigured,
            AuthError::Unauthenticated => AppError::Unauthenticated,
        }
    }
}
