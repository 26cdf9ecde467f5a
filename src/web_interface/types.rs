use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

/// Which kind of client hit a gated route; decides how a missing session is
/// answered (401 JSON for the API, redirect to the login page for pages).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Api,
    Page,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UrlResponse {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub message: String,
    pub file_name: String,
    pub size_bytes: u64,
}

#[derive(Debug, Deserialize)]
pub struct PreciseLocationRequest {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Deserialize)]
pub struct FileNameRequest {
    #[serde(rename = "fileName", default)]
    pub file_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub password: String,
}

/// Address of the visitor: the first `X-Forwarded-For` hop when a proxy set
/// one, otherwise the socket peer.
pub fn client_ip(forwarded_for: Option<&str>, remote: Option<SocketAddr>) -> Option<String> {
    forwarded_for
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|first| !first.is_empty())
        .map(str::to_string)
        .or_else(|| remote.map(|addr| addr.ip().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forwarded_header_wins_over_socket_peer() {
        let remote: SocketAddr = "10.0.0.2:5555".parse().unwrap();
        assert_eq!(
            client_ip(Some("203.0.113.7, 10.0.0.1"), Some(remote)).as_deref(),
            Some("203.0.113.7")
        );
        assert_eq!(client_ip(None, Some(remote)).as_deref(), Some("10.0.0.2"));
        assert_eq!(client_ip(Some("  "), Some(remote)).as_deref(), Some("10.0.0.2"));
        assert_eq!(client_ip(None, None), None);
    }
}
