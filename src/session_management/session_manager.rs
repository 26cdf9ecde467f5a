use crate::error_handling::types::AuthError;
use crate::session_management::session::Session;
use chrono::{Duration, Utc};
use log::{debug, error, info, warn};
use parking_lot::RwLock;
use rand::Rng;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Issues and checks admin sessions.
///
/// # Fields Overview
///
/// - `admin_secret`: the single configured admin password, `None` when the
///   operator forgot to set one (every login is then refused)
/// - `sessions`: live sessions keyed by their token
/// - `session_ttl`: sliding lifetime applied on login and on every authorized
///   request
pub struct SessionManager {
    admin_secret: Option<String>,
    sessions: RwLock<HashMap<String, Session>>,
    session_ttl: Duration,
}

impl SessionManager {
    pub fn new(admin_secret: Option<String>, session_ttl: Duration) -> Self {
        if admin_secret.is_none() {
            error!("No admin password configured: the admin panel will refuse every login");
        }
        Self {
            admin_secret,
            sessions: RwLock::new(HashMap::new()),
            session_ttl,
        }
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    pub fn is_configured(&self) -> bool {
        self.admin_secret.is_some()
    }

    /// Checks `candidate` against the admin secret and opens a session on match.
    pub fn login(&self, candidate: &str) -> Result<Session, AuthError> {
        let secret = match self.admin_secret {
            Some(ref s) => s,
            None => {
                error!("Login attempt rejected: no admin password is configured");
                return Err(AuthError::ServerMisconfigured);
            }
        };

        if !secrets_match(candidate, secret) {
            warn!("Login attempt with an invalid password");
            return Err(AuthError::InvalidCredentials);
        }

        let session = Session::new(generate_token(), self.session_ttl);
        self.sessions
            .write()
            .insert(session.id.clone(), session.clone());
        info!("Admin session opened, expires at {}", session.expires_at.to_rfc3339());
        Ok(session)
    }

    /// Resolves `token` to a live session and slides its expiry forward.
    pub fn authorize(&self, token: &str) -> Result<Session, AuthError> {
        let now = Utc::now();
        let mut sessions = self.sessions.write();
        match sessions.get_mut(token) {
            None => return Err(AuthError::Unauthenticated),
            Some(session) if session.is_logged_in && !session.is_expired_at(now) => {
                session.touch(now, self.session_ttl);
                return Ok(session.clone());
            }
            Some(_) => {}
        }
        sessions.remove(token);
        debug!("Dropped expired session on access");
        Err(AuthError::Unauthenticated)
    }

    /// Destroys the session behind `token`. Unknown tokens are ignored.
    pub fn logout(&self, token: &str) {
        if self.sessions.write().remove(token).is_some() {
            info!("Admin session closed");
        } else {
            debug!("Logout for an unknown session");
        }
    }

    /// Removes every expired session and returns how many were dropped.
    pub fn sweep_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired_at(now));
        let removed = before - sessions.len();
        if removed > 0 {
            debug!("Swept {} expired session(s)", removed);
        }
        removed
    }

    pub fn active_session_count(&self) -> usize {
        self.sessions.read().len()
    }
}

/// 32 random bytes, hex-encoded.
fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill(&mut bytes);
    hex::encode(bytes)
}

/// Compares fixed-size digests of both values so the running time does not
/// depend on where the inputs first differ, nor on their lengths.
fn secrets_match(candidate: &str, secret: &str) -> bool {
    let a = Sha256::digest(candidate.as_bytes());
    let b = Sha256::digest(secret.as_bytes());
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> SessionManager {
        SessionManager::new(Some("S3cr3t!".to_string()), Duration::days(7))
    }

    #[test]
    fn login_with_correct_password_creates_session() {
        let manager = manager();
        let session = manager.login("S3cr3t!").unwrap();
        assert!(session.is_logged_in);
        assert_eq!(session.id.len(), 64);
        assert!(session.expires_at > session.created_at);
        assert_eq!(manager.active_session_count(), 1);
        assert_eq!(manager.authorize(&session.id).unwrap().id, session.id);
    }

    #[test]
    fn login_with_wrong_password_fails() {
        let manager = manager();
        assert_eq!(manager.login("s3cr3t!"), Err(AuthError::InvalidCredentials));
        assert_eq!(manager.login(""), Err(AuthError::InvalidCredentials));
        assert_eq!(manager.login("S3cr3t!!"), Err(AuthError::InvalidCredentials));
        assert_eq!(manager.active_session_count(), 0);
    }

    #[test]
    fn missing_secret_is_a_distinct_failure() {
        let manager = SessionManager::new(None, Duration::days(7));
        assert!(!manager.is_configured());
        assert_eq!(manager.login(""), Err(AuthError::ServerMisconfigured));
        assert_eq!(manager.login("anything"), Err(AuthError::ServerMisconfigured));
        assert_eq!(manager.active_session_count(), 0);
    }

    #[test]
    fn unknown_token_is_unauthenticated() {
        let manager = manager();
        assert_eq!(manager.authorize("nope"), Err(AuthError::Unauthenticated));
    }

    #[test]
    fn logout_invalidates_and_is_idempotent() {
        let manager = manager();
        let session = manager.login("S3cr3t!").unwrap();
        manager.logout(&session.id);
        assert_eq!(manager.authorize(&session.id), Err(AuthError::Unauthenticated));
        manager.logout(&session.id);
        manager.logout("never-issued");
        assert_eq!(manager.active_session_count(), 0);
    }

    #[test]
    fn authorize_slides_expiry() {
        let manager = manager();
        let session = manager.login("S3cr3t!").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let refreshed = manager.authorize(&session.id).unwrap();
        assert!(refreshed.expires_at > session.expires_at);
    }

    #[test]
    fn expired_session_is_rejected_and_removed() {
        let manager = SessionManager::new(Some("pw".to_string()), Duration::zero());
        let session = manager.login("pw").unwrap();
        assert_eq!(manager.authorize(&session.id), Err(AuthError::Unauthenticated));
        assert_eq!(manager.active_session_count(), 0);
    }

    #[test]
    fn sweep_removes_only_expired_sessions() {
        let short = SessionManager::new(Some("pw".to_string()), Duration::zero());
        short.login("pw").unwrap();
        short.login("pw").unwrap();
        assert_eq!(short.sweep_expired(), 2);
        assert_eq!(short.active_session_count(), 0);

        let long = manager();
        long.login("S3cr3t!").unwrap();
        assert_eq!(long.sweep_expired(), 0);
        assert_eq!(long.active_session_count(), 1);
    }

    #[test]
    fn tokens_are_unique() {
        let manager = manager();
        let a = manager.login("S3cr3t!").unwrap();
        let b = manager.login("S3cr3t!").unwrap();
        assert_ne!(a.id, b.id);
    }
}
