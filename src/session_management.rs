//! Admin session management.
//!
//! A single shared secret unlocks the admin panel. A successful login creates
//! a server-side [`session::Session`] keyed by an opaque random token which the
//! client carries in a cookie. Sessions slide forward on every authorized
//! request and are swept periodically once expired.

/// Session record kept on the server.
pub mod session;
/// Login, authorization and logout over an in-memory session map.
pub mod session_manager;

pub use session::Session;
pub use session_manager::SessionManager;

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "geoframe_sid";
