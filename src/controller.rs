//! Orchestration between the HTTP surface and the stores.
//!
//! `AdminController` serves everything behind the admin session gate,
//! `PublicLoggingController` the two anonymous logging endpoints. Both are
//! owned by [`app_state::AppState`], which is built once from the
//! configuration and shared by reference with every request handler.

pub mod admin_controller;
pub mod app_state;
pub mod logging_controller;

pub use admin_controller::AdminController;
pub use app_state::AppState;
pub use logging_controller::PublicLoggingController;
