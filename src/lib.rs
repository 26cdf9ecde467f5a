pub mod configuration;
pub mod controller;
pub mod error_handling;
pub mod geo_lookup;
pub mod session_management;
pub mod storage;
pub mod web_interface;

pub use configuration::Config;
pub use controller::AppState;
pub use web_interface::WebServer;
