use std::sync::Arc;

use clap::Parser;
use geoframe::configuration::{CliArgs, Config};
use geoframe::controller::AppState;
use geoframe::web_interface::WebServer;
use log::{error, info};

#[tokio::main]
async fn main() {
    // https://docs.rs/env_logger/latest/env_logger/
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .init();

    info!("geoframe v{} starting", env!("CARGO_PKG_VERSION"));

    let args = CliArgs::parse();

    let config = Config::load(&args).unwrap_or_else(|e| {
        error!("Unable to load configuration: {}", e);
        std::process::exit(1);
    });

    let state = AppState::from_config(&config).unwrap_or_else(|e| {
        error!("Unable to initialize the application state: {}, exiting...", e);
        std::process::exit(1);
    });

    let server = WebServer::new(Arc::new(state));
    if let Err(e) = server.start().await {
        error!("Web server failed: {}", e);
        std::process::exit(1);
    }
}
