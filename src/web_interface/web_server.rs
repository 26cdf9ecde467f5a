use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use tokio::task::JoinHandle;
use warp::{Filter, Reply};

use super::rejection::handle_rejection;
use super::routes::*;
use crate::controller::AppState;
use crate::error_handling::types::WebError;
use crate::session_management::SessionManager;

/// HTTP front of the service: public logging API, admin panel and static
/// video files.
pub struct WebServer {
    state: Arc<AppState>,
}

impl WebServer {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Full route table with rejection handling and access logging.
    pub fn routes(&self) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
        build_routes(self.state.clone())
    }

    /// Binds the configured address and serves until Ctrl-C.
    pub async fn start(&self) -> Result<(), WebError> {
        let server = &self.state.config.server;
        let ip: IpAddr = server.bind_address.parse().map_err(|_| {
            WebError::BindFailed(format!("invalid bind address '{}'", server.bind_address))
        })?;
        let addr = SocketAddr::new(ip, server.port);

        let sweeper = spawn_session_sweeper(
            self.state.admin.sessions().clone(),
            Duration::from_secs(self.state.config.auth.sweep_interval_secs),
        );

        let (bound, serving) = warp::serve(self.routes())
            .try_bind_with_graceful_shutdown(addr, async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!("Could not listen for the shutdown signal: {}", e);
                    std::future::pending::<()>().await;
                }
                info!("Shutdown signal received, draining connections");
            })
            .map_err(|e| WebError::BindFailed(format!("{}: {}", addr, e)))?;

        info!("Listening on http://{}", bound);
        serving.await;
        sweeper.abort();
        info!("Web server stopped");
        Ok(())
    }
}

pub fn build_routes(
    state: Arc<AppState>,
) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    let public_api = log_ip_location_route(state.clone())
        .or(log_precise_location_route(state.clone()))
        .or(active_video_route(state.clone()));

    let admin_pages = login_page_route()
        .or(login_route(state.clone()))
        .or(logout_route(state.clone()))
        .or(dashboard_page_route(state.clone()))
        .or(videos_page_route(state.clone()));

    let log_api = read_log_route(state.clone())
        .or(download_log_route(state.clone()))
        .or(clear_log_route(state.clone()));

    let video_api = list_videos_route(state.clone())
        .or(upload_video_route(state.clone()))
        .or(set_active_video_route(state.clone()))
        .or(delete_video_route(state.clone()));

    public_api
        .or(admin_pages)
        .or(log_api)
        .or(video_api)
        .or(video_files_route(state.clone()))
        .or(public_files_route(state))
        .recover(handle_rejection)
        .with(warp::log("geoframe::http"))
}

/// Periodically drops expired sessions so abandoned logins do not pile up.
pub fn spawn_session_sweeper(sessions: Arc<SessionManager>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        // first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            sessions.sweep_expired();
        }
    })
}
