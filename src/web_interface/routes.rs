use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::TryStreamExt;
use log::{error, info};
use warp::http::{header, StatusCode, Uri};
use warp::multipart::FormData;
use warp::reply::{self, Response};
use warp::{Filter, Rejection, Reply};

use super::assets::{embedded_page, DASHBOARD_PAGE, LOGIN_PAGE, VIDEOS_PAGE};
use super::rejection::{json_error, json_message, Unauthenticated};
use super::types::{
    client_ip, FileNameRequest, LoginForm, PreciseLocationRequest, Surface, UploadResponse,
    UrlResponse,
};
use crate::controller::AppState;
use crate::error_handling::types::AppError;
use crate::session_management::{Session, SESSION_COOKIE};
use crate::storage::{ClearOutcome, UploadSource};

/// Multipart field carrying the uploaded video.
pub const UPLOAD_FIELD: &str = "videoFile";

const SMALL_BODY_LIMIT: u64 = 16 * 1024;
const MULTIPART_OVERHEAD: u64 = 64 * 1024;
const LOG_WRITE_FAILED: &str = "Failed to write to log file";

/// Resolves the session cookie, rejecting with [`Unauthenticated`] when it is
/// missing, unknown or expired. Must sit after the path match so unknown
/// paths still produce a 404.
pub fn with_session(
    state: Arc<AppState>,
    surface: Surface,
) -> impl Filter<Extract = (Session,), Error = Rejection> + Clone {
    warp::cookie::optional(SESSION_COOKIE).and_then(move |token: Option<String>| {
        let state = state.clone();
        async move {
            state
                .admin
                .authorize(token.as_deref())
                .map_err(|_| warp::reject::custom(Unauthenticated { surface }))
        }
    })
}

fn with_client_ip() -> impl Filter<Extract = (Option<String>,), Error = Rejection> + Clone {
    warp::header::optional::<String>("x-forwarded-for")
        .and(warp::addr::remote())
        .map(|forwarded: Option<String>, remote: Option<SocketAddr>| {
            client_ip(forwarded.as_deref(), remote)
        })
}

fn session_cookie(token: &str, max_age_secs: i64, secure: bool) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}{}",
        SESSION_COOKIE,
        token,
        max_age_secs,
        if secure { "; Secure" } else { "" }
    )
}

/// Cookie for `session` with a `Max-Age` of one full TTL.
fn renewed_session_cookie(state: &AppState, session: &Session) -> String {
    let max_age = state.admin.sessions().session_ttl().num_seconds();
    session_cookie(&session.id, max_age, state.config.auth.cookie_secure)
}

/// Re-issues the session cookie on a gated reply so the browser-side
/// lifetime slides along with the server-side expiry.
fn with_renewed_cookie(state: &AppState, session: &Session, res: impl Reply) -> Response {
    reply::with_header(res, header::SET_COOKIE, renewed_session_cookie(state, session))
        .into_response()
}

fn log_write_error(err: AppError) -> Response {
    match err {
        AppError::StorageFailure(detail) => {
            error!("Visitor log write failed: {}", detail);
            json_message(LOG_WRITE_FAILED, StatusCode::INTERNAL_SERVER_ERROR)
        }
        other => json_error(&other),
    }
}

/// POST /api/log-ip-location
pub fn log_ip_location_route(
    state: Arc<AppState>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "log-ip-location")
        .and(warp::post())
        .and(with_client_ip())
        .and_then(move |ip: Option<String>| {
            let state = state.clone();
            async move {
                let res = match state.public.log_ip_location(ip.as_deref()).await {
                    Ok(()) => json_message("IP location log attempted", StatusCode::OK),
                    Err(e) => log_write_error(e),
                };
                Ok::<_, Rejection>(res)
            }
        })
}

/// POST /api/log-precise-location
pub fn log_precise_location_route(
    state: Arc<AppState>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "log-precise-location")
        .and(warp::post())
        .and(with_client_ip())
        .and(warp::body::content_length_limit(SMALL_BODY_LIMIT))
        .and(warp::body::json())
        .and_then(move |ip: Option<String>, body: PreciseLocationRequest| {
            let state = state.clone();
            async move {
                let res = match state
                    .public
                    .log_precise_location(ip.as_deref(), body.latitude, body.longitude)
                    .await
                {
                    Ok(()) => json_message("Precise location logged successfully", StatusCode::OK),
                    Err(e) => log_write_error(e),
                };
                Ok::<_, Rejection>(res)
            }
        })
}

/// GET /api/active-video
pub fn active_video_route(
    state: Arc<AppState>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "active-video")
        .and(warp::get())
        .and_then(move || {
            let state = state.clone();
            async move {
                let url = state.admin.active_video_url().await;
                Ok::<_, Rejection>(reply::json(&UrlResponse { url }))
            }
        })
}

/// GET /admin
pub fn login_page_route() -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("admin")
        .and(warp::get())
        .map(|| embedded_page(LOGIN_PAGE))
}

/// POST /admin/login, accepting either a form post or a JSON body.
pub fn login_route(
    state: Arc<AppState>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let credentials = warp::body::content_length_limit(SMALL_BODY_LIMIT).and(
        warp::body::json::<LoginForm>()
            .or(warp::body::form::<LoginForm>())
            .unify(),
    );

    warp::path!("admin" / "login")
        .and(warp::post())
        .and(credentials)
        .and_then(move |form: LoginForm| {
            let state = state.clone();
            async move {
                let res = match state.admin.login(&form.password) {
                    Ok(session) => {
                        let cookie = renewed_session_cookie(&state, &session);
                        reply::with_header(
                            warp::redirect::see_other(Uri::from_static("/admin/dashboard")),
                            header::SET_COOKIE,
                            cookie,
                        )
                        .into_response()
                    }
                    Err(e) => reply::with_status(
                        reply::html(format!(
                            "<h1>{}</h1><p><a href=\"/admin\">Back to login</a></p>",
                            e.public_message()
                        )),
                        e.status_code(),
                    )
                    .into_response(),
                };
                Ok::<_, Rejection>(res)
            }
        })
}

/// POST /admin/logout
pub fn logout_route(
    state: Arc<AppState>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("admin" / "logout")
        .and(warp::post())
        .and(warp::cookie::optional(SESSION_COOKIE))
        .and_then(move |token: Option<String>| {
            let state = state.clone();
            async move {
                state.admin.logout(token.as_deref());
                let cookie = session_cookie("", 0, state.config.auth.cookie_secure);
                Ok::<_, Rejection>(reply::with_header(
                    warp::redirect::see_other(Uri::from_static("/admin")),
                    header::SET_COOKIE,
                    cookie,
                ))
            }
        })
}

/// GET /admin/dashboard
pub fn dashboard_page_route(
    state: Arc<AppState>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("admin" / "dashboard")
        .and(warp::get())
        .and(with_session(state.clone(), Surface::Page))
        .map(move |session: Session| {
            with_renewed_cookie(&state, &session, embedded_page(DASHBOARD_PAGE))
        })
}

/// GET /admin/videos
pub fn videos_page_route(
    state: Arc<AppState>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("admin" / "videos")
        .and(warp::get())
        .and(with_session(state.clone(), Surface::Page))
        .map(move |session: Session| {
            with_renewed_cookie(&state, &session, embedded_page(VIDEOS_PAGE))
        })
}

/// GET /admin/api/logs/:category
pub fn read_log_route(
    state: Arc<AppState>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("admin" / "api" / "logs" / String)
        .and(warp::get())
        .and(with_session(state.clone(), Surface::Api))
        .and_then(move |category: String, session: Session| {
            let state = state.clone();
            async move {
                let res = match state.admin.read_log(&category).await {
                    Ok(text) => reply::with_header(
                        text,
                        header::CONTENT_TYPE,
                        "text/plain; charset=utf-8",
                    )
                    .into_response(),
                    Err(e) => json_error(&e),
                };
                Ok::<_, Rejection>(with_renewed_cookie(&state, &session, res))
            }
        })
}

/// GET /admin/api/download/:category
pub fn download_log_route(
    state: Arc<AppState>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("admin" / "api" / "download" / String)
        .and(warp::get())
        .and(with_session(state.clone(), Surface::Api))
        .and_then(move |category: String, session: Session| {
            let state = state.clone();
            async move {
                let res = match state.admin.download_log(&category).await {
                    Ok(download) => {
                        let disposition =
                            format!("attachment; filename=\"{}\"", download.file_name);
                        reply::with_header(
                            reply::with_header(
                                download.bytes,
                                header::CONTENT_TYPE,
                                "text/plain; charset=utf-8",
                            ),
                            header::CONTENT_DISPOSITION,
                            disposition,
                        )
                        .into_response()
                    }
                    Err(e) => json_error(&e),
                };
                Ok::<_, Rejection>(with_renewed_cookie(&state, &session, res))
            }
        })
}

/// POST /admin/api/clear-logs/:category
pub fn clear_log_route(
    state: Arc<AppState>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("admin" / "api" / "clear-logs" / String)
        .and(warp::post())
        .and(with_session(state.clone(), Surface::Api))
        .and_then(move |category: String, session: Session| {
            let state = state.clone();
            async move {
                let res = match state.admin.clear_log(&category).await {
                    Ok(ClearOutcome::Cleared) => json_message(
                        format!("Log '{}' cleared successfully", category),
                        StatusCode::OK,
                    ),
                    Ok(ClearOutcome::NothingToClear) => json_message(
                        format!("Log '{}' does not exist, nothing to clear", category),
                        StatusCode::OK,
                    ),
                    Err(e) => json_error(&e),
                };
                Ok::<_, Rejection>(with_renewed_cookie(&state, &session, res))
            }
        })
}

/// GET /api/admin/videos
pub fn list_videos_route(
    state: Arc<AppState>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "admin" / "videos")
        .and(warp::get())
        .and(with_session(state.clone(), Surface::Api))
        .and_then(move |session: Session| {
            let state = state.clone();
            async move {
                let res = match state.admin.list_videos().await {
                    Ok(assets) => {
                        let names: Vec<String> =
                            assets.into_iter().map(|asset| asset.file_name).collect();
                        reply::json(&names).into_response()
                    }
                    Err(e) => json_error(&e),
                };
                Ok::<_, Rejection>(with_renewed_cookie(&state, &session, res))
            }
        })
}

/// POST /api/admin/videos/upload (multipart, field `videoFile`)
pub fn upload_video_route(
    state: Arc<AppState>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let max_length = state
        .config
        .storage
        .max_upload_bytes
        .saturating_add(MULTIPART_OVERHEAD);

    warp::path!("api" / "admin" / "videos" / "upload")
        .and(warp::post())
        .and(with_session(state.clone(), Surface::Api))
        .and(warp::multipart::form().max_length(max_length))
        .and_then(move |session: Session, form: FormData| {
            let state = state.clone();
            async move {
                let res = handle_upload(&state, &session, form).await;
                Ok::<_, Rejection>(with_renewed_cookie(&state, &session, res))
            }
        })
}

async fn handle_upload(state: &AppState, session: &Session, mut form: FormData) -> Response {
    let mut upload = None;
    loop {
        let part = match form.try_next().await {
            Ok(Some(part)) => part,
            Ok(None) => break,
            Err(e) => {
                return json_error(&AppError::InvalidInput(format!(
                    "Malformed multipart body: {}",
                    e
                )))
            }
        };
        if part.name() != UPLOAD_FIELD {
            continue;
        }
        match part.filename() {
            Some(name) if !name.is_empty() => {
                let name = name.to_string();
                upload = Some(UploadSource::new(name, part.stream()));
                break;
            }
            _ => continue,
        }
    }

    match state.admin.upload_video(upload).await {
        Ok(asset) => {
            info!(
                "Session {}... uploaded {} ({} bytes) at {}",
                session.id.get(..8).unwrap_or_default(),
                asset.file_name,
                asset.size_bytes,
                asset.uploaded_at.to_rfc3339()
            );
            reply::json(&UploadResponse {
                message: "Video uploaded successfully".to_string(),
                file_name: asset.file_name,
                size_bytes: asset.size_bytes,
            })
            .into_response()
        }
        Err(e) => json_error(&e),
    }
}

/// POST /api/admin/videos/set-active
pub fn set_active_video_route(
    state: Arc<AppState>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "admin" / "videos" / "set-active")
        .and(warp::post())
        .and(with_session(state.clone(), Surface::Api))
        .and(warp::body::content_length_limit(SMALL_BODY_LIMIT))
        .and(warp::body::json())
        .and_then(move |session: Session, body: FileNameRequest| {
            let state = state.clone();
            async move {
                let result = state.admin.set_active_video(body.file_name.as_deref()).await;
                let name = body.file_name.unwrap_or_default();
                let res = match result {
                    Ok(()) => json_message(
                        format!("Video '{}' is now active", name.trim()),
                        StatusCode::OK,
                    ),
                    Err(e) => json_error(&e),
                };
                Ok::<_, Rejection>(with_renewed_cookie(&state, &session, res))
            }
        })
}

/// POST /api/admin/videos/delete
pub fn delete_video_route(
    state: Arc<AppState>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "admin" / "videos" / "delete")
        .and(warp::post())
        .and(with_session(state.clone(), Surface::Api))
        .and(warp::body::content_length_limit(SMALL_BODY_LIMIT))
        .and(warp::body::json())
        .and_then(move |session: Session, body: FileNameRequest| {
            let state = state.clone();
            async move {
                let result = state.admin.delete_video(body.file_name.as_deref()).await;
                let name = body.file_name.unwrap_or_default();
                let res = match result {
                    Ok(()) => json_message(
                        format!("Video '{}' deleted successfully", name.trim()),
                        StatusCode::OK,
                    ),
                    Err(e) => json_error(&e),
                };
                Ok::<_, Rejection>(with_renewed_cookie(&state, &session, res))
            }
        })
}

/// GET /videos/:file
pub fn video_files_route(
    state: Arc<AppState>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let dir = state.admin.videos().videos_dir().to_path_buf();
    warp::path("videos")
        .and(warp::get())
        .and(reject_hidden_segments())
        .and(warp::fs::dir(dir))
}

/// 404s any path with a dot-file segment, which covers in-flight `.part`
/// uploads.
fn reject_hidden_segments() -> impl Filter<Extract = (), Error = Rejection> + Clone {
    warp::path::peek()
        .and_then(|peek: warp::path::Peek| async move {
            let hidden = peek.segments().any(|segment| {
                segment.starts_with('.') || segment.to_ascii_lowercase().starts_with("%2e")
            });
            if hidden {
                Err(warp::reject::not_found())
            } else {
                Ok(())
            }
        })
        .untuple_one()
}

/// Optional static site served from `server.public_dir`; without one every
/// request falls through to a 404.
pub fn public_files_route(
    state: Arc<AppState>,
) -> warp::filters::BoxedFilter<(Response,)> {
    match state.config.server.public_dir.clone() {
        Some(dir) => warp::get()
            .and(warp::fs::dir(dir))
            .map(|file: warp::fs::File| file.into_response())
            .boxed(),
        None => warp::any()
            .and_then(|| async { Err::<Response, Rejection>(warp::reject::not_found()) })
            .boxed(),
    }
}
