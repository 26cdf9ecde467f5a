use rust_embed::RustEmbed;
use warp::http::StatusCode;
use warp::reply::{self, Response};
use warp::Reply;

/// Admin panel pages compiled into the binary.
#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/assets/"]
pub struct Assets;

pub const LOGIN_PAGE: &str = "login.html";
pub const DASHBOARD_PAGE: &str = "dashboard.html";
pub const VIDEOS_PAGE: &str = "videos.html";

pub fn embedded_page(name: &str) -> Response {
    match Assets::get(name) {
        Some(file) => {
            let mime = mime_guess::from_path(name).first_or_octet_stream();
            reply::with_header(file.data.into_owned(), "content-type", mime.to_string())
                .into_response()
        }
        None => reply::with_status(reply::html("<h1>Not found</h1>"), StatusCode::NOT_FOUND)
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_are_embedded() {
        for page in [LOGIN_PAGE, DASHBOARD_PAGE, VIDEOS_PAGE] {
            assert!(Assets::get(page).is_some(), "{} missing", page);
            let response = embedded_page(page);
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(response.headers()["content-type"], "text/html");
        }
        assert_eq!(embedded_page("nope.html").status(), StatusCode::NOT_FOUND);
    }
}
