use std::convert::Infallible;

use log::{debug, error};
use warp::http::{StatusCode, Uri};
use warp::reply::{self, Response};
use warp::{Rejection, Reply};

use super::types::{MessageResponse, Surface};
use crate::error_handling::types::AppError;

/// Raised by the session gate; turned into a 401 or a redirect by
/// [`handle_rejection`].
#[derive(Debug)]
pub struct Unauthenticated {
    pub surface: Surface,
}

impl warp::reject::Reject for Unauthenticated {}

pub const LOGIN_URL: &str = "/admin";

pub fn json_message(message: impl Into<String>, status: StatusCode) -> Response {
    reply::with_status(reply::json(&MessageResponse::new(message)), status).into_response()
}

pub fn json_error(err: &AppError) -> Response {
    if let AppError::StorageFailure(ref detail) = err {
        error!("Request failed with a storage error: {}", detail);
    } else {
        debug!("Request rejected: {}", err);
    }
    json_message(err.public_message(), err.status_code())
}

pub fn redirect_to_login() -> Response {
    warp::redirect::see_other(Uri::from_static(LOGIN_URL)).into_response()
}

pub async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    if let Some(Unauthenticated { surface }) = err.find::<Unauthenticated>() {
        return Ok(match surface {
            Surface::Api => json_error(&AppError::Unauthenticated),
            Surface::Page => redirect_to_login(),
        });
    }

    let response = if err.is_not_found() {
        json_message("Not found", StatusCode::NOT_FOUND)
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        json_message(format!("Malformed request body: {}", e), StatusCode::BAD_REQUEST)
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        json_message("Unsupported content type", StatusCode::UNSUPPORTED_MEDIA_TYPE)
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        json_message("Payload too large", StatusCode::PAYLOAD_TOO_LARGE)
    } else if err.find::<warp::reject::LengthRequired>().is_some() {
        json_message("Content-Length required", StatusCode::LENGTH_REQUIRED)
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        json_message("Method not allowed", StatusCode::METHOD_NOT_ALLOWED)
    } else if err.find::<warp::reject::InvalidHeader>().is_some() {
        json_message("Invalid request header", StatusCode::BAD_REQUEST)
    } else {
        error!("Unhandled rejection: {:?}", err);
        json_message("Internal server error", StatusCode::INTERNAL_SERVER_ERROR)
    };
    Ok(response)
}
