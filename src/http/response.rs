//! Error responses.
//!
//! Per-request failures become plain-text responses; they never reach the
//! process. Upstream failures map to 502, missing content to 404.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

pub fn error_response(status: StatusCode, message: &'static str) -> Response {
    let mut response = (status, message).into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

pub fn not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "404 page not found\n")
}

pub fn bad_gateway() -> Response {
    error_response(StatusCode::BAD_GATEWAY, "502 bad gateway\n")
}
