//! Response construction helpers.
//!
//! # Responsibilities
//! - Fix the response type produced by dispatch
//! - Build the plain status responses the adapter returns on failure

use axum::body::Body;
use axum::http::{header, StatusCode};

/// Response type produced by handlers and renderers.
pub type Response = axum::http::Response<Body>;

/// Build a response with a body and content type.
pub fn with_body(status: StatusCode, content_type: &str, body: impl Into<Body>) -> Response {
    let mut response = Response::new(body.into());
    *response.status_mut() = status;
    if let Ok(value) = header::HeaderValue::from_str(content_type) {
        response.headers_mut().insert(header::CONTENT_TYPE, value);
    }
    response
}

/// Plain-text status response.
pub fn status_text(status: StatusCode, message: impl Into<String>) -> Response {
    with_body(status, "text/plain; charset=utf-8", message.into())
}
