//! Response rendering.
//!
//! # Responsibilities
//! - Render mock bodies: JSON values as JSON, strings as text
//! - Plain-text 404 and 502 responses
//!
//! # Design Decisions
//! - A `null` mock body renders as an empty JSON response
//! - Content types carry an explicit utf-8 charset

use axum::body::Body;
use axum::http::{header, HeaderValue, Response, StatusCode};
use axum::response::IntoResponse;

use crate::config::ResponseBody;
use crate::routing::MockResponse;

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
pub const TEXT_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Render a mock response.
pub fn mock(response: &MockResponse) -> Response<Body> {
    let (content_type, body) = match &response.body {
        ResponseBody::Json(serde_json::Value::Null) => (JSON_CONTENT_TYPE, String::new()),
        ResponseBody::Json(value) => (JSON_CONTENT_TYPE, value.to_string()),
        ResponseBody::Text(text) => (TEXT_CONTENT_TYPE, text.clone()),
    };
    with_content_type(response.status, content_type, body)
}

pub fn not_found(message: String) -> Response<Body> {
    with_content_type(StatusCode::NOT_FOUND, TEXT_CONTENT_TYPE, message)
}

pub fn bad_gateway() -> Response<Body> {
    with_content_type(StatusCode::BAD_GATEWAY, TEXT_CONTENT_TYPE, "Bad Gateway".to_string())
}

fn with_content_type(status: StatusCode, content_type: &'static str, body: String) -> Response<Body> {
    (
        status,
        [(header::CONTENT_TYPE, HeaderValue::from_static(content_type))],
        body,
    )
        .into_response()
}
