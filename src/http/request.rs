//! Request capture.
//!
//! # Responsibilities
//! - Buffer the body once, up to the configured limit
//! - Keep what dispatch needs ([`RequestShape`]) and what forwarding needs (headers, raw query)
//!
//! # Design Decisions
//! - The body is read before dispatch: both exact matching and forwarding consume it
//! - Over-limit or broken bodies are rejected before touching the routing table

use axum::body::{to_bytes, Body};
use axum::http::{HeaderMap, Method, Request, StatusCode};

use crate::routing::RequestShape;

/// An incoming request, fully buffered.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub shape: RequestShape,
    pub headers: HeaderMap,
    /// Query string as received, without the `?`.
    pub raw_query: Option<String>,
}

impl CapturedRequest {
    pub async fn capture(request: Request<Body>, max_body_size: usize) -> Result<Self, StatusCode> {
        let (parts, body) = request.into_parts();
        let body = to_bytes(body, max_body_size).await.map_err(|e| {
            tracing::warn!(error = %e, limit = max_body_size, "Failed to read request body");
            StatusCode::PAYLOAD_TOO_LARGE
        })?;

        let raw_query = parts.uri.query().map(str::to_string);
        let shape = RequestShape::new(
            parts.method,
            parts.uri.path(),
            raw_query.as_deref(),
            body,
        );

        Ok(Self {
            shape,
            headers: parts.headers,
            raw_query,
        })
    }

    pub fn method(&self) -> &Method {
        &self.shape.method
    }

    pub fn path(&self) -> &str {
        &self.shape.path
    }

    /// Path and query below the project segment, without the leading `/`.
    pub fn remainder(&self) -> String {
        let path = self.shape.path_in_project().trim_start_matches('/');
        match &self.raw_query {
            Some(query) => format!("{path}?{query}"),
            None => path.to_string(),
        }
    }
}
