//! Request forwarding to a project's origin.
//!
//! # Responsibilities
//! - Build the upstream URL from the project's `urlPrefix`
//! - Copy request headers, rewriting `Host` and dropping hop-by-hop ones
//! - Negotiate gzip upstream and hand a decoded, streamed body back
//!
//! # Design Decisions
//! - One shared `reqwest::Client`, certificate verification disabled
//! - `GET` requests are forwarded without a body
//! - Transport failures surface as [`ForwardError`]; the HTTP layer turns them into 502

use axum::body::Body;
use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use axum::http::{Method, Response};
use thiserror::Error;

use crate::http::request::CapturedRequest;
use crate::proxy::host::{parse_host, target_url};
use crate::routing::ProjectRoute;

/// Headers that only make sense for a single connection.
const HOP_BY_HOP: [&str; 7] = [
    "connection",
    "keep-alive",
    "proxy-connection",
    "transfer-encoding",
    "upgrade",
    "te",
    "trailer",
];

#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("project {project} has no origin configured")]
    NoOrigin { project: String },

    #[error("invalid upstream url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("upstream request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Forwards unmatched requests to project origins.
#[derive(Debug, Clone)]
pub struct Forwarder {
    client: reqwest::Client,
}

impl Forwarder {
    pub fn new() -> Result<Self, ForwardError> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .gzip(true)
            .no_proxy()
            .build()
            .map_err(ForwardError::Client)?;
        Ok(Self { client })
    }

    /// Issue `request` against `project`'s origin and return the upstream response.
    pub async fn forward(
        &self,
        project: &ProjectRoute,
        request: &CapturedRequest,
    ) -> Result<Response<Body>, ForwardError> {
        let prefix = project
            .url_prefix
            .as_deref()
            .ok_or_else(|| ForwardError::NoOrigin {
                project: project.uuid.clone(),
            })?;
        let target = target_url(prefix, &request.remainder());
        let url = url::Url::parse(&target).map_err(|source| ForwardError::InvalidUrl {
            url: target.clone(),
            source,
        })?;

        tracing::debug!(
            project = %project.uuid,
            method = %request.method(),
            url = %url,
            "Forwarding request"
        );

        let mut builder = self
            .client
            .request(request.method().clone(), url)
            .headers(upstream_headers(&request.headers, prefix));
        if *request.method() != Method::GET {
            builder = builder.body(request.shape.body.clone());
        }

        let upstream = builder
            .send()
            .await
            .map_err(|source| ForwardError::Transport {
                url: target.clone(),
                source,
            })?;

        let status = upstream.status();
        let headers = downstream_headers(upstream.headers());
        let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(&name.as_str())
}

/// Request headers sent upstream.
fn upstream_headers(incoming: &HeaderMap, url_prefix: &str) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(incoming.len());
    for (name, value) in incoming {
        if is_hop_by_hop(name)
            || name == header::HOST
            || name == header::CONTENT_LENGTH
            || name == header::ACCEPT_ENCODING
        {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    if let Ok(host) = HeaderValue::from_str(parse_host(url_prefix)) {
        headers.insert(header::HOST, host);
    }
    headers
}

/// Upstream response headers returned to the client. The body is already decoded.
fn downstream_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(upstream.len());
    for (name, value) in upstream {
        if is_hop_by_hop(name)
            || name == header::CONTENT_LENGTH
            || name == header::CONTENT_ENCODING
        {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers
}
