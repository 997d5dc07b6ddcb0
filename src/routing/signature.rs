//! Dispatch keys.

use std::fmt;

use axum::http::Method;

use crate::config::schema::RequestConfig;
use crate::routing::matcher::{
    canonical_body, canonical_query_string, is_empty_body, parse_query, BodyForm, QueryMap,
};

/// Method plus scoped path (`/<project segment><endpoint path>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    pub method: Method,
    pub scoped_path: String,
}

impl RouteKey {
    pub fn new(method: Method, scoped_path: impl Into<String>) -> Self {
        Self {
            method,
            scoped_path: scoped_path.into(),
        }
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.scoped_path)
    }
}

/// The part of a signature that tells apart endpoints sharing a route.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Disambiguator {
    /// No query or body requirement.
    Bare,
    /// Canonical query string, including the leading `?`.
    Query(String),
    /// Canonical JSON body.
    Body(String),
}

impl Disambiguator {
    /// Disambiguator of a declared endpoint: query first, then body.
    pub fn for_endpoint(request: &RequestConfig) -> Self {
        let query = parse_query(&request.params);
        if !query.is_empty() {
            return Disambiguator::Query(canonical_query_string(&query));
        }
        if !is_empty_body(&request.body) {
            return Disambiguator::Body(canonical_body(&request.body));
        }
        Disambiguator::Bare
    }

    pub fn for_query(query: &QueryMap) -> Self {
        if query.is_empty() {
            Disambiguator::Bare
        } else {
            Disambiguator::Query(canonical_query_string(query))
        }
    }

    pub fn for_body(body: &BodyForm) -> Self {
        if body.is_empty() {
            Disambiguator::Bare
        } else {
            Disambiguator::Body(canonical_body(&body.as_value()))
        }
    }
}

impl fmt::Display for Disambiguator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Disambiguator::Bare => Ok(()),
            Disambiguator::Query(query) => f.write_str(query),
            Disambiguator::Body(body) => f.write_str(body),
        }
    }
}

/// Full key of the exact-match response map.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestSignature {
    pub route: RouteKey,
    pub disambiguator: Disambiguator,
}

impl RequestSignature {
    pub fn new(route: RouteKey, disambiguator: Disambiguator) -> Self {
        Self {
            route,
            disambiguator,
        }
    }
}

impl fmt::Display for RequestSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.route, self.disambiguator)
    }
}
