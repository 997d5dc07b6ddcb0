//! Compiled routing table.
//!
//! # Responsibilities
//! - Register every enabled endpoint under `(method, /<segment><path>)`
//! - Map full request signatures to canned responses
//! - Keep the declared params/bodies per route for strict matching
//! - Keep per-endpoint candidates for relaxed matching
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(1) exact route and signature lookup via HashMap
//! - O(n) scan over wildcard routes and relaxed candidates, in registration order
//! - Published through [`SharedRoutingTable`], replaced wholesale on reload

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::http::{Method, StatusCode};
use serde_json::Value;

use crate::config::normalize::{ConfigGeneration, Endpoint, Project};
use crate::config::schema::ResponseBody;
use crate::routing::matcher::{parse_query, query_subset, simplify_declared_body, QueryMap};
use crate::routing::signature::{Disambiguator, RequestSignature, RouteKey};

/// What an exact match delivers.
#[derive(Debug, Clone, PartialEq)]
pub struct MockResponse {
    pub endpoint_id: String,
    pub body: ResponseBody,
    pub status: StatusCode,
    pub delay: Duration,
}

/// Declared request shapes registered on one route.
#[derive(Debug, Clone, Default)]
pub struct RouteEntry {
    /// Raw `request.params` of every endpoint on the route.
    pub params: Vec<String>,
    /// `request.body` of every endpoint on the route.
    pub bodies: Vec<Value>,
}

/// A project reachable under its public segment.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectRoute {
    pub uuid: String,
    pub segment: String,
    pub url_prefix: Option<String>,
}

impl ProjectRoute {
    fn from_project(project: &Project) -> Self {
        Self {
            uuid: project.uuid.clone(),
            segment: project.segment().to_string(),
            url_prefix: project.url_prefix.clone(),
        }
    }
}

/// An endpoint as seen by the relaxed matcher.
#[derive(Debug, Clone)]
pub struct RelaxedCandidate {
    pub endpoint_id: String,
    pub segment: String,
    pub method: Method,
    /// Endpoint path without the project segment.
    pub path: String,
    pub params: QueryMap,
    pub simplified_body: Option<String>,
    /// Where a relaxed hit is re-dispatched to.
    pub signature: RequestSignature,
}

/// Immutable routing snapshot for one configuration generation.
#[derive(Debug, Default)]
pub struct RoutingTable {
    generation: u64,
    routes: HashMap<RouteKey, RouteEntry>,
    /// Routes whose scoped path contains `*`, in registration order.
    patterns: Vec<RouteKey>,
    responses: HashMap<RequestSignature, Arc<MockResponse>>,
    projects: HashMap<String, ProjectRoute>,
    candidates: Vec<RelaxedCandidate>,
}

impl RoutingTable {
    /// Build a table from a normalized generation.
    ///
    /// Projects register in declaration order; a project whose segment is
    /// already taken is not served. Disabled endpoints are skipped.
    pub fn build(config: &ConfigGeneration) -> Self {
        let mut table = RoutingTable::default();

        for project in config.ordered_projects() {
            let segment = project.segment();
            if table.projects.contains_key(segment) {
                tracing::warn!(
                    project = %project.uuid,
                    segment = %segment,
                    "Project segment already registered, skipping project"
                );
                continue;
            }
            table
                .projects
                .insert(segment.to_string(), ProjectRoute::from_project(project));

            for endpoint in config.project_endpoints(project) {
                if endpoint.enable {
                    table.register(segment, endpoint);
                }
            }
        }

        tracing::debug!(
            projects = table.projects.len(),
            routes = table.routes.len(),
            responses = table.responses.len(),
            "Routing table built"
        );
        table
    }

    fn register(&mut self, segment: &str, endpoint: &Endpoint) {
        let scoped_path = format!("/{}{}", segment, endpoint.path);
        let route = RouteKey::new(endpoint.method.to_http(), scoped_path);

        if scoped_path_is_pattern(&route.scoped_path) && !self.routes.contains_key(&route) {
            self.patterns.push(route.clone());
        }
        let entry = self.routes.entry(route.clone()).or_default();
        entry.params.push(endpoint.request.params.clone());
        entry.bodies.push(endpoint.request.body.clone());

        let signature =
            RequestSignature::new(route, Disambiguator::for_endpoint(&endpoint.request));
        let status = StatusCode::from_u16(endpoint.status_code)
            .ok()
            .filter(|s| s.as_u16() < 600)
            .unwrap_or(StatusCode::OK);
        let response = Arc::new(MockResponse {
            endpoint_id: endpoint.uuid.clone(),
            body: endpoint.response.clone(),
            status,
            delay: endpoint.delay(),
        });

        if let Some(previous) = self.responses.insert(signature.clone(), response) {
            tracing::warn!(
                signature = %signature,
                replaced = %previous.endpoint_id,
                endpoint = %endpoint.uuid,
                "Duplicate request signature, last declaration wins"
            );
        }

        self.candidates.push(RelaxedCandidate {
            endpoint_id: endpoint.uuid.clone(),
            segment: segment.to_string(),
            method: endpoint.method.to_http(),
            path: endpoint.path.clone(),
            params: parse_query(&endpoint.request.params),
            simplified_body: simplify_declared_body(&endpoint.request.body),
            signature,
        });
    }

    /// Tag the table with the generation number it was built for.
    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Find the registered route serving `method path`.
    ///
    /// Exact registrations win over wildcard ones; wildcards are tried in
    /// registration order.
    pub fn resolve_route(&self, method: &Method, path: &str) -> Option<(&RouteKey, &RouteEntry)> {
        let exact = RouteKey::new(method.clone(), path);
        if let Some(found) = self.routes.get_key_value(&exact) {
            return Some(found);
        }

        self.patterns
            .iter()
            .filter(|key| key.method == *method && glob_match(&key.scoped_path, path))
            .find_map(|key| self.routes.get_key_value(key))
    }

    pub fn response(&self, signature: &RequestSignature) -> Option<&Arc<MockResponse>> {
        self.responses.get(signature)
    }

    /// Project served under `segment`.
    pub fn project(&self, segment: &str) -> Option<&ProjectRoute> {
        self.projects.get(segment)
    }

    /// Enabled endpoints of `segment` that tolerate the given request.
    ///
    /// Method and path must be equal, bodies must be equal once simplified, and
    /// the declared query parameters must be a subset of `query`.
    pub fn relaxed_matches(
        &self,
        segment: &str,
        method: &Method,
        path: &str,
        query: &QueryMap,
        simplified_body: Option<&str>,
    ) -> Vec<&RelaxedCandidate> {
        self.candidates
            .iter()
            .filter(|c| c.segment == segment && c.method == *method && c.path == path)
            .filter(|c| c.simplified_body.as_deref() == simplified_body)
            .filter(|c| query_subset(&c.params, query))
            .collect()
    }

    /// Number of registered request signatures.
    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }
}

fn scoped_path_is_pattern(path: &str) -> bool {
    path.contains('*')
}

/// Match `path` against a pattern where each `*` stands for any run of characters.
fn glob_match(pattern: &str, path: &str) -> bool {
    let mut parts = pattern.split('*');
    let first = parts.next().unwrap_or_default();
    let Some(mut rest) = path.strip_prefix(first) else {
        return false;
    };

    let parts: Vec<&str> = parts.collect();
    let Some((last, middle)) = parts.split_last() else {
        return rest.is_empty();
    };

    for part in middle {
        match rest.find(part) {
            Some(index) => rest = &rest[index + part.len()..],
            None => return false,
        }
    }
    rest.ends_with(last)
}

/// The currently published routing table.
///
/// Readers take a snapshot per request and keep it for the whole request;
/// the reload controller replaces the table with a single atomic swap.
#[derive(Debug, Clone)]
pub struct SharedRoutingTable {
    inner: Arc<ArcSwap<RoutingTable>>,
}

impl SharedRoutingTable {
    pub fn new(table: RoutingTable) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(table)),
        }
    }

    pub fn snapshot(&self) -> Arc<RoutingTable> {
        self.inner.load_full()
    }

    /// Replace the published table, returning the previous one.
    pub fn publish(&self, table: RoutingTable) -> Arc<RoutingTable> {
        self.inner.swap(Arc::new(table))
    }
}

impl Default for SharedRoutingTable {
    fn default() -> Self {
        Self::new(RoutingTable::default())
    }
}
