//! Request dispatch.
//!
//! # Responsibilities
//! - Exact match: route lookup, then query / body / bare disambiguation
//! - On a miss, resolve the project and try the relaxed matcher
//! - Decide between mock, forward and 404
//!
//! # Design Decisions
//! - Pure decision over one table snapshot; the HTTP layer performs the outcome
//! - Query is checked before body: a request carrying both only uses its query
//! - Relaxed ambiguity is resolved by registration order, never an error

use std::sync::Arc;

use axum::body::Bytes;
use axum::http::Method;

use crate::routing::matcher::{body_matches, parse_query, simplify_incoming_body, BodyForm, QueryMap};
use crate::routing::signature::{Disambiguator, RequestSignature};
use crate::routing::table::{MockResponse, ProjectRoute, RoutingTable};

/// The parts of an incoming request that dispatch looks at.
#[derive(Debug, Clone)]
pub struct RequestShape {
    pub method: Method,
    /// Raw path, starting with the project segment.
    pub path: String,
    pub query: QueryMap,
    pub body: Bytes,
}

impl RequestShape {
    pub fn new(method: Method, path: impl Into<String>, raw_query: Option<&str>, body: Bytes) -> Self {
        Self {
            method,
            path: path.into(),
            query: raw_query.map(parse_query).unwrap_or_default(),
            body,
        }
    }

    /// First path segment, e.g. `test` for `/test/object`.
    pub fn project_segment(&self) -> &str {
        self.path
            .trim_start_matches('/')
            .split('/')
            .next()
            .unwrap_or_default()
    }

    /// Path below the project segment, e.g. `/object` for `/test/object`.
    pub fn path_in_project(&self) -> &str {
        let segment = self.project_segment();
        self.path
            .strip_prefix('/')
            .and_then(|rest| rest.strip_prefix(segment))
            .unwrap_or(&self.path)
    }
}

/// How a mock response was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    /// Found by the relaxed matcher; `candidates` endpoints qualified.
    Relaxed { candidates: usize },
}

/// Why nothing could serve the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotFoundReason {
    UnknownProject(String),
    UnknownEndpoint,
}

impl NotFoundReason {
    /// Plain-text body of the 404 response.
    pub fn message(&self) -> String {
        match self {
            NotFoundReason::UnknownProject(segment) => format!("Project \"{segment}\" not found"),
            NotFoundReason::UnknownEndpoint => "URL endpoint not found".to_string(),
        }
    }
}

/// Outcome of dispatching one request.
#[derive(Debug, Clone)]
pub enum Dispatch {
    Mock {
        response: Arc<MockResponse>,
        kind: MatchKind,
    },
    Forward {
        project: ProjectRoute,
    },
    NotFound(NotFoundReason),
}

/// Dispatch `request` against `table`.
pub fn dispatch(table: &RoutingTable, request: &RequestShape) -> Dispatch {
    if let Some(response) = exact_match(table, request) {
        return Dispatch::Mock {
            response,
            kind: MatchKind::Exact,
        };
    }
    resolve_missed(table, request)
}

/// Exact dispatch: the registered route plus a strictly matching disambiguator.
pub fn exact_match(table: &RoutingTable, request: &RequestShape) -> Option<Arc<MockResponse>> {
    let (route, entry) = table.resolve_route(&request.method, &request.path)?;

    let disambiguator = if !request.query.is_empty() {
        let declared = entry
            .params
            .iter()
            .any(|params| parse_query(params) == request.query);
        if !declared {
            return None;
        }
        Disambiguator::for_query(&request.query)
    } else if !request.body.is_empty() {
        let body = BodyForm::parse(&request.body);
        if !entry.bodies.iter().any(|declared| body_matches(declared, &body)) {
            return None;
        }
        Disambiguator::for_body(&body)
    } else {
        Disambiguator::Bare
    };

    let signature = RequestSignature::new(route.clone(), disambiguator);
    table.response(&signature).cloned()
}

fn resolve_missed(table: &RoutingTable, request: &RequestShape) -> Dispatch {
    let segment = request.project_segment();
    let project = table.project(segment);

    let body = BodyForm::parse(&request.body);
    let simplified = simplify_incoming_body(&body);
    let candidates = table.relaxed_matches(
        segment,
        &request.method,
        request.path_in_project(),
        &request.query,
        simplified.as_deref(),
    );

    if let Some(first) = candidates.first() {
        if let Some(response) = table.response(&first.signature) {
            return Dispatch::Mock {
                response: Arc::clone(response),
                kind: MatchKind::Relaxed {
                    candidates: candidates.len(),
                },
            };
        }
    }

    match project {
        Some(project) if project.url_prefix.is_some() => Dispatch::Forward {
            project: project.clone(),
        },
        Some(_) => Dispatch::NotFound(NotFoundReason::UnknownEndpoint),
        None => Dispatch::NotFound(NotFoundReason::UnknownProject(segment.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::normalize::ConfigGeneration;
    use crate::config::schema::{ConfigDocument, ResponseBody};
    use serde_json::json;

    fn table(extra_project: serde_json::Value) -> RoutingTable {
        let doc: ConfigDocument = serde_json::from_value(json!({
            "projects": [
                {
                    "uuid": "p1",
                    "name": "test",
                    "endpoints": [
                        {"uuid": "empty", "path": "/empty", "method": "GET", "enable": true,
                         "response": {}},
                        {"uuid": "object", "path": "/object", "method": "POST", "enable": true,
                         "response": {"hey": "I am working"}},
                        {"uuid": "object-body", "path": "/object", "method": "POST", "enable": true,
                         "request": {"params": "", "body": {"param": "value"}},
                         "response": {"hey": "I am working with body"}},
                        {"uuid": "get-object", "path": "/object", "method": "GET", "enable": true,
                         "response": {"hey": "I am working"}},
                        {"uuid": "get-object-params", "path": "/object", "method": "GET", "enable": true,
                         "request": {"params": "?param=value", "body": {}},
                         "response": {"hey": "I am working with params"}},
                        {"uuid": "raw", "path": "/raw", "method": "PUT", "enable": true,
                         "request": {"params": "", "body": "plain text"},
                         "response": "raw matched"}
                    ]
                },
                extra_project
            ]
        }))
        .unwrap();
        RoutingTable::build(&ConfigGeneration::normalize(doc))
    }

    fn default_table() -> RoutingTable {
        table(json!({"uuid": "p2", "name": "slug_name_test", "slug": "test-slug", "endpoints": []}))
    }

    fn request(method: Method, path: &str, query: Option<&str>, body: &str) -> RequestShape {
        RequestShape::new(method, path, query, Bytes::from(body.to_string()))
    }

    fn mocked(outcome: Dispatch) -> (String, MatchKind) {
        match outcome {
            Dispatch::Mock { response, kind } => (response.endpoint_id.clone(), kind),
            other => panic!("expected a mock, got {other:?}"),
        }
    }

    #[test]
    fn segments() {
        let shape = request(Method::GET, "/test/object/nested", None, "");
        assert_eq!(shape.project_segment(), "test");
        assert_eq!(shape.path_in_project(), "/object/nested");

        let shape = request(Method::GET, "/test", None, "");
        assert_eq!(shape.path_in_project(), "");
    }

    #[test]
    fn bare_request_hits_bare_endpoint() {
        let t = default_table();
        let (id, kind) = mocked(dispatch(&t, &request(Method::GET, "/test/empty", None, "")));
        assert_eq!(id, "empty");
        assert_eq!(kind, MatchKind::Exact);
    }

    #[test]
    fn body_presence_disambiguates() {
        let t = default_table();
        let (id, _) = mocked(dispatch(&t, &request(Method::POST, "/test/object", None, "")));
        assert_eq!(id, "object");

        let (id, kind) = mocked(dispatch(
            &t,
            &request(Method::POST, "/test/object", None, r#"{"param":"value"}"#),
        ));
        assert_eq!(id, "object-body");
        assert_eq!(kind, MatchKind::Exact);
    }

    #[test]
    fn empty_json_body_is_bare() {
        let t = default_table();
        let (id, kind) = mocked(dispatch(&t, &request(Method::POST, "/test/object", None, "{}")));
        assert_eq!(id, "object");
        assert_eq!(kind, MatchKind::Exact);
    }

    #[test]
    fn raw_text_body() {
        let t = default_table();
        let (id, kind) = mocked(dispatch(&t, &request(Method::PUT, "/test/raw", None, "plain text")));
        assert_eq!(id, "raw");
        assert_eq!(kind, MatchKind::Exact);
    }

    #[test]
    fn query_in_any_order() {
        let t = table(json!({"uuid": "p3", "name": "multi", "endpoints": [
            {"uuid": "two", "path": "/q", "method": "GET", "enable": true,
             "request": {"params": "?b=2&a=1", "body": {}}}
        ]}));
        let (id, kind) = mocked(dispatch(&t, &request(Method::GET, "/multi/q", Some("a=1&b=2"), "")));
        assert_eq!(id, "two");
        assert_eq!(kind, MatchKind::Exact);
    }

    #[test]
    fn query_branch_wins_over_body() {
        let t = default_table();
        // declared query matches, the body is ignored
        let (id, kind) = mocked(dispatch(
            &t,
            &request(Method::GET, "/test/object", Some("param=value"), r#"{"x":1}"#),
        ));
        assert_eq!(id, "get-object-params");
        assert_eq!(kind, MatchKind::Exact);
    }

    #[test]
    fn wrong_query_value_falls_back_to_relaxed() {
        let t = default_table();
        let (id, kind) = mocked(dispatch(
            &t,
            &request(Method::GET, "/test/object", Some("param=other"), ""),
        ));
        assert_eq!(id, "get-object");
        assert_eq!(kind, MatchKind::Relaxed { candidates: 1 });
    }

    #[test]
    fn extra_query_params_report_every_candidate() {
        let t = default_table();
        let (id, kind) = mocked(dispatch(
            &t,
            &request(Method::GET, "/test/object", Some("param=value&extra=1"), ""),
        ));
        assert_eq!(id, "get-object");
        assert_eq!(kind, MatchKind::Relaxed { candidates: 2 });
    }

    #[test]
    fn unknown_project() {
        let t = default_table();
        match dispatch(&t, &request(Method::GET, "/unknown-project/x", None, "")) {
            Dispatch::NotFound(reason) => {
                assert_eq!(reason.message(), "Project \"unknown-project\" not found")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_endpoint_of_known_project() {
        let t = default_table();
        match dispatch(&t, &request(Method::GET, "/test-slug/undeclared", None, "")) {
            Dispatch::NotFound(reason) => assert_eq!(reason, NotFoundReason::UnknownEndpoint),
            other => panic!("unexpected {other:?}"),
        }
        // the name of a slugged project is not a public segment
        assert!(matches!(
            dispatch(&t, &request(Method::GET, "/slug_name_test/undeclared", None, "")),
            Dispatch::NotFound(NotFoundReason::UnknownProject(_))
        ));
    }

    #[test]
    fn miss_with_url_prefix_forwards() {
        let t = table(json!({"uuid": "p4", "name": "remote", "urlPrefix": "http://origin.local",
            "endpoints": [
                {"uuid": "r1", "path": "/known", "method": "GET", "enable": true,
                 "request": {"params": "?id=1", "body": {}}, "response": "ok"}
            ]}));

        match dispatch(&t, &request(Method::GET, "/remote/other", None, "")) {
            Dispatch::Forward { project } => assert_eq!(project.uuid, "p4"),
            other => panic!("unexpected {other:?}"),
        }
        // relaxed match is preferred over forwarding
        let (id, kind) = mocked(dispatch(&t, &request(Method::GET, "/remote/known", Some("id=1&x=2"), "")));
        assert_eq!(id, "r1");
        assert_eq!(kind, MatchKind::Relaxed { candidates: 1 });
        // different value for a declared key: no relaxed candidate, forwarded
        assert!(matches!(
            dispatch(&t, &request(Method::GET, "/remote/known", Some("id=2"), "")),
            Dispatch::Forward { .. }
        ));
    }

    #[test]
    fn relaxed_hit_carries_the_endpoint_response() {
        let t = default_table();
        match dispatch(&t, &request(Method::GET, "/test/object", Some("nope=1"), "")) {
            Dispatch::Mock { response, .. } => assert_eq!(
                response.body,
                ResponseBody::Json(json!({"hey": "I am working"}))
            ),
            other => panic!("unexpected {other:?}"),
        }
    }
}
