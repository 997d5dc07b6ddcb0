//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic checks serde cannot express (status ranges, origin URLs, paths)
//! - Detect projects that collide on their public segment
//!
//! # Design Decisions
//! - Returns all findings, not just the first
//! - Findings are warnings: an authoring mistake never stops the server,
//!   the routing table builder decides deterministically what wins
//! - Pure function: ConfigGeneration → Vec<ValidationWarning>

use std::collections::HashSet;
use std::fmt;

use url::Url;

use crate::config::normalize::ConfigGeneration;

/// A suspicious but servable piece of configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationWarning {
    /// Two projects share a public segment; only the first is served.
    DuplicateSegment { segment: String, project: String },
    /// `urlPrefix` is not an absolute http(s) URL.
    InvalidUrlPrefix { project: String, url_prefix: String },
    /// Status code outside 100..=599; 200 is served instead.
    InvalidStatusCode { endpoint: String, status_code: u16 },
    /// Endpoint path does not start with `/`.
    RelativePath { endpoint: String, path: String },
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationWarning::DuplicateSegment { segment, project } => write!(
                f,
                "project {project} reuses segment \"{segment}\" and will not be served"
            ),
            ValidationWarning::InvalidUrlPrefix {
                project,
                url_prefix,
            } => write!(f, "project {project} has invalid urlPrefix \"{url_prefix}\""),
            ValidationWarning::InvalidStatusCode {
                endpoint,
                status_code,
            } => write!(f, "endpoint {endpoint} has invalid statusCode {status_code}"),
            ValidationWarning::RelativePath { endpoint, path } => {
                write!(f, "endpoint {endpoint} path \"{path}\" does not start with '/'")
            }
        }
    }
}

/// Validate a normalized generation.
pub fn validate_generation(generation: &ConfigGeneration) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    let mut segments = HashSet::new();

    for project in generation.ordered_projects() {
        if !segments.insert(project.segment()) {
            warnings.push(ValidationWarning::DuplicateSegment {
                segment: project.segment().to_string(),
                project: project.uuid.clone(),
            });
        }

        if let Some(prefix) = &project.url_prefix {
            let valid = Url::parse(prefix)
                .map(|url| matches!(url.scheme(), "http" | "https"))
                .unwrap_or(false);
            if !valid {
                warnings.push(ValidationWarning::InvalidUrlPrefix {
                    project: project.uuid.clone(),
                    url_prefix: prefix.clone(),
                });
            }
        }

        for endpoint in generation.project_endpoints(project) {
            if !(100..=599).contains(&endpoint.status_code) {
                warnings.push(ValidationWarning::InvalidStatusCode {
                    endpoint: endpoint.uuid.clone(),
                    status_code: endpoint.status_code,
                });
            }
            if !endpoint.path.is_empty() && !endpoint.path.starts_with('/') {
                warnings.push(ValidationWarning::RelativePath {
                    endpoint: endpoint.uuid.clone(),
                    path: endpoint.path.clone(),
                });
            }
        }
    }

    warnings
}
