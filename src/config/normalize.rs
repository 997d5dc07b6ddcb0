//! Flattening of a configuration document into id-keyed maps.
//!
//! # Responsibilities
//! - Key projects and endpoints by uuid
//! - Inject the owning project's uuid into each endpoint
//! - Keep the project declaration order for deterministic registration
//!
//! # Design Decisions
//! - Pure transform: no I/O, never fails
//! - Entities without a uuid get a generated one
//! - Empty `slug` / `urlPrefix` strings count as absent

use std::collections::HashMap;
use std::time::Duration;

use uuid::Uuid;

use crate::config::schema::{
    ConfigDocument, EndpointConfig, HttpMethod, ProjectConfig, RequestConfig, ResponseBody,
    ServerSettings,
};

/// A project with its endpoints replaced by endpoint ids.
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub uuid: String,
    pub name: String,
    pub slug: Option<String>,
    pub url_prefix: Option<String>,
    /// Endpoint ids in declaration order.
    pub endpoint_ids: Vec<String>,
}

impl Project {
    /// The path segment this project is served under.
    pub fn segment(&self) -> &str {
        self.slug.as_deref().unwrap_or(&self.name)
    }
}

/// An endpoint with the id of the project that declared it.
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    pub uuid: String,
    pub project_id: String,
    pub path: String,
    pub method: HttpMethod,
    pub request: RequestConfig,
    pub response: ResponseBody,
    pub status_code: u16,
    pub timeout_ms: u64,
    pub enable: bool,
}

impl Endpoint {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// One normalized snapshot of the whole configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigGeneration {
    pub projects: HashMap<String, Project>,
    pub endpoints: HashMap<String, Endpoint>,
    /// Project uuids in declaration order.
    pub project_order: Vec<String>,
    pub settings: ServerSettings,
}

impl ConfigGeneration {
    /// Normalize a document. Imports must already be merged into `document.projects`.
    pub fn normalize(document: ConfigDocument) -> Self {
        let mut generation = ConfigGeneration {
            settings: document.result,
            ..Default::default()
        };

        for project in document.projects {
            generation.add_project(project);
        }

        generation
    }

    fn add_project(&mut self, config: ProjectConfig) {
        let uuid = non_empty(config.uuid).unwrap_or_else(generate_id);
        let mut endpoint_ids = Vec::with_capacity(config.endpoints.len());

        for endpoint in config.endpoints {
            let endpoint = normalize_endpoint(endpoint, &uuid);
            endpoint_ids.push(endpoint.uuid.clone());
            self.endpoints.insert(endpoint.uuid.clone(), endpoint);
        }

        let project = Project {
            uuid: uuid.clone(),
            name: config.name,
            slug: config.slug.and_then(non_empty),
            url_prefix: config.url_prefix.and_then(non_empty),
            endpoint_ids,
        };

        if self.projects.insert(uuid.clone(), project).is_some() {
            tracing::warn!(project = %uuid, "Duplicate project uuid, later declaration replaces the earlier one");
        } else {
            self.project_order.push(uuid);
        }
    }

    /// Projects in declaration order.
    pub fn ordered_projects(&self) -> impl Iterator<Item = &Project> {
        self.project_order
            .iter()
            .filter_map(|id| self.projects.get(id))
    }

    /// Endpoints owned by `project`, in declaration order.
    ///
    /// An id whose endpoint was redeclared by another project is skipped here.
    pub fn project_endpoints<'a>(
        &'a self,
        project: &'a Project,
    ) -> impl Iterator<Item = &'a Endpoint> + 'a {
        project
            .endpoint_ids
            .iter()
            .filter_map(|id| self.endpoints.get(id))
            .filter(move |endpoint| endpoint.project_id == project.uuid)
    }
}

fn normalize_endpoint(config: EndpointConfig, project_id: &str) -> Endpoint {
    Endpoint {
        uuid: non_empty(config.uuid).unwrap_or_else(generate_id),
        project_id: project_id.to_string(),
        path: config.path,
        method: config.method,
        request: config.request,
        response: config.response,
        status_code: config.status_code,
        timeout_ms: config.timeout,
        enable: config.enable,
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn generate_id() -> String {
    Uuid::new_v4().to_string()
}
