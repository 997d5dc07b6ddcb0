//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! apimocker.json (+ importedConfigurations)
//!     → loader.rs (read, parse, merge imports)
//!     → normalize.rs (id-keyed ConfigGeneration)
//!     → validation.rs (warnings only)
//!     → routing::RoutingTable::build
//!
//! On change:
//!     watcher.rs polls mtime
//!     → lifecycle::reload rebuilds the table off to the side
//!     → atomic swap of Arc<RoutingTable>
//! ```
//!
//! # Design Decisions
//! - A generation is immutable once normalized; changes produce a new one
//! - All fields have defaults to allow minimal configs
//! - Serde handles syntax, validation.rs handles semantics
//! - Process options (options.rs) are separate from the watched document

pub mod loader;
pub mod normalize;
pub mod options;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_document, ConfigError};
pub use normalize::{ConfigGeneration, Endpoint, Project};
pub use options::ServerOptions;
pub use schema::{ConfigDocument, EndpointConfig, HttpMethod, ProjectConfig, ResponseBody, ServerSettings};
