//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path, query, body)
//!     → dispatcher.rs
//!         → table.rs (route lookup, exact or wildcard)
//!         → matcher.rs (query / body disambiguation)
//!         → signature.rs (exact response key)
//!     → on miss: project lookup, relaxed candidates
//!     → Return: Mock, Forward or NotFound
//!
//! Table Compilation (at startup and on every reload):
//!     ConfigGeneration
//!     → Register enabled endpoints in declaration order
//!     → Freeze as immutable RoutingTable
//!     → Publish through SharedRoutingTable
//! ```
//!
//! # Design Decisions
//! - Tables are immutable; a reload builds a new one and swaps it in
//! - A request keeps the snapshot it started with until it completes
//! - Deterministic: same table and request always give the same outcome

pub mod dispatcher;
pub mod matcher;
pub mod signature;
pub mod table;

pub use dispatcher::{dispatch, Dispatch, MatchKind, NotFoundReason, RequestShape};
pub use matcher::QueryMap;
pub use table::{MockResponse, ProjectRoute, RoutingTable, SharedRoutingTable};
