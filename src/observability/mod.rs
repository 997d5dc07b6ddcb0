//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatch outcomes and lifecycle changes produce:
//!     → events.rs (LogEvent on the EventBus, mirrored to tracing)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (tracing fmt layer, see logging.rs)
//!     → control channel log socket (NDJSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```

pub mod events;
pub mod logging;
pub mod metrics;

pub use events::{EventBus, EventKind, LogEvent};
pub use logging::LogFormat;
