//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Startup
//!     → listener.rs (bind once, port-in-use detection)
//!     → Hand the listener to the HTTP layer
//!
//! Per request:
//!     → in_flight.rs (guard held until the response is produced)
//! ```
//!
//! # Design Decisions
//! - The socket is bound once per start; config reloads never rebind it
//! - Shutdown drains by polling the in-flight count

pub mod in_flight;
pub mod listener;

pub use in_flight::{InFlightGuard, InFlightTracker};
pub use listener::{bind, ListenerError};
