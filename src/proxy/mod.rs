//! Forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatch::Forward { project }
//!     → host.rs (target URL, Host header value)
//!     → forwarder.rs (reqwest request, gzip negotiated and decoded)
//!     → streamed upstream response, or ForwardError → 502
//! ```

pub mod forwarder;
pub mod host;

pub use forwarder::{ForwardError, Forwarder};
