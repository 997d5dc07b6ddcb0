//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → request.rs (buffer body, build RequestShape)
//!     → routing::dispatch (mock / forward / 404)
//!     → response.rs (render mock or error body) or proxy::Forwarder
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::CapturedRequest;
pub use server::{build_router, AppState, HttpServer, ServerHandle};
