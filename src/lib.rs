//! apimocker: a configurable HTTP mock server with forwarding and hot reload.
//!
//! # Architecture Overview
//!
//! ```text
//!   apimocker.json ──▶ config ──▶ lifecycle::reload ──▶ routing::RoutingTable
//!        ▲ (poll)                                             │ (ArcSwap)
//!        │                                                    ▼
//!   Client ──▶ net ──▶ http::server ──▶ routing::dispatch ──▶ mock response
//!                                              │
//!                                              ├──▶ proxy::Forwarder ──▶ origin
//!                                              └──▶ 404
//!
//!   observability (events, logging, metrics) and control (Unix sockets)
//!   run alongside.
//! ```

pub mod app;
pub mod config;
#[cfg(unix)]
pub mod control;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod proxy;
pub mod routing;

pub use app::App;
pub use config::{ConfigDocument, ServerOptions};
pub use lifecycle::{FatalError, Shutdown};
