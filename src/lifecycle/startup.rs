//! Startup orchestration.
//!
//! # Responsibilities
//! - Classify unrecoverable errors and map them to process exit codes
//! - Bind the listener and start the HTTP server task
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The listener binds only after the first routing table is published

use std::io;

use thiserror::Error;

use crate::config::ConfigError;
use crate::http::{AppState, HttpServer, ServerHandle};
use crate::net::{self, ListenerError};
use crate::proxy::ForwardError;

/// Config file (or an import) does not exist.
pub const EXIT_CONFIG_MISSING: u8 = 20;
/// Config file is not valid JSON for the document schema.
pub const EXIT_CONFIG_MALFORMED: u8 = 21;
/// The HTTP port is taken.
pub const EXIT_PORT_IN_USE: u8 = 22;
pub const EXIT_OTHER: u8 = 1;

/// An error that stops the process.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error(transparent)]
    Forwarder(#[from] ForwardError),

    #[error("config watcher failed: {0}")]
    Watch(#[from] notify::Error),

    #[error("control channel failed: {0}")]
    Control(#[source] io::Error),

    #[error("server failed: {0}")]
    Server(#[from] io::Error),
}

impl FatalError {
    pub fn exit_code(&self) -> u8 {
        match self {
            FatalError::Config(ConfigError::Missing { .. }) => EXIT_CONFIG_MISSING,
            FatalError::Config(ConfigError::Parse { .. }) => EXIT_CONFIG_MALFORMED,
            FatalError::Listener(ListenerError::AddressInUse { .. }) => EXIT_PORT_IN_USE,
            _ => EXIT_OTHER,
        }
    }
}

/// Bind `host:port` and serve `state` on a background task.
pub async fn start_server(host: &str, port: u16, state: AppState) -> Result<ServerHandle, FatalError> {
    let listener = net::bind(host, port).await?;
    let handle = HttpServer::new(state).spawn(listener)?;
    Ok(handle)
}
