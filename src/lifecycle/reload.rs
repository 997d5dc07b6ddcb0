//! Hot reload of the routing table.
//!
//! # Responsibilities
//! - Load, normalize, validate and build a table for every config change
//! - Publish the new table with a single atomic swap
//! - Apply in-memory documents (`switch_config`) the same way
//!
//! # Design Decisions
//! - The table is built before the swap; requests never see a half-built one
//! - The listener is never rebound; a changed `httpPort` only warns
//! - A failed reload is returned to the caller, which treats it as fatal

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU16, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::validation::validate_generation;
use crate::config::{load_document, ConfigDocument, ConfigError, ConfigGeneration};
use crate::observability::metrics;
use crate::routing::{RoutingTable, SharedRoutingTable};

/// Owns the published routing table and replaces it on change.
#[derive(Debug, Clone)]
pub struct ReloadController {
    config_path: PathBuf,
    routes: SharedRoutingTable,
    generation: Arc<AtomicU64>,
    /// Port the listener is bound to, 0 while not listening.
    bound_port: Arc<AtomicU16>,
    /// When the port comes from the command line, config port changes are irrelevant.
    port_overridden: bool,
}

impl ReloadController {
    pub fn new(config_path: &Path, routes: SharedRoutingTable, port_overridden: bool) -> Self {
        Self {
            config_path: config_path.to_path_buf(),
            routes,
            generation: Arc::new(AtomicU64::new(0)),
            bound_port: Arc::new(AtomicU16::new(0)),
            port_overridden,
        }
    }

    pub fn routes(&self) -> &SharedRoutingTable {
        &self.routes
    }

    /// Number of tables published so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn set_bound_port(&self, port: u16) {
        self.bound_port.store(port, Ordering::SeqCst);
    }

    /// Read the config file and publish a table for it.
    ///
    /// Returns the normalized generation so the caller can read its settings.
    pub async fn reload(&self) -> Result<ConfigGeneration, ConfigError> {
        let document = match load_document(&self.config_path).await {
            Ok(document) => document,
            Err(e) => {
                metrics::record_reload(false);
                tracing::error!(error = %e, path = %self.config_path.display(), "Config reload failed");
                return Err(e);
            }
        };

        let config = ConfigGeneration::normalize(document);
        self.check_port(&config);
        self.publish(&config);
        metrics::record_reload(true);
        Ok(config)
    }

    /// Publish a table for an in-memory document. Imports are not resolved.
    pub fn switch_config(&self, document: ConfigDocument) -> u64 {
        let config = ConfigGeneration::normalize(document);
        self.check_port(&config);
        self.publish(&config)
    }

    /// Build a table for `config` and swap it in. Returns its generation number.
    pub fn publish(&self, config: &ConfigGeneration) -> u64 {
        for warning in validate_generation(config) {
            tracing::warn!(%warning, "Config validation warning");
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let table = RoutingTable::build(config).with_generation(generation);
        let signatures = table.len();
        self.routes.publish(table);

        tracing::info!(generation, signatures, "Routing table published");
        generation
    }

    fn check_port(&self, config: &ConfigGeneration) {
        let bound = self.bound_port.load(Ordering::SeqCst);
        if self.port_overridden || bound == 0 {
            return;
        }
        if config.settings.http_port != bound {
            tracing::warn!(
                bound_port = bound,
                config_port = config.settings.http_port,
                "httpPort changed; keeping the bound socket until restart"
            );
        }
    }

    /// Reload on every change notification until the channel closes or a reload fails.
    pub async fn run(self, mut changes: mpsc::UnboundedReceiver<()>) -> Result<(), ConfigError> {
        while changes.recv().await.is_some() {
            // one reload covers every notification already queued
            while changes.try_recv().is_ok() {}
            self.reload().await?;
        }
        tracing::debug!("Config change channel closed");
        Ok(())
    }
}
