//! The mock server as one controllable unit.
//!
//! `App` ties the reload controller, the HTTP server and the event bus
//! together. The binary drives it from signals and control commands; the
//! integration tests drive it directly.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use notify::PollWatcher;
use tokio::task::JoinHandle;

use crate::config::watcher::ConfigWatcher;
use crate::config::{ConfigDocument, ConfigError, ServerOptions};
use crate::http::{AppState, ServerHandle};
use crate::lifecycle::startup::start_server;
use crate::lifecycle::{FatalError, ReloadController};
use crate::net::InFlightTracker;
use crate::observability::{EventBus, LogEvent};
use crate::proxy::Forwarder;
use crate::routing::SharedRoutingTable;

pub struct App {
    options: ServerOptions,
    reload: ReloadController,
    events: EventBus,
    forwarder: Arc<Forwarder>,
    in_flight: InFlightTracker,
    /// Port to bind on start: the CLI override, else `result.httpPort`.
    port: u16,
    server: Option<ServerHandle>,
}

impl App {
    /// Load the configuration and publish the first routing table. Does not listen yet.
    pub async fn bootstrap(options: ServerOptions) -> Result<Self, FatalError> {
        let reload = ReloadController::new(
            &options.config_path,
            SharedRoutingTable::default(),
            options.port.is_some(),
        );
        let config = reload.reload().await?;
        let port = options.port.unwrap_or(config.settings.http_port);

        Ok(Self {
            reload,
            events: EventBus::new(),
            forwarder: Arc::new(Forwarder::new()?),
            in_flight: InFlightTracker::new(),
            port,
            server: None,
            options,
        })
    }

    /// Bind the listener and start serving. A running server is left alone.
    pub async fn start(&mut self) -> Result<SocketAddr, FatalError> {
        if let Some(server) = &self.server {
            tracing::info!(address = %server.local_addr(), "Server already running");
            return Ok(server.local_addr());
        }

        let state = AppState {
            routes: self.reload.routes().clone(),
            forwarder: Arc::clone(&self.forwarder),
            events: self.events.clone(),
            in_flight: self.in_flight.clone(),
            max_body_size: self.options.max_body_size,
        };
        let server = start_server(&self.options.bind_host, self.port, state).await?;
        let addr = server.local_addr();

        self.reload.set_bound_port(addr.port());
        self.server = Some(server);
        self.events.emit(LogEvent::server("START"));
        Ok(addr)
    }

    /// Stop accepting and wait until every open request has been answered.
    pub async fn stop(&mut self) -> Result<(), FatalError> {
        let Some(server) = self.server.take() else {
            tracing::info!("Server already stopped");
            return Ok(());
        };
        server.stop().await?;
        self.stopped();
        Ok(())
    }

    /// Stop, polling the in-flight count every 500 ms for at most `deadline`.
    ///
    /// Returns whether every request finished before the deadline.
    pub async fn stop_sync(&mut self, deadline: Duration) -> Result<bool, FatalError> {
        let Some(server) = self.server.take() else {
            return Ok(true);
        };
        let drained = server.stop_within(deadline).await?;
        self.stopped();
        Ok(drained)
    }

    fn stopped(&self) {
        self.reload.set_bound_port(0);
        self.events.emit(LogEvent::server("STOP"));
    }

    /// Replace the routing table with one built from `document`.
    pub fn switch_config(&self, document: ConfigDocument) -> u64 {
        self.reload.switch_config(document)
    }

    /// Re-read the config file now.
    pub async fn reload(&self) -> Result<u64, ConfigError> {
        self.reload.reload().await?;
        Ok(self.reload.generation())
    }

    /// Start watching the config file. Keep the watcher alive for as long as
    /// reloads are wanted; the task ends with the first failed reload.
    pub fn watch(&self) -> Result<(PollWatcher, JoinHandle<Result<(), ConfigError>>), FatalError> {
        let (watcher, changes) =
            ConfigWatcher::new(&self.options.config_path, self.options.poll_interval);
        let guard = watcher.run()?;
        let task = tokio::spawn(self.reload.clone().run(changes));
        Ok((guard, task))
    }

    pub fn is_listening(&self) -> bool {
        self.server.is_some()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.as_ref().map(ServerHandle::local_addr)
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn generation(&self) -> u64 {
        self.reload.generation()
    }

    pub fn options(&self) -> &ServerOptions {
        &self.options
    }
}
