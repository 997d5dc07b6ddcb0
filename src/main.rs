//! apimocker binary.
//!
//! Loads the configuration, serves mocks, reloads on file changes and exits
//! with a code describing the failure when something unrecoverable happens.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tokio::sync::mpsc;

use apimocker::config::ServerOptions;
use apimocker::lifecycle::signals::shutdown_signal;
use apimocker::observability::logging::{self, LogFormat};
use apimocker::observability::metrics::init_metrics;
use apimocker::{App, FatalError};

#[cfg(unix)]
use apimocker::control::{ControlChannel, ControlCommand, DEFAULT_CONTROL_DIR};

#[derive(Debug, Parser)]
#[command(name = "apimocker", version, about = "HTTP mock server with forwarding and hot reload")]
struct Cli {
    /// Path of the JSON configuration document
    #[arg(short, long, default_value = "./apimocker.json")]
    config: PathBuf,

    /// Port to listen on; overrides result.httpPort
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// How often to check the config file for changes
    #[arg(long, default_value_t = 1000)]
    poll_interval_ms: u64,

    /// Enable the control sockets in this directory
    #[cfg(unix)]
    #[arg(long, num_args = 0..=1, default_missing_value = DEFAULT_CONTROL_DIR)]
    control_dir: Option<PathBuf>,

    /// Serve Prometheus metrics on this address
    #[arg(long)]
    metrics_address: Option<SocketAddr>,

    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

impl Cli {
    fn options(&self) -> ServerOptions {
        ServerOptions {
            config_path: self.config.clone(),
            bind_host: self.host.clone(),
            port: self.port,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            #[cfg(unix)]
            control_dir: self.control_dir.clone(),
            metrics_address: self.metrics_address,
            ..ServerOptions::default()
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.log_format);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "apimocker starting");

    match run(cli.options()).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, code = e.exit_code(), "Fatal error");
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(options: ServerOptions) -> Result<(), FatalError> {
    if let Some(addr) = options.metrics_address {
        init_metrics(addr);
    }

    let mut app = App::bootstrap(options).await?;
    app.start().await?;
    let (_watcher, mut reload_task) = app.watch()?;

    #[cfg(unix)]
    let (_control, mut commands) = {
        let (tx, rx) = mpsc::unbounded_channel::<ControlCommand>();
        let channel = match &app.options().control_dir {
            Some(dir) => Some(
                ControlChannel::bind(dir, app.events().clone(), tx)
                    .await
                    .map_err(FatalError::Control)?,
            ),
            None => None,
        };
        (channel, rx)
    };
    #[cfg(not(unix))]
    let mut commands = mpsc::unbounded_channel::<()>().1;

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let result = loop {
        tokio::select! {
            _ = &mut shutdown => break Ok(()),
            finished = &mut reload_task => {
                break match finished {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(e)) => Err(FatalError::from(e)),
                    Err(e) => Err(FatalError::Server(std::io::Error::other(e))),
                };
            }
            Some(command) = commands.recv() => {
                #[cfg(unix)]
                match command {
                    ControlCommand::Stop => app.stop().await?,
                    ControlCommand::Start => {
                        app.start().await?;
                    }
                }
                #[cfg(not(unix))]
                let () = command;
            }
        }
    };

    app.stop().await?;
    result
}
