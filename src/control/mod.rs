//! Control channel over Unix domain sockets.
//!
//! # Data Flow
//! ```text
//! <dir>/commands.sock  ← one byte per command (STOP=0, START=1, raw or ASCII)
//!     → ControlCommand → mpsc → App
//!
//! EventBus → <dir>/logs.sock → every connected client, one JSON event per line
//! ```
//!
//! # Design Decisions
//! - Opt-in: nothing is bound unless a directory is given
//! - Stale socket files from a previous run are removed before binding
//! - A log client that cannot keep up skips events instead of slowing requests

use std::io;
use std::path::{Path, PathBuf};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::observability::{EventBus, LogEvent};

pub const DEFAULT_CONTROL_DIR: &str = "/tmp/apimocker_server";
pub const COMMANDS_SOCKET: &str = "commands.sock";
pub const LOGS_SOCKET: &str = "logs.sock";

/// A command received on the command socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Stop,
    Start,
}

impl ControlCommand {
    /// Decode one command byte. Both `0x00` and `b'0'` mean STOP.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 | b'0' => Some(ControlCommand::Stop),
            1 | b'1' => Some(ControlCommand::Start),
            _ => None,
        }
    }
}

/// The bound control sockets. Dropping it stops both accept loops.
#[derive(Debug)]
pub struct ControlChannel {
    dir: PathBuf,
    tasks: Vec<JoinHandle<()>>,
}

impl ControlChannel {
    pub async fn bind(
        dir: &Path,
        events: EventBus,
        commands: mpsc::UnboundedSender<ControlCommand>,
    ) -> io::Result<Self> {
        tokio::fs::create_dir_all(dir).await?;
        let commands_path = dir.join(COMMANDS_SOCKET);
        let logs_path = dir.join(LOGS_SOCKET);
        remove_stale(&commands_path).await?;
        remove_stale(&logs_path).await?;

        let commands_listener = UnixListener::bind(&commands_path)?;
        let logs_listener = UnixListener::bind(&logs_path)?;
        tracing::info!(dir = %dir.display(), "Control channel listening");

        let tasks = vec![
            tokio::spawn(accept_commands(commands_listener, commands)),
            tokio::spawn(accept_log_clients(logs_listener, events)),
        ];
        Ok(Self {
            dir: dir.to_path_buf(),
            tasks,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Drop for ControlChannel {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
        for name in [COMMANDS_SOCKET, LOGS_SOCKET] {
            let _ = std::fs::remove_file(self.dir.join(name));
        }
    }
}

async fn remove_stale(path: &Path) -> io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

async fn accept_commands(listener: UnixListener, commands: mpsc::UnboundedSender<ControlCommand>) {
    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                tokio::spawn(read_commands(stream, commands.clone()));
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to accept control connection");
                return;
            }
        }
    }
}

async fn read_commands(mut stream: UnixStream, commands: mpsc::UnboundedSender<ControlCommand>) {
    let mut buf = [0u8; 64];
    loop {
        let n = match stream.read(&mut buf).await {
            Ok(0) => return,
            Ok(n) => n,
            Err(e) => {
                tracing::debug!(error = %e, "Control connection read failed");
                return;
            }
        };

        for &byte in &buf[..n] {
            if byte.is_ascii_whitespace() {
                continue;
            }
            match ControlCommand::from_byte(byte) {
                Some(command) => {
                    tracing::debug!(?command, "Control command received");
                    if commands.send(command).is_err() {
                        return;
                    }
                }
                None => tracing::warn!(byte, "Unknown control command"),
            }
        }
    }
}

async fn accept_log_clients(listener: UnixListener, events: EventBus) {
    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                tokio::spawn(stream_events(stream, events.subscribe()));
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to accept log connection");
                return;
            }
        }
    }
}

async fn stream_events(mut stream: UnixStream, mut events: broadcast::Receiver<LogEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => {
                let mut line = event.to_json_line();
                line.push('\n');
                if stream.write_all(line.as_bytes()).await.is_err() {
                    return;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Log client lagging, events dropped");
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}
