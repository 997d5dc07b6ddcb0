//! TCP listener binding.
//!
//! # Responsibilities
//! - Resolve the bind address from host and port
//! - Bind once, report "address in use" distinctly (it has its own exit code)

use std::io;
use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::TcpListener;

#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("invalid bind address {address}: {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error("port {port} is already in use")]
    AddressInUse { port: u16 },

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: SocketAddr,
        #[source]
        source: io::Error,
    },
}

/// Bind a TCP listener on `host:port`. Port 0 picks an ephemeral port.
pub async fn bind(host: &str, port: u16) -> Result<TcpListener, ListenerError> {
    let address = format!("{host}:{port}");
    let addr: SocketAddr = address
        .parse()
        .map_err(|source| ListenerError::InvalidAddress { address, source })?;

    let listener = TcpListener::bind(addr).await.map_err(|source| {
        if source.kind() == io::ErrorKind::AddrInUse {
            ListenerError::AddressInUse { port }
        } else {
            ListenerError::Bind {
                address: addr,
                source,
            }
        }
    })?;

    let local_addr = listener
        .local_addr()
        .map_err(|source| ListenerError::Bind { address: addr, source })?;
    tracing::info!(address = %local_addr, "Listener bound");

    Ok(listener)
}
