//! TCP listener implementation.
//!
//! # Responsibilities
//! - Resolve and bind the configured host and port
//! - Apply the configured listen backlog
//! - Accept incoming TCP connections
//!
//! # Design Decisions
//! - `SO_REUSEADDR` is set so a restarted proxy can rebind immediately
//! - The backlog is the only bound on pending clients; accepted connections
//!   are not limited

use std::net::SocketAddr;

use tokio::net::{lookup_host, TcpListener, TcpSocket, TcpStream};

use crate::config::ListenerConfig;

/// Error type for listener operations.
#[derive(Debug)]
pub enum ListenerError {
    /// Configured host did not resolve to an address.
    Resolve(std::io::Error),
    /// Failed to bind to address.
    Bind(std::io::Error),
    /// Failed to accept connection.
    Accept(std::io::Error),
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerError::Resolve(e) => write!(f, "Failed to resolve listen address: {}", e),
            ListenerError::Bind(e) => write!(f, "Failed to bind: {}", e),
            ListenerError::Accept(e) => write!(f, "Failed to accept: {}", e),
        }
    }
}

impl std::error::Error for ListenerError {}

/// A TCP listener bound with an explicit backlog.
#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
}

impl Listener {
    /// Bind to the configured host and port.
    pub async fn bind(config: &ListenerConfig) -> Result<Self, ListenerError> {
        let addr = lookup_host((config.host.as_str(), config.port))
            .await
            .map_err(ListenerError::Resolve)?
            .next()
            .ok_or_else(|| {
                ListenerError::Resolve(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("no address found for {}", config.host),
                ))
            })?;

        let inner = bind_with_backlog(addr, config.max_pending_connections)
            .map_err(ListenerError::Bind)?;
        let local_addr = inner.local_addr().map_err(ListenerError::Bind)?;

        tracing::info!(
            address = %local_addr,
            backlog = config.max_pending_connections,
            "Listener bound"
        );

        Ok(Self { inner })
    }

    /// Accept a new connection.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr), ListenerError> {
        let (stream, addr) = self.inner.accept().await.map_err(ListenerError::Accept)?;

        tracing::debug!(peer_addr = %addr, "Connection accepted");

        Ok((stream, addr))
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.inner.local_addr()
    }
}

fn bind_with_backlog(addr: SocketAddr, backlog: u32) -> std::io::Result<TcpListener> {
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    socket.listen(backlog)
}
