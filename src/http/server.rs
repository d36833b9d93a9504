//! Proxy server: accept loop and per-connection dispatch.
//!
//! # Responsibilities
//! - Accept connections from the listener until shutdown
//! - Spawn one task per connection, tracked for graceful shutdown
//! - Read the initial request, split it, parse the request line
//! - Dispatch CONNECT to the tunnel handler, everything else to the relay
//! - Log and count every per-connection failure; none stops the listener

use std::net::SocketAddr;

use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tracing::Instrument;

use crate::codec::{KeyError, TransformKey};
use crate::config::ProxyConfig;
use crate::http::error::{ProxyError, ProxyResult, Stage};
use crate::http::relay::{self, RelaySummary};
use crate::http::request::parse_request_line;
use crate::http::tunnel::{self, TunnelSummary};
use crate::http::frame;
use crate::net::connection::{ConnectionGuard, ConnectionTracker};
use crate::net::listener::Listener;
use crate::observability::metrics;

/// Immutable settings every connection task needs. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ForwardingContext {
    pub key: TransformKey,
    pub buffer_size: usize,
}

impl ForwardingContext {
    pub fn from_config(config: &ProxyConfig) -> Result<Self, KeyError> {
        Ok(Self {
            key: TransformKey::new(config.transform.key.as_bytes())?,
            buffer_size: config.forwarding.buffer_size,
        })
    }
}

/// What a connection turned out to be.
#[derive(Debug)]
pub enum Exchange {
    /// Client closed before sending anything.
    Empty,
    Tunnel(TunnelSummary),
    Relay(RelaySummary),
}

/// The forward proxy server.
pub struct ProxyServer {
    context: ForwardingContext,
    tracker: ConnectionTracker,
}

impl ProxyServer {
    pub fn new(context: ForwardingContext) -> Self {
        Self {
            context,
            tracker: ConnectionTracker::new(),
        }
    }

    /// Tracker counting this server's live connections.
    pub fn tracker(&self) -> ConnectionTracker {
        self.tracker.clone()
    }

    /// Accept connections until a shutdown signal arrives.
    ///
    /// Accept errors are logged and the loop keeps going. In-flight
    /// connections are not cancelled when this returns.
    pub async fn run(self, listener: Listener, mut shutdown: broadcast::Receiver<()>) {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!(address = %addr, "Proxy server accepting connections");
        }

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => self.spawn_connection(stream, peer),
                    Err(e) => {
                        tracing::error!(error = %e, "Error on accepting connection");
                        metrics::record_accept_error();
                    }
                },
                _ = shutdown.recv() => {
                    tracing::info!("Shutdown signal received, no longer accepting connections");
                    break;
                }
            }
        }
    }

    fn spawn_connection(&self, stream: TcpStream, peer: SocketAddr) {
        let guard = self.tracker.track();
        let ctx = self.context.clone();
        let span = tracing::info_span!("connection", id = %guard.id(), peer = %peer);

        metrics::record_connection_accepted();
        tokio::spawn(serve_connection(stream, ctx, guard).instrument(span));
    }
}

async fn serve_connection(stream: TcpStream, ctx: ForwardingContext, _guard: ConnectionGuard) {
    match handle_client(stream, &ctx).await {
        Ok(Exchange::Empty) => {
            tracing::debug!("Client closed without sending a request");
        }
        Ok(Exchange::Tunnel(summary)) => {
            metrics::record_exchange("connect");
            tracing::info!(
                target_addr = %summary.target,
                closed_by = %summary.closed_by,
                bytes = summary.bytes,
                "Tunnel closed"
            );
        }
        Ok(Exchange::Relay(summary)) => {
            metrics::record_exchange("relay");
            tracing::info!(
                target_addr = %summary.target,
                request_bytes = summary.request_bytes,
                response_bytes = summary.response_bytes,
                "Request relayed"
            );
        }
        Err(e) => {
            metrics::record_error(e.kind());
            match &e {
                ProxyError::MalformedRequest(_) => tracing::warn!(error = %e, "Rejected request"),
                _ => tracing::error!(error = %e, "Connection failed"),
            }
        }
    }
}

/// Handle one client connection from first read to close.
///
/// Every socket involved is owned by this call (or the tasks it awaits) and
/// is closed by the time it returns, on success and on every error.
pub async fn handle_client(mut client: TcpStream, ctx: &ForwardingContext) -> ProxyResult<Exchange> {
    let mut buf = vec![0u8; ctx.buffer_size];
    let n = client
        .read(&mut buf)
        .await
        .map_err(|e| ProxyError::io(Stage::ReadRequest, e))?;
    if n == 0 {
        return Ok(Exchange::Empty);
    }
    let data = &buf[..n];

    let (head, body) = frame::split(data);
    let line = parse_request_line(head)?;
    tracing::debug!(
        method = %String::from_utf8_lossy(line.method),
        url = %String::from_utf8_lossy(line.target),
        "Request received"
    );

    if line.is_connect() {
        tunnel::run(client, line.target, ctx).await.map(Exchange::Tunnel)
    } else {
        relay::run(client, head, body, line.target, ctx)
            .await
            .map(Exchange::Relay)
    }
}
