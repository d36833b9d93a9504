//! CONNECT tunnel handling.
//!
//! # States
//! ```text
//! Connecting → Established → Relaying → Closed
//! ```
//!
//! After the acknowledgement the proxy never originates another byte. The
//! client → destination direction is copied raw; the destination → client
//! direction has the body portion of every chunk transformed.

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

use crate::http::error::{ProxyError, ProxyResult, Stage};
use crate::http::forward::{pump, ChunkMode, Direction};
use crate::http::request::{resolve_connect_target, Target};
use crate::http::server::ForwardingContext;

/// Acknowledgement written to the client once the destination is reachable.
pub const CONNECTION_ESTABLISHED: &[u8] = b"HTTP/1.1 200 Connection established\r\n\r\n";

/// Tunnel lifecycle state, used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TunnelState {
    Connecting,
    Established,
    Relaying,
    Closed,
}

/// How a tunnel ended.
#[derive(Debug)]
pub struct TunnelSummary {
    pub target: Target,
    /// The direction whose source ended first.
    pub closed_by: Direction,
    /// Bytes that direction forwarded.
    pub bytes: u64,
}

/// Run a CONNECT tunnel for `client` to the authority in `url`.
///
/// Returns once both directions have stopped and every socket is closed.
pub async fn run(
    mut client: TcpStream,
    url: &[u8],
    ctx: &ForwardingContext,
) -> ProxyResult<TunnelSummary> {
    let target = resolve_connect_target(url)?;
    log_state(&target, TunnelState::Connecting);

    let upstream = TcpStream::connect((target.host.as_str(), target.port))
        .await
        .map_err(|source| ProxyError::ConnectFailure {
            target: target.clone(),
            source,
        })?;

    client
        .write_all(CONNECTION_ESTABLISHED)
        .await
        .map_err(|e| ProxyError::transfer(&target, Stage::Acknowledge, e))?;
    log_state(&target, TunnelState::Established);

    let (client_read, client_write) = client.into_split();
    let (upstream_read, upstream_write) = upstream.into_split();

    let mut to_upstream = tokio::spawn(pump(
        client_read,
        upstream_write,
        ChunkMode::Passthrough,
        ctx.buffer_size,
        Direction::Upstream,
    ));
    let mut to_client = tokio::spawn(pump(
        upstream_read,
        client_write,
        ChunkMode::TransformBody(ctx.key.clone()),
        ctx.buffer_size,
        Direction::Downstream,
    ));
    log_state(&target, TunnelState::Relaying);

    // Whichever side finishes first tears the other down, so both sockets
    // are fully closed even if the remaining peer never sends EOF.
    let (closed_by, finished) = tokio::select! {
        res = &mut to_upstream => (Direction::Upstream, res),
        res = &mut to_client => (Direction::Downstream, res),
    };
    let survivor = match closed_by {
        Direction::Upstream => to_client,
        Direction::Downstream => to_upstream,
    };
    abort_and_join(survivor).await;
    log_state(&target, TunnelState::Closed);

    let bytes = match finished {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(e)) => return Err(ProxyError::transfer(&target, Stage::Forward, e)),
        Err(e) => return Err(ProxyError::transfer(&target, Stage::Forward, std::io::Error::other(e))),
    };

    Ok(TunnelSummary {
        target,
        closed_by,
        bytes,
    })
}

async fn abort_and_join<T>(handle: JoinHandle<T>) {
    handle.abort();
    let _ = handle.await;
}

fn log_state(target: &Target, state: TunnelState) {
    tracing::debug!(target_addr = %target, state = ?state, "Tunnel state");
}
