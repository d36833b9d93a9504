//! Plain HTTP request relaying.
//!
//! One request per client connection: the initial read is rewritten
//! (body transformed), sent to the destination in a single write, and the
//! response stream is relayed back with each chunk's body transformed. The
//! client socket is not read again.

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use crate::codec::transform;
use crate::http::error::{ProxyError, ProxyResult, Stage};
use crate::http::forward::{pump, ChunkMode, Direction};
use crate::http::request::{resolve_target, Target};
use crate::http::server::ForwardingContext;

/// How a relayed exchange ended.
#[derive(Debug)]
pub struct RelaySummary {
    pub target: Target,
    /// Bytes sent to the destination (head plus transformed body).
    pub request_bytes: usize,
    /// Response bytes relayed to the client.
    pub response_bytes: u64,
}

/// Build the request sent upstream: head untouched, body transformed.
pub fn rewrite_request(head: &[u8], body: &[u8], ctx: &ForwardingContext) -> Vec<u8> {
    let mut outgoing = Vec::with_capacity(head.len() + body.len());
    outgoing.extend_from_slice(head);
    if !body.is_empty() {
        outgoing.extend_from_slice(&transform(body, &ctx.key));
    }
    outgoing
}

/// Relay one request for `client`.
///
/// `head` and `body` are the two halves of the client's initial read and
/// `url` is the target token of its request line.
pub async fn run(
    client: TcpStream,
    head: &[u8],
    body: &[u8],
    url: &[u8],
    ctx: &ForwardingContext,
) -> ProxyResult<RelaySummary> {
    let target = resolve_target(url)?;
    let outgoing = rewrite_request(head, body, ctx);

    tracing::debug!(target_addr = %target, "Connecting to destination");
    let mut upstream = TcpStream::connect((target.host.as_str(), target.port))
        .await
        .map_err(|source| ProxyError::ConnectFailure {
            target: target.clone(),
            source,
        })?;

    upstream
        .write_all(&outgoing)
        .await
        .map_err(|e| ProxyError::transfer(&target, Stage::SendRequest, e))?;

    let response = tokio::spawn(pump(
        upstream,
        client,
        ChunkMode::TransformBody(ctx.key.clone()),
        ctx.buffer_size,
        Direction::Downstream,
    ));

    let response_bytes = match response.await {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(e)) => return Err(ProxyError::transfer(&target, Stage::Forward, e)),
        Err(e) => return Err(ProxyError::transfer(&target, Stage::Forward, std::io::Error::other(e))),
    };

    Ok(RelaySummary {
        target,
        request_bytes: outgoing.len(),
        response_bytes,
    })
}
