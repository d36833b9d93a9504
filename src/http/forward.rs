//! Directional byte forwarding.
//!
//! # Data Flow
//! ```text
//! source.read(buffer_size)
//!     → [Body mode] frame::body_offset → xor::apply_in_place(body)
//!     → sink.write_all(head + body)
//!     → repeat until EOF or error
//! ```
//!
//! # Design Decisions
//! - Each read is treated as its own frame; nothing is buffered across reads,
//!   so a body split over two reads is transformed as two fragments
//! - The loop owns both ends; returning drops (closes) them

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::codec::{apply_in_place, TransformKey};
use crate::http::frame;
use crate::observability::metrics;

/// Which way bytes flow relative to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Client to destination.
    Upstream,
    /// Destination to client.
    Downstream,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Upstream => "upstream",
            Direction::Downstream => "downstream",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to do with each chunk before writing it on.
#[derive(Debug, Clone)]
pub enum ChunkMode {
    /// Forward bytes untouched.
    Passthrough,
    /// Transform the body portion of every chunk with the key.
    TransformBody(TransformKey),
}

/// Apply `mode` to one chunk in place.
pub fn prepare_chunk(chunk: &mut [u8], mode: &ChunkMode) {
    if let ChunkMode::TransformBody(key) = mode {
        let body_start = frame::body_offset(chunk).unwrap_or(chunk.len());
        let body = &mut chunk[body_start..];
        if !body.is_empty() {
            apply_in_place(body, key);
            metrics::record_transformed_bytes(body.len());
        }
    }
}

/// Copy `source` into `sink` chunk by chunk until `source` reaches EOF.
///
/// Returns the number of bytes forwarded. On EOF the sink is shut down so
/// the peer sees the end of stream; on error both ends are simply dropped.
pub async fn pump<R, W>(
    mut source: R,
    mut sink: W,
    mode: ChunkMode,
    buffer_size: usize,
    direction: Direction,
) -> io::Result<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; buffer_size];
    let mut total: u64 = 0;

    loop {
        let n = source.read(&mut buf).await?;
        if n == 0 {
            break;
        }

        let chunk = &mut buf[..n];
        prepare_chunk(chunk, &mode);
        sink.write_all(chunk).await?;

        total += n as u64;
        metrics::record_bytes(direction, n);
    }

    let _ = sink.shutdown().await;
    tracing::trace!(direction = %direction, bytes = total, "Source reached end of stream");
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::transform;
    use tokio::io::duplex;

    fn key() -> TransformKey {
        TransformKey::new(b"k3y").unwrap()
    }

    #[test]
    fn passthrough_leaves_chunk_alone() {
        let mut chunk = b"HTTP/1.1 200 OK\r\n\r\nbody".to_vec();
        prepare_chunk(&mut chunk, &ChunkMode::Passthrough);
        assert_eq!(chunk, b"HTTP/1.1 200 OK\r\n\r\nbody");
    }

    #[test]
    fn body_mode_transforms_only_body() {
        let mut chunk = b"HTTP/1.1 200 OK\r\n\r\nbody".to_vec();
        prepare_chunk(&mut chunk, &ChunkMode::TransformBody(key()));

        let (head, body) = frame::split(&chunk);
        assert_eq!(head, b"HTTP/1.1 200 OK\r\n\r\n");
        assert_eq!(body, transform(b"body", &key()).as_slice());
    }

    #[test]
    fn chunk_without_boundary_is_all_head() {
        let mut chunk = b"continuation bytes".to_vec();
        prepare_chunk(&mut chunk, &ChunkMode::TransformBody(key()));
        assert_eq!(chunk, b"continuation bytes");
    }

    #[tokio::test]
    async fn pump_forwards_until_eof() {
        let (mut writer, source) = duplex(64);
        let (sink, mut reader) = duplex(64);

        let task = tokio::spawn(pump(source, sink, ChunkMode::Passthrough, 16, Direction::Upstream));

        writer.write_all(b"raw bytes").await.unwrap();
        drop(writer);

        let mut received = Vec::new();
        reader.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, b"raw bytes");
        assert_eq!(task.await.unwrap().unwrap(), 9);
    }

    #[tokio::test]
    async fn pump_transforms_each_chunk_body() {
        let (mut writer, source) = duplex(256);
        let (sink, mut reader) = duplex(256);

        let task = tokio::spawn(pump(
            source,
            sink,
            ChunkMode::TransformBody(key()),
            256,
            Direction::Downstream,
        ));

        writer.write_all(b"HTTP/1.1 200 OK\r\n\r\npayload").await.unwrap();
        drop(writer);

        let mut received = Vec::new();
        reader.read_to_end(&mut received).await.unwrap();
        task.await.unwrap().unwrap();

        let (head, body) = frame::split(&received);
        assert_eq!(head, b"HTTP/1.1 200 OK\r\n\r\n");
        assert_eq!(transform(body, &key()), b"payload");
    }

    #[tokio::test]
    async fn pump_stops_when_sink_closes() {
        let (mut writer, source) = duplex(64);
        let (sink, reader) = duplex(64);
        drop(reader);

        let task = tokio::spawn(pump(source, sink, ChunkMode::Passthrough, 16, Direction::Upstream));
        writer.write_all(b"nobody listens").await.unwrap();

        assert!(task.await.unwrap().is_err());
    }
}
