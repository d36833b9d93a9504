//! Head/body boundary detection.
//!
//! The boundary is the first blank line (`\r\n\r\n`). Nothing before it is
//! validated; it only decides which bytes the body codec may touch.

const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Offset where the body starts, i.e. the length of the head including its
/// terminator. `None` when the buffer has no blank line.
pub fn body_offset(buf: &[u8]) -> Option<usize> {
    buf.windows(HEAD_TERMINATOR.len())
        .position(|w| w == HEAD_TERMINATOR)
        .map(|i| i + HEAD_TERMINATOR.len())
}

/// Split `buf` into `(head, body)`.
///
/// Without a boundary the whole buffer is head and the body is empty.
pub fn split(buf: &[u8]) -> (&[u8], &[u8]) {
    match body_offset(buf) {
        Some(offset) => buf.split_at(offset),
        None => (buf, &[]),
    }
}
