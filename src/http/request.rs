//! Request line parsing and destination resolution.
//!
//! # Responsibilities
//! - Pull method, target and version out of the first line of a request head
//! - Resolve absolute-form (`http://host:port/path`) and bare `host:port/path`
//!   targets to a host and port, defaulting to port 80
//! - Resolve CONNECT authority-form targets (`host:port`)
//!
//! # Design Decisions
//! - Works on raw bytes; only the host is required to be UTF-8
//! - Headers are never consulted, so origin-form (`/path`) does not resolve
//! - Any failure is a `MalformedRequest`; nothing is sent back to the client

use crate::http::error::{ProxyError, ProxyResult};

const CRLF: &[u8] = b"\r\n";
const SCHEME_SEPARATOR: &[u8] = b"://";
const CONNECT: &[u8] = b"CONNECT";
const DEFAULT_PORT: u16 = 80;

/// The three tokens of an HTTP request line, borrowed from the head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestLine<'a> {
    pub method: &'a [u8],
    pub target: &'a [u8],
    pub version: &'a [u8],
}

impl RequestLine<'_> {
    pub fn is_connect(&self) -> bool {
        self.method == CONNECT
    }
}

/// Destination of a proxied exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub port: u16,
}

impl Target {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Parse the first line of `head` into method, target and version.
///
/// The line must be CRLF-terminated and consist of exactly three non-empty
/// tokens separated by single spaces.
pub fn parse_request_line(head: &[u8]) -> ProxyResult<RequestLine<'_>> {
    let line_end = find(head, CRLF)
        .ok_or_else(|| ProxyError::malformed("request line is not terminated"))?;
    let line = &head[..line_end];

    let tokens: Vec<&[u8]> = line.split(|&b| b == b' ').collect();
    match tokens.as_slice() {
        &[method, target, version]
            if !method.is_empty() && !target.is_empty() && !version.is_empty() =>
        {
            Ok(RequestLine {
                method,
                target,
                version,
            })
        }
        _ => Err(ProxyError::malformed(format!(
            "request line '{}' does not have three tokens",
            String::from_utf8_lossy(line)
        ))),
    }
}

/// Resolve the destination of a non-CONNECT request from its URL token.
pub fn resolve_target(url: &[u8]) -> ProxyResult<Target> {
    let rest = match find(url, SCHEME_SEPARATOR) {
        Some(pos) => &url[pos + SCHEME_SEPARATOR.len()..],
        None => url,
    };

    let path_pos = rest.iter().position(|&b| b == b'/').unwrap_or(rest.len());
    let port_pos = rest.iter().position(|&b| b == b':');

    match port_pos {
        Some(port_pos) if port_pos < path_pos => {
            let host = decode_host(&rest[..port_pos])?;
            let port = parse_port(&rest[port_pos + 1..path_pos])?;
            Ok(Target { host, port })
        }
        _ => {
            let host = decode_host(&rest[..path_pos])?;
            Ok(Target {
                host,
                port: DEFAULT_PORT,
            })
        }
    }
}

/// Resolve a CONNECT target of the form `host:port`.
pub fn resolve_connect_target(url: &[u8]) -> ProxyResult<Target> {
    let tokens: Vec<&[u8]> = url.split(|&b| b == b':').collect();
    match tokens.as_slice() {
        &[host, port] => Ok(Target {
            host: decode_host(host)?,
            port: parse_port(port)?,
        }),
        _ => Err(ProxyError::malformed(format!(
            "CONNECT target '{}' is not host:port",
            String::from_utf8_lossy(url)
        ))),
    }
}

fn decode_host(raw: &[u8]) -> ProxyResult<String> {
    if raw.is_empty() {
        return Err(ProxyError::malformed("target has no host"));
    }
    std::str::from_utf8(raw)
        .map(str::to_owned)
        .map_err(|_| ProxyError::malformed("target host is not valid UTF-8"))
}

fn parse_port(raw: &[u8]) -> ProxyResult<u16> {
    let invalid = || ProxyError::malformed(format!("invalid port '{}'", String::from_utf8_lossy(raw)));

    let port: u16 = std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(invalid)?;
    if port == 0 {
        return Err(invalid());
    }
    Ok(port)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
