//! Per-connection error definitions.

use thiserror::Error;

use crate::http::request::Target;

/// Point in a connection's life where an I/O error happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Reading the initial request from the client.
    ReadRequest,
    /// Writing the CONNECT acknowledgement to the client.
    Acknowledge,
    /// Writing the rewritten request to the destination.
    SendRequest,
    /// Inside a forwarding loop.
    Forward,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::ReadRequest => "read request",
            Stage::Acknowledge => "acknowledge",
            Stage::SendRequest => "send request",
            Stage::Forward => "forward",
        };
        f.write_str(name)
    }
}

/// Errors that terminate a single client connection.
///
/// None of these is fatal to the listener; the client just sees its
/// connection close.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Request line, URL, host or port could not be parsed.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// Destination unreachable or refused.
    #[error("failed to connect to {target}: {source}")]
    ConnectFailure {
        target: Target,
        #[source]
        source: std::io::Error,
    },

    /// Read failure before any destination is known.
    #[error("I/O failure during {stage}: {source}")]
    Io {
        stage: Stage,
        #[source]
        source: std::io::Error,
    },

    /// Read or write failure once the destination has been resolved.
    #[error("I/O failure during {stage} for {target}: {source}")]
    Transfer {
        target: Target,
        stage: Stage,
        #[source]
        source: std::io::Error,
    },
}

impl ProxyError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        ProxyError::MalformedRequest(reason.into())
    }

    pub fn io(stage: Stage, source: std::io::Error) -> Self {
        ProxyError::Io { stage, source }
    }

    pub fn transfer(target: &Target, stage: Stage, source: std::io::Error) -> Self {
        ProxyError::Transfer {
            target: target.clone(),
            stage,
            source,
        }
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::MalformedRequest(_) => "malformed_request",
            ProxyError::ConnectFailure { .. } => "connect_failure",
            ProxyError::Io { .. } | ProxyError::Transfer { .. } => "io_failure",
        }
    }
}

/// Result type for connection handling.
pub type ProxyResult<T> = Result<T, ProxyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_context() {
        let err = ProxyError::ConnectFailure {
            target: Target::new("example.com", 443),
            source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("failed to connect to example.com:443"), "{}", msg);
        assert_eq!(err.kind(), "connect_failure");

        let err = ProxyError::io(Stage::SendRequest, std::io::ErrorKind::BrokenPipe.into());
        assert!(err.to_string().starts_with("I/O failure during send request"));
    }

    #[test]
    fn transfer_errors_name_the_destination() {
        let target = Target::new("origin.test", 8080);
        let err = ProxyError::transfer(&target, Stage::SendRequest, std::io::ErrorKind::BrokenPipe.into());
        assert!(
            err.to_string().starts_with("I/O failure during send request for origin.test:8080"),
            "{}",
            err
        );
        assert_eq!(err.kind(), "io_failure");
    }
}
