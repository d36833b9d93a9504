//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate configuration and build the forwarding context
//! - Bind the listener and start the accept loop
//! - Hand back a handle that can stop and drain the proxy
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listener binds last (traffic only when everything else is ready)

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinHandle;

use crate::codec::KeyError;
use crate::config::validation::{validate_config, ValidationError};
use crate::config::ProxyConfig;
use crate::http::{ForwardingContext, ProxyServer};
use crate::lifecycle::Shutdown;
use crate::net::connection::ConnectionTracker;
use crate::net::listener::{Listener, ListenerError};

/// Errors that prevent the proxy from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {}", join_errors(.0))]
    InvalidConfig(Vec<ValidationError>),

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error(transparent)]
    Listener(#[from] ListenerError),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A proxy that is accepting connections.
#[derive(Debug)]
pub struct RunningProxy {
    local_addr: SocketAddr,
    shutdown: Shutdown,
    tracker: ConnectionTracker,
    server: JoinHandle<()>,
    grace: Duration,
}

impl RunningProxy {
    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of client connections currently being handled.
    pub fn active_connections(&self) -> u64 {
        self.tracker.active_count()
    }

    /// Stop accepting, then wait up to the grace period for live connections.
    ///
    /// Returns `true` if every connection finished within the grace period.
    pub async fn shutdown(self) -> bool {
        self.shutdown.trigger();
        if let Err(e) = self.server.await {
            tracing::error!(error = %e, "Accept loop terminated abnormally");
        }

        let remaining = self.tracker.active_count();
        if remaining > 0 {
            tracing::info!(
                connections = remaining,
                grace_secs = self.grace.as_secs(),
                "Waiting for connections to drain"
            );
        }

        let drained = self.tracker.wait_for_idle(self.grace).await;
        if !drained {
            tracing::warn!(
                connections = self.tracker.active_count(),
                "Grace period elapsed with connections still open"
            );
        }
        drained
    }
}

/// Validate `config`, bind the listener and start serving.
pub async fn start(config: ProxyConfig) -> Result<RunningProxy, StartupError> {
    validate_config(&config).map_err(StartupError::InvalidConfig)?;

    if config.transform.uses_placeholder_key() {
        tracing::warn!("Using the placeholder transform key; set transform.key in the config file");
    }

    let context = ForwardingContext::from_config(&config)?;
    let server = ProxyServer::new(context);
    let tracker = server.tracker();

    let listener = Listener::bind(&config.listener).await?;
    let local_addr = listener.local_addr().map_err(ListenerError::Bind)?;

    let shutdown = Shutdown::new();
    let server = tokio::spawn(server.run(listener, shutdown.subscribe()));

    tracing::info!(
        address = %local_addr,
        buffer_size = config.forwarding.buffer_size,
        "Proxy server started"
    );

    Ok(RunningProxy {
        local_addr,
        shutdown,
        tracker,
        server,
        grace: Duration::from_secs(config.lifecycle.shutdown_grace_secs),
    })
}
