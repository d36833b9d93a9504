//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use std::net::{AddrParseError, SocketAddr};

use serde::{Deserialize, Serialize};

/// Placeholder key used when no key is configured.
///
/// WARNING: This is a placeholder! Set `transform.key` in production.
pub const DEFAULT_TRANSFORM_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

/// Root configuration for the forward proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind host, port, backlog).
    pub listener: ListenerConfig,

    /// Forwarding loop settings.
    pub forwarding: ForwardingConfig,

    /// Body transform settings.
    pub transform: TransformConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Startup and shutdown settings.
    pub lifecycle: LifecycleConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Host or IP to bind (e.g., "0.0.0.0").
    pub host: String,

    /// Port to bind. Zero asks the OS for an ephemeral port.
    pub port: u16,

    /// Listen backlog (maximum pending, not yet accepted, connections).
    pub max_pending_connections: u32,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8888,
            max_pending_connections: 128,
        }
    }
}

/// Forwarding loop configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ForwardingConfig {
    /// Size of every socket read, in bytes. Also the size of the initial
    /// request read, so a request head larger than this is cut short.
    pub buffer_size: usize,
}

impl Default for ForwardingConfig {
    fn default() -> Self {
        Self { buffer_size: 4096 }
    }
}

/// Key material, either as text or as raw bytes.
///
/// ```toml
/// key = "secret"
/// key = [19, 55, 0, 255]
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum KeyMaterial {
    Text(String),
    Bytes(Vec<u8>),
}

impl KeyMaterial {
    /// The key bytes as fed to the transform.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            KeyMaterial::Text(s) => s.as_bytes(),
            KeyMaterial::Bytes(b) => b,
        }
    }
}

/// Body transform configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransformConfig {
    /// XOR key, cycled over each body fragment. Must not be empty.
    pub key: KeyMaterial,
}

impl TransformConfig {
    /// Whether the built-in placeholder key is still in use.
    pub fn uses_placeholder_key(&self) -> bool {
        self.key.as_bytes() == DEFAULT_TRANSFORM_KEY.as_bytes()
    }
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            key: KeyMaterial::Text(DEFAULT_TRANSFORM_KEY.to_string()),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable, for development.
    #[default]
    Pretty,
    /// One JSON object per line, for log aggregation.
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log filter directive (trace, debug, info, warn, error, or an
    /// `EnvFilter` expression). `RUST_LOG` takes precedence.
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

impl ObservabilityConfig {
    /// Address the metrics endpoint should listen on, or `None` when
    /// metrics are disabled.
    pub fn metrics_listen_addr(&self) -> Result<Option<SocketAddr>, AddrParseError> {
        if !self.metrics_enabled {
            return Ok(None);
        }
        self.metrics_address.parse().map(Some)
    }
}

/// Lifecycle configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// How long in-flight connections may keep running after a shutdown
    /// signal before the process exits anyway.
    pub shutdown_grace_secs: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            shutdown_grace_secs: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable() {
        let config = ProxyConfig::default();
        assert_eq!(config.listener.port, 8888);
        assert_eq!(config.forwarding.buffer_size, 4096);
        assert!(config.transform.uses_placeholder_key());
        assert!(!config.observability.metrics_enabled);
    }

    #[test]
    fn metrics_listen_addr_follows_enabled_flag() {
        let mut obs = ObservabilityConfig::default();
        assert_eq!(obs.metrics_listen_addr().unwrap(), None);

        obs.metrics_enabled = true;
        obs.metrics_address = "127.0.0.1:9191".into();
        assert_eq!(
            obs.metrics_listen_addr().unwrap(),
            Some("127.0.0.1:9191".parse().unwrap())
        );

        obs.metrics_address = "nowhere".into();
        assert!(obs.metrics_listen_addr().is_err());
    }

    #[test]
    fn key_accepts_text_or_bytes() {
        let text: TransformConfig = toml::from_str(r#"key = "abc""#).unwrap();
        assert_eq!(text.key.as_bytes(), b"abc");

        let bytes: TransformConfig = toml::from_str("key = [0, 255, 19]").unwrap();
        assert_eq!(bytes.key.as_bytes(), &[0u8, 255, 19]);
        assert!(!bytes.uses_placeholder_key());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [listener]
            port = 3128

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.port, 3128);
        assert_eq!(config.listener.host, "0.0.0.0");
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.lifecycle.shutdown_grace_secs, 5);
    }
}
