//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (backlog > 0, buffer size bounded, key non-empty)
//! - Check addresses that are only parsed later (metrics endpoint)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use crate::config::schema::ProxyConfig;

/// Upper bound for `forwarding.buffer_size`.
pub const MAX_BUFFER_SIZE: usize = 16 * 1024 * 1024;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.host.trim().is_empty() {
        errors.push(ValidationError::new("listener.host", "must not be empty"));
    }

    if config.listener.max_pending_connections == 0 {
        errors.push(ValidationError::new(
            "listener.max_pending_connections",
            "must be greater than zero",
        ));
    }

    let buffer_size = config.forwarding.buffer_size;
    if buffer_size == 0 || buffer_size > MAX_BUFFER_SIZE {
        errors.push(ValidationError::new(
            "forwarding.buffer_size",
            format!("must be between 1 and {} bytes, got {}", MAX_BUFFER_SIZE, buffer_size),
        ));
    }

    if config.transform.key.as_bytes().is_empty() {
        errors.push(ValidationError::new("transform.key", "must not be empty"));
    }

    if config.observability.metrics_listen_addr().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::KeyMaterial;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(validate_config(&ProxyConfig::default()), Ok(()));
    }

    #[test]
    fn reports_every_error() {
        let mut config = ProxyConfig::default();
        config.listener.max_pending_connections = 0;
        config.forwarding.buffer_size = 0;
        config.transform.key = KeyMaterial::Bytes(Vec::new());

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "listener.max_pending_connections",
                "forwarding.buffer_size",
                "transform.key",
            ]
        );
    }

    #[test]
    fn metrics_address_checked_only_when_enabled() {
        let mut config = ProxyConfig::default();
        config.observability.metrics_address = "not-an-address".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "observability.metrics_address");
    }

    #[test]
    fn oversized_buffer_rejected() {
        let mut config = ProxyConfig::default();
        config.forwarding.buffer_size = MAX_BUFFER_SIZE + 1;
        assert!(validate_config(&config).is_err());
    }
}
