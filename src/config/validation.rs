//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, body limit > 0)
//! - Check every KV endpoint parses as an http(s) URL
//! - Check the key prefix is absolute
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{AppConfig, KvBackend};

/// A single semantic problem in a config file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration, collecting every error.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::new("listener.max_body_bytes", "must be > 0"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be > 0"));
    }

    let kv = &config.kv;
    if !kv.key_prefix.starts_with('/') {
        errors.push(ValidationError::new(
            "kv.key_prefix",
            format!("'{}' must start with '/'", kv.key_prefix),
        ));
    }
    if kv.dial_timeout_secs == 0 {
        errors.push(ValidationError::new("kv.dial_timeout_secs", "must be > 0"));
    }
    if kv.request_timeout_secs == 0 {
        errors.push(ValidationError::new("kv.request_timeout_secs", "must be > 0"));
    }
    if kv.backend == KvBackend::Etcd {
        check_endpoints("kv.default_endpoints", &kv.default_endpoints, &mut errors);
        for (env, endpoints) in &kv.environments {
            let field = format!("kv.environments.{}", env);
            if endpoints.is_empty() {
                errors.push(ValidationError::new(field.clone(), "must list at least one endpoint"));
            }
            check_endpoints(&field, endpoints, &mut errors);
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
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

fn check_endpoints(field: &str, endpoints: &[String], errors: &mut Vec<ValidationError>) {
    for endpoint in endpoints {
        match url::Url::parse(endpoint) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            Ok(url) => errors.push(ValidationError::new(
                field,
                format!("unsupported scheme '{}' in '{}'", url.scheme(), endpoint),
            )),
            Err(e) => errors.push(ValidationError::new(
                field,
                format!("invalid endpoint '{}': {}", endpoint, e),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = AppConfig::default();
        config.timeouts.request_secs = 0;
        config.kv.key_prefix = "confgate".into();
        config.kv.default_endpoints = vec!["not a url".into(), "ftp://etcd:21".into()];
        config.kv.environments.insert("prod".into(), vec![]);

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "timeouts.request_secs",
                "kv.key_prefix",
                "kv.default_endpoints",
                "kv.default_endpoints",
                "kv.environments.prod",
            ]
        );
    }

    #[test]
    fn test_memory_backend_skips_endpoint_checks() {
        let mut config = AppConfig::default();
        config.kv.backend = KvBackend::Memory;
        config.kv.default_endpoints = vec!["whatever".into()];
        assert!(validate_config(&config).is_ok());
    }
}
