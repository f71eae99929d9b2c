//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, windows > 0, addresses parse)
//! - Reject per-operation rate rules naming an unknown operation
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GuardConfig → Result<(), Vec<ValidationError>>

use std::fmt;
use std::net::SocketAddr;

use url::Url;

use crate::auth::Operation;
use crate::config::schema::{GuardConfig, RateRule, StoreBackend};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
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

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &GuardConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new("server.bind_address", "not a socket address"));
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::new("server.request_timeout_secs", "must be > 0"));
    }
    if config.server.max_body_bytes == 0 {
        errors.push(ValidationError::new("server.max_body_bytes", "must be > 0"));
    }

    if Url::parse(&config.identity.base_url).is_err() {
        errors.push(ValidationError::new("identity.base_url", "not a valid URL"));
    }
    if config.identity.timeout_ms == 0 {
        errors.push(ValidationError::new("identity.timeout_ms", "must be > 0"));
    }

    if config.store.timeout_ms == 0 {
        errors.push(ValidationError::new("store.timeout_ms", "must be > 0"));
    }
    if config.store.backend == StoreBackend::Rest {
        if Url::parse(&config.store.base_url).is_err() {
            errors.push(ValidationError::new("store.base_url", "not a valid URL"));
        }
        if config.store.service_key.is_empty() {
            errors.push(ValidationError::new(
                "store.service_key",
                "required for the rest backend",
            ));
        }
    }

    check_rule("rate_limit.default", &config.rate_limit.default, &mut errors);
    for (name, rule) in &config.rate_limit.operations {
        let field = format!("rate_limit.operations.{name}");
        if !Operation::ALL.iter().any(|op| op.as_str() == name) {
            errors.push(ValidationError::new(field.clone(), "unknown operation"));
        }
        check_rule(&field, rule, &mut errors);
    }

    if config.csrf.header_name.parse::<axum::http::HeaderName>().is_err() {
        errors.push(ValidationError::new("csrf.header_name", "not a valid header name"));
    }
    if config.csrf.cookie_name.is_empty() {
        errors.push(ValidationError::new("csrf.cookie_name", "must not be empty"));
    }

    if config.retention.interval_secs == 0 {
        errors.push(ValidationError::new("retention.interval_secs", "must be > 0"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "not a socket address",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_rule(field: &str, rule: &RateRule, errors: &mut Vec<ValidationError>) {
    if rule.window_ms == 0 {
        errors.push(ValidationError::new(format!("{field}.window_ms"), "must be > 0"));
    }
    if rule.max_requests == 0 {
        errors.push(ValidationError::new(format!("{field}.max_requests"), "must be > 0"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&GuardConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = GuardConfig::default();
        config.server.bind_address = "nope".into();
        config.server.request_timeout_secs = 0;
        config.rate_limit.default.max_requests = 0;
        config.rate_limit.operations.insert(
            "teleport".into(),
            RateRule {
                window_ms: 1,
                max_requests: 1,
            },
        );

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "server.bind_address",
                "server.request_timeout_secs",
                "rate_limit.default.max_requests",
                "rate_limit.operations.teleport",
            ]
        );
    }
}
