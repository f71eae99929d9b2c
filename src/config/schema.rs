//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GuardConfig {
    /// HTTP listener and request limits.
    pub server: ServerConfig,

    /// Identity provider connection.
    pub identity: IdentityConfig,

    /// Record store connection.
    pub store: StoreConfig,

    /// Rate limiting windows.
    pub rate_limit: RateLimitConfig,

    /// CSRF token transport.
    pub csrf: CsrfConfig,

    /// Retention sweep schedule.
    pub retention: RetentionConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Request timeout (whole pipeline + handler) in seconds.
    pub request_timeout_secs: u64,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Include internal error detail in responses. Never enable in production.
    pub debug: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
            max_body_bytes: 1024 * 1024,
            debug: false,
        }
    }
}

/// Identity provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Base URL of the hosted auth service.
    pub base_url: String,

    /// Public API key sent with verification calls.
    pub api_key: String,

    /// Verification timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:54321/".to_string(),
            api_key: String::new(),
            timeout_ms: 5_000,
        }
    }
}

/// Which record store implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Rest,
}

/// Record store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,

    /// Base URL of the hosted database (rest backend only).
    pub base_url: String,

    /// Service key (rest backend only). Prefer the environment override.
    pub service_key: String,

    /// Per-call timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            base_url: "http://localhost:54321/".to_string(),
            service_key: String::new(),
            timeout_ms: 5_000,
        }
    }
}

/// One sliding window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct RateRule {
    /// Window length in milliseconds.
    pub window_ms: u64,

    /// Requests admitted per window.
    pub max_requests: u32,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Window shared by every route without an override.
    pub default: RateRule,

    /// Per-operation windows, keyed by operation name (e.g. "record_payment").
    pub operations: HashMap<String, RateRule>,

    /// How often idle client keys are dropped, in seconds.
    pub gc_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        let mut operations = HashMap::new();
        operations.insert(
            "record_payment".to_string(),
            RateRule {
                window_ms: 60_000,
                max_requests: 10,
            },
        );
        operations.insert(
            "invite_staff".to_string(),
            RateRule {
                window_ms: 60 * 60 * 1000,
                max_requests: 20,
            },
        );
        operations.insert(
            "run_retention_sweep".to_string(),
            RateRule {
                window_ms: 60_000,
                max_requests: 2,
            },
        );
        Self {
            enabled: true,
            default: RateRule {
                window_ms: 15 * 60 * 1000,
                max_requests: 100,
            },
            operations,
            gc_interval_secs: 60,
        }
    }
}

/// CSRF configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CsrfConfig {
    /// Request header carrying the token.
    pub header_name: String,

    /// Cookie binding the token to the session.
    pub cookie_name: String,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            header_name: "x-csrf-token".to_string(),
            cookie_name: "csrf_token".to_string(),
        }
    }
}

/// Retention sweep configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetentionConfig {
    pub enabled: bool,

    /// Interval between sweeps in seconds (daily by default).
    pub interval_secs: u64,

    /// Delay before the first sweep in seconds.
    pub initial_delay_secs: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 24 * 60 * 60,
            initial_delay_secs: 60,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level filter used when RUST_LOG is unset.
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "clinic_guard=info,tower_http=info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
