//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::GuardConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Overrides `identity.api_key`.
pub const ENV_IDENTITY_API_KEY: &str = "CLINIC_GUARD_IDENTITY_API_KEY";
/// Overrides `store.service_key`.
pub const ENV_STORE_SERVICE_KEY: &str = "CLINIC_GUARD_STORE_SERVICE_KEY";

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GuardConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content, |key| std::env::var(key).ok())
}

/// Parse, apply overrides, validate.
///
/// `env` is injected so overrides can be tested without touching the
/// process environment.
pub fn parse_config(
    content: &str,
    env: impl Fn(&str) -> Option<String>,
) -> Result<GuardConfig, ConfigError> {
    let mut config: GuardConfig = toml::from_str(content)?;
    apply_env_overrides(&mut config, env);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

fn apply_env_overrides(config: &mut GuardConfig, env: impl Fn(&str) -> Option<String>) {
    if let Some(key) = env(ENV_IDENTITY_API_KEY).filter(|k| !k.is_empty()) {
        config.identity.api_key = key;
    }
    if let Some(key) = env(ENV_STORE_SERVICE_KEY).filter(|k| !k.is_empty()) {
        config.store.service_key = key;
    }
}
