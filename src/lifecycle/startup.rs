//! Startup orchestration: turn configuration into live collaborators.

use std::sync::Arc;

use url::Url;

use crate::auth::{HttpIdentityProvider, IdentityProvider};
use crate::config::{GuardConfig, StoreBackend};
use crate::store::{MemoryStore, RecordStore, RestStore};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("invalid {field}: {source}")]
    Url {
        field: &'static str,
        #[source]
        source: url::ParseError,
    },
}

fn parse_url(field: &'static str, raw: &str) -> Result<Url, StartupError> {
    Url::parse(raw).map_err(|source| StartupError::Url { field, source })
}

pub fn identity_provider(config: &GuardConfig) -> Result<Arc<dyn IdentityProvider>, StartupError> {
    let base = parse_url("identity.base_url", &config.identity.base_url)?;
    Ok(Arc::new(HttpIdentityProvider::new(base, config.identity.api_key.clone())))
}

pub fn record_store(config: &GuardConfig) -> Result<Arc<dyn RecordStore>, StartupError> {
    match config.store.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory record store; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Rest => {
            let base = parse_url("store.base_url", &config.store.base_url)?;
            Ok(Arc::new(RestStore::new(base, config.store.service_key.clone())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_store_url_names_the_field() {
        let mut config = GuardConfig::default();
        config.store.backend = StoreBackend::Rest;
        config.store.base_url = "not a url".into();
        let err = record_store(&config).err().unwrap();
        assert!(err.to_string().starts_with("invalid store.base_url"));
    }
}
