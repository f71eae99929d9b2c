//! Identity provider collaborator.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use url::Url;

use crate::resilience::CollaboratorError;

pub const SERVICE: &str = "identity provider";

/// A user the provider vouched for.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VerifiedUser {
    #[serde(rename = "id")]
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verify a bearer token. `Ok(None)` means the token was rejected.
    async fn verify_token(&self, token: &str) -> Result<Option<VerifiedUser>, CollaboratorError>;
}

/// Hosted auth service: `GET {base}/auth/v1/user` with the caller's token.
#[derive(Clone)]
pub struct HttpIdentityProvider {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl HttpIdentityProvider {
    pub fn new(base_url: Url, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url,
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn verify_token(&self, token: &str) -> Result<Option<VerifiedUser>, CollaboratorError> {
        let url = self
            .base_url
            .join("auth/v1/user")
            .map_err(|e| CollaboratorError::Transport {
                service: SERVICE,
                detail: e.to_string(),
            })?;

        let response = self
            .client
            .get(url)
            .header("apikey", &self.api_key)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| CollaboratorError::Transport {
                service: SERVICE,
                detail: e.to_string(),
            })?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => {
                let user: VerifiedUser =
                    response.json().await.map_err(|e| CollaboratorError::Decode {
                        service: SERVICE,
                        detail: e.to_string(),
                    })?;
                Ok(Some(user).filter(|u| !u.user_id.is_empty()))
            }
            s => Err(CollaboratorError::Rejected {
                service: SERVICE,
                status: s.as_u16(),
            }),
        }
    }
}
