//! Bearer credential → [`Identity`].

use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderMap};
use serde_json::Value;

use super::identity::{Identity, Role};
use super::provider::{IdentityProvider, SERVICE};
use crate::audit::{AuditEvent, AuditLogger, RiskLevel};
use crate::resilience::{with_deadline, CollaboratorError};
use crate::store::{Filter, RecordStore, PROFILES};

#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthError {
    /// No credential, or one the identity provider would not vouch for.
    #[error("unauthenticated: {0}")]
    Unauthenticated(&'static str),

    /// Valid credential, but the account cannot be used.
    #[error("forbidden: {0}")]
    Forbidden(&'static str),

    #[error(transparent)]
    Unavailable(#[from] CollaboratorError),
}

/// Request details recorded with the `api_access` audit event.
#[derive(Debug, Clone, Default)]
pub struct AccessContext {
    pub method: String,
    pub path: String,
    pub ip: String,
    pub user_agent: Option<String>,
}

/// Extract the token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[derive(Clone)]
pub struct AuthResolver {
    provider: Arc<dyn IdentityProvider>,
    store: Arc<dyn RecordStore>,
    audit: AuditLogger,
    provider_timeout: Duration,
}

impl AuthResolver {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        store: Arc<dyn RecordStore>,
        audit: AuditLogger,
        provider_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            store,
            audit,
            provider_timeout,
        }
    }

    /// Resolve the caller, failing closed on any doubt.
    ///
    /// On success an `api_access` audit event is dispatched in the
    /// background; its outcome never affects the returned identity.
    pub async fn resolve(
        &self,
        token: Option<&str>,
        access: &AccessContext,
    ) -> Result<Identity, AuthError> {
        let token = token.ok_or(AuthError::Unauthenticated("Missing bearer token"))?;

        let user = with_deadline(
            SERVICE,
            self.provider_timeout,
            self.provider.verify_token(token),
        )
        .await?
        .ok_or(AuthError::Unauthenticated("Invalid or expired token"))?;

        let profile = self
            .store
            .select(PROFILES, &Filter::new().eq("id", user.user_id.as_str()).limit(1))
            .await?
            .into_iter()
            .next()
            .ok_or(AuthError::Forbidden("Profile not found or inactive"))?;

        let identity = identity_from_profile(&user.user_id, user.email.as_deref(), &profile)?;

        self.audit.record_detached(
            AuditEvent::new("api_access", "api")
                .actor(identity.id.as_str())
                .risk(RiskLevel::Low)
                .meta("method", access.method.as_str())
                .meta("path", access.path.as_str())
                .meta("ip", access.ip.as_str())
                .meta("user_agent", access.user_agent.clone().map(Value::String).unwrap_or(Value::Null)),
        );

        Ok(identity)
    }
}

fn identity_from_profile(
    user_id: &str,
    provider_email: Option<&str>,
    profile: &Value,
) -> Result<Identity, AuthError> {
    let active = profile.get("is_active").and_then(Value::as_bool).unwrap_or(false);
    if !active {
        return Err(AuthError::Forbidden("Profile not found or inactive"));
    }
    let role: Role = profile
        .get("role")
        .and_then(Value::as_str)
        .and_then(|r| r.parse().ok())
        .ok_or(AuthError::Forbidden("Profile has no recognised role"))?;
    let email = profile
        .get("email")
        .and_then(Value::as_str)
        .or(provider_email)
        .unwrap_or_default()
        .to_string();

    Ok(Identity {
        id: user_id.to_string(),
        email,
        role,
        active,
    })
}
