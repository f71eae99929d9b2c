//! Per-route policy: role gate, then schema, then rate limit.

use std::time::Duration;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use serde_json::Value;

use crate::auth::{permit, Identity, Operation};
use crate::config::{RateLimitConfig, RateRule};
use crate::http::request::{client_ip, SanitizedBody, ValidatedRecord};
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::observability::metrics::{self, Stage};
use crate::security::RateDecision;
use crate::validation::SchemaName;

/// Scope shared by every operation without its own window.
pub const DEFAULT_SCOPE: &str = "api";

/// What one route declares about itself.
#[derive(Debug, Clone, Copy)]
pub struct RouteGuard {
    pub operation: Operation,
    pub schema: Option<SchemaName>,
}

impl RouteGuard {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            schema: None,
        }
    }

    pub fn with_schema(mut self, schema: SchemaName) -> Self {
        self.schema = Some(schema);
        self
    }
}

/// State handed to [`enforce_route_policy`].
#[derive(Clone)]
pub struct GuardState {
    pub app: AppState,
    pub route: RouteGuard,
}

/// Window and key scope for an operation.
pub fn rate_rule(config: &RateLimitConfig, operation: Operation) -> (&str, RateRule) {
    match config.operations.get(operation.as_str()) {
        Some(rule) => (operation.as_str(), *rule),
        None => (DEFAULT_SCOPE, config.default),
    }
}

pub async fn enforce_route_policy(
    State(guard): State<GuardState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let GuardState { app, route } = guard;
    let operation = route.operation;
    let identity = req.extensions().get::<Identity>().cloned();

    let allowed = app.policy.allowed(operation);
    if !permit(identity.as_ref(), allowed) {
        tracing::warn!(
            operation = operation.as_str(),
            user_id = identity.as_ref().map(|i| i.id.as_str()),
            role = identity.as_ref().map(|i| i.role.as_str()),
            "Role gate denied request"
        );
        metrics::record_rejection(Stage::Role);
        return Err(ApiError::InsufficientPermissions {
            required: allowed.to_vec(),
            current: identity.map(|i| i.role),
        });
    }

    if let Some(name) = route.schema {
        let schema = app
            .catalog
            .get(name)
            .ok_or_else(|| ApiError::Internal(format!("schema {name:?} missing from catalog")))?;
        let body = req
            .extensions()
            .get::<SanitizedBody>()
            .map(|b| &b.0)
            .unwrap_or(&Value::Null);
        match schema.validate_value(body) {
            Ok(record) => {
                req.extensions_mut().insert(ValidatedRecord(record));
            }
            Err(failure) => {
                tracing::info!(
                    operation = operation.as_str(),
                    fields = ?failure.fields(),
                    "Schema validation failed"
                );
                metrics::record_rejection(Stage::Validation);
                return Err(failure.into());
            }
        }
    }

    let limits = &app.config.rate_limit;
    if limits.enabled {
        let (scope, rule) = rate_rule(limits, operation);
        let client = match &identity {
            Some(identity) => identity.id.clone(),
            None => client_ip(&req),
        };
        let key = format!("{scope}:{client}");
        let decision = app.limiter.check(
            &key,
            Duration::from_millis(rule.window_ms),
            rule.max_requests,
        );
        if let RateDecision::Denied { .. } = decision {
            tracing::warn!(key = %key, operation = operation.as_str(), "Rate limit exceeded");
            metrics::record_rejection(Stage::RateLimit);
            return Err(ApiError::RateLimited {
                retry_after_secs: rule.window_ms.div_ceil(1000),
            });
        }
    }

    Ok(next.run(req).await)
}
