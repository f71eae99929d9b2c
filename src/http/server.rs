//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request id, tracing, timeout, body limit, pipeline)
//! - Start background tasks (retention sweeper, rate-limit janitor)
//! - Serve until the shutdown signal fires

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    http::Request,
    middleware::{self, map_response},
    routing::{delete, get, post, MethodRouter},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    map_response_body::MapResponseBodyLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin;
use crate::api;
use crate::audit::AuditLogger;
use crate::auth::{AuthResolver, IdentityProvider, Operation, RolePolicy};
use crate::config::GuardConfig;
use crate::http::middleware::{
    authenticate, csrf_guard, enforce_route_policy, guard::GuardState, sanitize_body,
    track_requests, RouteGuard,
};
use crate::http::request::X_REQUEST_ID;
use crate::http::response::expose_debug_detail;
use crate::lifecycle::Shutdown;
use crate::outbox::Outbox;
use crate::retention::RetentionSweeper;
use crate::security::RateLimiter;
use crate::store::{DeadlineStore, RecordStore};
use crate::validation::rule::UnknownRule;
use crate::validation::{SchemaCatalog, SchemaName};

/// Application state injected into handlers and middleware.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GuardConfig>,
    pub catalog: Arc<SchemaCatalog>,
    pub policy: Arc<RolePolicy>,
    pub limiter: RateLimiter,
    pub resolver: AuthResolver,
    pub audit: AuditLogger,
    pub store: Arc<dyn RecordStore>,
    pub outbox: Outbox,
    pub sweeper: Arc<RetentionSweeper>,
    pub started_at: Instant,
}

impl AppState {
    /// Wire collaborators into shared state. Every store call made through
    /// the state is bounded by `store.timeout_ms`.
    pub fn new(
        config: GuardConfig,
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn RecordStore>,
    ) -> Result<Self, UnknownRule> {
        let store: Arc<dyn RecordStore> = Arc::new(DeadlineStore::new(
            store,
            Duration::from_millis(config.store.timeout_ms),
        ));
        let audit = AuditLogger::new(store.clone());
        let resolver = AuthResolver::new(
            identity,
            store.clone(),
            audit.clone(),
            Duration::from_millis(config.identity.timeout_ms),
        );
        let sweeper = Arc::new(RetentionSweeper::new(
            store.clone(),
            audit.clone(),
            config.retention.clone(),
        ));

        Ok(Self {
            catalog: Arc::new(SchemaCatalog::standard()?),
            policy: Arc::new(RolePolicy::standard()),
            limiter: RateLimiter::in_memory(),
            resolver,
            audit,
            outbox: Outbox::new(store.clone()),
            store,
            sweeper,
            started_at: Instant::now(),
            config: Arc::new(config),
        })
    }

    /// Attach the per-route policy for `operation` to `handler`.
    pub fn guarded(
        &self,
        route: RouteGuard,
        handler: MethodRouter<AppState>,
    ) -> MethodRouter<AppState> {
        handler.route_layer(middleware::from_fn_with_state(
            GuardState {
                app: self.clone(),
                route,
            },
            enforce_route_policy,
        ))
    }
}

/// HTTP server for the guarded API.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(
        config: GuardConfig,
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn RecordStore>,
    ) -> Result<Self, UnknownRule> {
        let state = AppState::new(config, identity, store)?;
        let router = Self::build_router(state.clone());
        Ok(Self { router, state })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState) -> Router {
        use Operation::*;

        let protected = Router::new()
            .route(
                "/api/patients",
                state
                    .guarded(RouteGuard::new(ViewPatients), get(api::patients::list_patients))
                    .merge(state.guarded(
                        RouteGuard::new(CreatePatient).with_schema(SchemaName::Patient),
                        post(api::patients::create_patient),
                    )),
            )
            .route(
                "/api/patients/{id}",
                state.guarded(
                    RouteGuard::new(DeletePatient),
                    delete(api::patients::delete_patient),
                ),
            )
            .route(
                "/api/appointments",
                state.guarded(
                    RouteGuard::new(CreateAppointment).with_schema(SchemaName::Appointment),
                    post(api::appointments::create_appointment),
                ),
            )
            .route(
                "/api/payments",
                state.guarded(
                    RouteGuard::new(RecordPayment).with_schema(SchemaName::Payment),
                    post(api::payments::record_payment),
                ),
            )
            .route(
                "/api/staff/invitations",
                state.guarded(
                    RouteGuard::new(InviteStaff).with_schema(SchemaName::StaffInvitation),
                    post(api::staff::invite_staff),
                ),
            )
            .route(
                "/api/audit-events",
                state.guarded(
                    RouteGuard::new(ViewAuditLog),
                    get(api::audit_events::list_audit_events),
                ),
            )
            .merge(admin::routes(&state))
            .layer(middleware::from_fn_with_state(state.clone(), authenticate));

        let public = Router::new()
            .route("/health", get(api::health))
            .route("/api/csrf-token", get(api::csrf::issue_csrf_token));

        let config = state.config.clone();
        let mut app = Router::new()
            .merge(public)
            .merge(protected)
            // Last layer added runs first: sanitize, then CSRF.
            .layer(middleware::from_fn_with_state(state.clone(), csrf_guard))
            .layer(middleware::from_fn_with_state(state.clone(), sanitize_body))
            .with_state(state);

        if config.server.debug {
            app = app.layer(map_response(expose_debug_detail));
        }

        app.layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
                .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                    let request_id = req
                        .headers()
                        .get(&X_REQUEST_ID)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("-");
                    tracing::info_span!(
                        "request",
                        method = %req.method(),
                        path = %req.uri().path(),
                        request_id = %request_id,
                    )
                }))
                .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
                .layer(middleware::from_fn(track_requests))
                .layer(TimeoutLayer::new(Duration::from_secs(
                    config.server.request_timeout_secs,
                )))
                .layer(MapResponseBodyLayer::new(Body::new))
                .layer(RequestBodyLimitLayer::new(config.server.max_body_bytes)),
        )
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the server on `listener` until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: &Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        tokio::spawn(self.state.sweeper.clone().run(shutdown.subscribe()));
        tokio::spawn(purge_rate_limits(
            self.state.limiter.clone(),
            Duration::from_secs(self.state.config.rate_limit.gc_interval_secs.max(1)),
            shutdown.subscribe(),
        ));

        let stop = shutdown.triggered();
        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                stop.await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Drop client keys whose windows have emptied.
async fn purge_rate_limits(
    limiter: RateLimiter,
    period: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let removed = limiter.purge_idle();
                if removed > 0 {
                    tracing::debug!(removed, remaining = limiter.tracked_keys(), "Purged idle rate-limit keys");
                }
            }
            _ = shutdown.recv() => break,
        }
    }
}
