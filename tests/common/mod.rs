//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::SET_COOKIE;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use clinic_guard::auth::{IdentityProvider, VerifiedUser};
use clinic_guard::config::GuardConfig;
use clinic_guard::resilience::CollaboratorError;
use clinic_guard::store::{Filter, MemoryStore, RecordStore, PROFILES, RPC_LOG_SECURITY_EVENT};
use clinic_guard::{HttpServer, Shutdown};

/// (token, user id, role, active)
pub const USERS: &[(&str, &str, &str, bool)] = &[
    ("tok-super", "u-super", "super_admin", true),
    ("tok-practice", "u-practice", "practice_admin", true),
    ("tok-manager", "u-manager", "manager", true),
    ("tok-dentist", "u-dentist", "dentist", true),
    ("tok-hygienist", "u-hygienist", "hygienist", true),
    ("tok-reception", "u-reception", "receptionist", true),
    ("tok-inactive", "u-inactive", "dentist", false),
];

/// Identity provider that knows a fixed set of tokens.
pub struct StaticIdentity {
    users: HashMap<String, String>,
}

impl StaticIdentity {
    pub fn standard() -> Self {
        Self {
            users: USERS
                .iter()
                .map(|(token, id, _, _)| (token.to_string(), id.to_string()))
                .collect(),
        }
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn verify_token(&self, token: &str) -> Result<Option<VerifiedUser>, CollaboratorError> {
        Ok(self.users.get(token).map(|id| VerifiedUser {
            user_id: id.clone(),
            email: Some(format!("{id}@clinic.test")),
        }))
    }
}

/// Memory store with a profile row for every entry in [`USERS`].
pub fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();
    store.seed(
        PROFILES,
        USERS.iter().map(|(_, id, role, active)| {
            json!({ "id": id, "email": format!("{id}@clinic.test"), "role": role, "is_active": active })
        }),
    );
    store
}

/// Wraps a [`MemoryStore`], optionally breaking audit writes or slowing
/// every call down.
pub struct FaultyStore {
    pub inner: MemoryStore,
    pub fail_audit: bool,
    pub delay: Option<Duration>,
}

impl FaultyStore {
    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl RecordStore for FaultyStore {
    async fn select(&self, c: &str, f: &Filter) -> Result<Vec<Value>, CollaboratorError> {
        self.pause().await;
        self.inner.select(c, f).await
    }
    async fn insert(&self, c: &str, r: Value) -> Result<Value, CollaboratorError> {
        self.pause().await;
        self.inner.insert(c, r).await
    }
    async fn update(&self, c: &str, f: &Filter, p: Value) -> Result<Vec<Value>, CollaboratorError> {
        self.pause().await;
        self.inner.update(c, f, p).await
    }
    async fn delete(&self, c: &str, f: &Filter) -> Result<u64, CollaboratorError> {
        self.pause().await;
        self.inner.delete(c, f).await
    }
    async fn rpc(&self, name: &str, args: Value) -> Result<Value, CollaboratorError> {
        self.pause().await;
        if self.fail_audit && name == RPC_LOG_SECURITY_EVENT {
            return Err(CollaboratorError::Rejected {
                service: "record store",
                status: 500,
            });
        }
        self.inner.rpc(name, args).await
    }
}

pub fn test_config() -> GuardConfig {
    let mut config = GuardConfig::default();
    config.server.bind_address = "127.0.0.1:0".into();
    config.retention.enabled = false;
    config
}

pub struct TestApp {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    shutdown: Shutdown,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Fetch a CSRF token; returns `(cookie pair, token)`.
    pub async fn csrf(&self) -> (String, String) {
        let res = self.client.get(self.url("/api/csrf-token")).send().await.unwrap();
        let cookie = res.headers()[SET_COOKIE]
            .to_str()
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_string();
        let body: Value = res.json().await.unwrap();
        (cookie, body["csrfToken"].as_str().unwrap().to_string())
    }

    pub async fn get(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
    }

    /// Mutating request carrying a matching CSRF header and cookie.
    pub async fn send(&self, method: reqwest::Method, path: &str, token: &str, body: Option<Value>) -> reqwest::Response {
        let (cookie, csrf) = self.csrf().await;
        let mut req = self
            .client
            .request(method, self.url(path))
            .bearer_auth(token)
            .header("cookie", cookie)
            .header("x-csrf-token", csrf);
        if let Some(body) = body {
            req = req.json(&body);
        }
        req.send().await.unwrap()
    }

    pub async fn post(&self, path: &str, token: &str, body: Value) -> reqwest::Response {
        self.send(reqwest::Method::POST, path, token, Some(body)).await
    }
}

pub async fn spawn_app(store: Arc<dyn RecordStore>) -> TestApp {
    spawn_app_with(test_config(), store).await
}

pub async fn spawn_app_with(config: GuardConfig, store: Arc<dyn RecordStore>) -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(config, Arc::new(StaticIdentity::standard()), store).unwrap();

    let shutdown = Shutdown::new();
    let handle = shutdown.clone();
    tokio::spawn(async move {
        server.run(listener, &handle).await.unwrap();
    });

    TestApp {
        addr,
        client: reqwest::Client::new(),
        shutdown,
    }
}

/// Wait until `check` holds, for detached writes such as `api_access`.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..50 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}
