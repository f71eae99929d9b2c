//! Hosted database over its REST interface.
//!
//! Collections map to `{base}/rest/v1/{collection}`, equality filters to
//! `column=eq.value` query parameters and RPCs to `{base}/rest/v1/rpc/{name}`.
//! Requests authenticate with the service key in both the `apikey` and
//! `Authorization` headers.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde_json::Value;
use url::Url;

use super::{Filter, RecordStore, SERVICE};
use crate::resilience::CollaboratorError;

#[derive(Clone)]
pub struct RestStore {
    client: Client,
    base_url: Url,
    service_key: String,
}

impl RestStore {
    pub fn new(base_url: Url, service_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url,
            service_key: service_key.into(),
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, CollaboratorError> {
        self.base_url
            .join(&format!("rest/v1/{path}"))
            .map_err(|e| CollaboratorError::Transport {
                service: SERVICE,
                detail: e.to_string(),
            })
    }

    fn collection_url(&self, collection: &str, filter: &Filter) -> Result<Url, CollaboratorError> {
        let mut url = self.endpoint(collection)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("select", "*");
            for (column, value) in &filter.conditions {
                let rendered = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                query.append_pair(column, &format!("eq.{rendered}"));
            }
            if let Some(column) = &filter.order_desc {
                query.append_pair("order", &format!("{column}.desc"));
            }
            if let Some(limit) = filter.limit {
                query.append_pair("limit", &limit.to_string());
            }
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Value, CollaboratorError> {
        let response = builder.send().await.map_err(transport)?;
        decode(response).await
    }
}

fn transport(e: reqwest::Error) -> CollaboratorError {
    CollaboratorError::Transport {
        service: SERVICE,
        detail: e.to_string(),
    }
}

async fn decode(response: Response) -> Result<Value, CollaboratorError> {
    let status = response.status();
    if !status.is_success() {
        tracing::warn!(status = %status, "Record store rejected request");
        return Err(CollaboratorError::Rejected {
            service: SERVICE,
            status: status.as_u16(),
        });
    }
    let bytes = response.bytes().await.map_err(transport)?;
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_slice(&bytes).map_err(|e| CollaboratorError::Decode {
        service: SERVICE,
        detail: e.to_string(),
    })
}

fn into_rows(value: Value) -> Result<Vec<Value>, CollaboratorError> {
    match value {
        Value::Array(rows) => Ok(rows),
        Value::Null => Ok(Vec::new()),
        other => Err(CollaboratorError::Decode {
            service: SERVICE,
            detail: format!("expected an array of rows, got {other}"),
        }),
    }
}

#[async_trait]
impl RecordStore for RestStore {
    async fn select(&self, collection: &str, filter: &Filter) -> Result<Vec<Value>, CollaboratorError> {
        let url = self.collection_url(collection, filter)?;
        into_rows(self.send(self.request(Method::GET, url)).await?)
    }

    async fn insert(&self, collection: &str, record: Value) -> Result<Value, CollaboratorError> {
        let url = self.endpoint(collection)?;
        let rows = into_rows(
            self.send(
                self.request(Method::POST, url)
                    .header("Prefer", "return=representation")
                    .json(&record),
            )
            .await?,
        )?;
        rows.into_iter().next().ok_or_else(|| CollaboratorError::Decode {
            service: SERVICE,
            detail: "insert returned no rows".to_string(),
        })
    }

    async fn update(
        &self,
        collection: &str,
        filter: &Filter,
        patch: Value,
    ) -> Result<Vec<Value>, CollaboratorError> {
        let url = self.collection_url(collection, filter)?;
        into_rows(
            self.send(
                self.request(Method::PATCH, url)
                    .header("Prefer", "return=representation")
                    .json(&patch),
            )
            .await?,
        )
    }

    async fn delete(&self, collection: &str, filter: &Filter) -> Result<u64, CollaboratorError> {
        let url = self.collection_url(collection, filter)?;
        let rows = into_rows(
            self.send(
                self.request(Method::DELETE, url)
                    .header("Prefer", "return=representation"),
            )
            .await?,
        )?;
        Ok(rows.len() as u64)
    }

    async fn rpc(&self, function: &str, args: Value) -> Result<Value, CollaboratorError> {
        let url = self.endpoint(&format!("rpc/{function}"))?;
        self.send(self.request(Method::POST, url).json(&args)).await
    }
}
