//! REST Store
//!
//! Client for the hosted backend-as-a-service: PostgREST-style table
//! endpoints under `/rest/v1` and password sign-in under `/auth/v1`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::query::{Filter, Query};
use super::traits::RemoteStore;
use crate::domain::{DomainError, DomainResult, TableName};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Hosted backend client
pub struct RestStore {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
    access_token: RwLock<Option<String>>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    user: TokenUser,
}

#[derive(Debug, Deserialize)]
struct TokenUser {
    id: Uuid,
}

fn http_err(e: reqwest::Error) -> DomainError {
    DomainError::Remote(e.to_string())
}

/// Filter value as PostgREST expects it after an operator
fn literal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Value inside an `in.(...)` list; strings are quoted so commas survive
fn list_literal(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
        other => other.to_string(),
    }
}

/// Query-string pairs for a query
pub fn query_pairs(query: &Query) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for filter in &query.filters {
        match filter {
            Filter::Eq(column, Value::Null) => pairs.push((column.clone(), "is.null".to_string())),
            Filter::Eq(column, value) => pairs.push((column.clone(), format!("eq.{}", literal(value)))),
            Filter::In(column, values) => {
                let list = values.iter().map(list_literal).collect::<Vec<_>>().join(",");
                pairs.push((column.clone(), format!("in.({})", list)));
            }
        }
    }
    if !query.order.is_empty() {
        let order = query
            .order
            .iter()
            .map(|o| format!("{}.{}", o.column, if o.ascending { "asc" } else { "desc" }))
            .collect::<Vec<_>>()
            .join(",");
        pairs.push(("order".to_string(), order));
    }
    if let Some(limit) = query.limit {
        pairs.push(("limit".to_string(), limit.to_string()));
    }
    pairs
}

impl RestStore {
    pub fn new(base_url: &str, anon_key: &str) -> DomainResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(http_err)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            access_token: RwLock::new(None),
        })
    }

    fn table_url(&self, table: TableName) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// User token after sign-in, anon key before
    async fn bearer(&self) -> String {
        self.access_token
            .read()
            .await
            .clone()
            .unwrap_or_else(|| self.anon_key.clone())
    }

    async fn request(&self, method: reqwest::Method, table: TableName) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.table_url(table))
            .header("apikey", &self.anon_key)
            .bearer_auth(self.bearer().await)
    }

    /// Exchange email and password for a session; returns the user id
    pub async fn sign_in(&self, email: &str, password: &str) -> DomainResult<Uuid> {
        let response = self
            .client
            .post(format!("{}/auth/v1/token", self.base_url))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(http_err)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            log::warn!("Sign-in rejected ({}): {}", status, body);
            return Err(DomainError::Auth(crate::domain::AuthFailure::Failed(format!(
                "sign-in rejected with status {}",
                status
            ))));
        }

        let token: TokenResponse = response.json().await.map_err(http_err)?;
        *self.access_token.write().await = Some(token.access_token);
        log::info!("Signed in as {}", token.user.id);
        Ok(token.user.id)
    }

    pub async fn sign_out(&self) {
        *self.access_token.write().await = None;
    }

    async fn rows(table: TableName, response: reqwest::Response) -> DomainResult<Vec<Value>> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DomainError::Remote(format!("{} {}: {}", table, status, body)));
        }
        response.json::<Vec<Value>>().await.map_err(http_err)
    }
}

#[async_trait]
impl RemoteStore for RestStore {
    async fn insert(&self, table: TableName, rows: Vec<Value>) -> DomainResult<Vec<Value>> {
        let response = self
            .request(reqwest::Method::POST, table)
            .await
            .header("Prefer", "return=representation")
            .json(&rows)
            .send()
            .await
            .map_err(http_err)?;
        Self::rows(table, response).await
    }

    async fn select(&self, table: TableName, query: &Query) -> DomainResult<Vec<Value>> {
        let mut pairs = vec![("select".to_string(), "*".to_string())];
        pairs.extend(query_pairs(query));

        let response = self
            .request(reqwest::Method::GET, table)
            .await
            .query(&pairs)
            .send()
            .await
            .map_err(http_err)?;
        Self::rows(table, response).await
    }

    async fn update(&self, table: TableName, query: &Query, patch: Value) -> DomainResult<Vec<Value>> {
        let response = self
            .request(reqwest::Method::PATCH, table)
            .await
            .header("Prefer", "return=representation")
            .query(&query_pairs(query))
            .json(&patch)
            .send()
            .await
            .map_err(http_err)?;
        Self::rows(table, response).await
    }

    async fn delete(&self, table: TableName, query: &Query) -> DomainResult<()> {
        let response = self
            .request(reqwest::Method::DELETE, table)
            .await
            .query(&query_pairs(query))
            .send()
            .await
            .map_err(http_err)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DomainError::Remote(format!("{} {}: {}", table, status, body)));
        }
        Ok(())
    }
}
