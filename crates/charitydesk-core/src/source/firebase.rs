//! REST client for the hosted realtime document database.
//!
//! Every node in the database tree is addressable as `{base}/{path}.json`.
//! Reads are `GET`, partial updates are `PATCH`, deletes are `DELETE`.
//! Authenticated databases take the token as an `auth` query parameter.

use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde_json::Value;
use tracing::{debug, warn};

use super::{documents_from_value, Document, DocumentSource, SourceError};

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Database client.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct RealtimeDbClient {
    client: Client,
    base_url: Url,
    auth_token: Option<String>,
    initial_backoff: Duration,
}

impl RealtimeDbClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            bail!("Database URL {} cannot hold paths", base_url);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url,
            auth_token: None,
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
        })
    }

    /// Set the database secret or ID token sent with every request
    pub fn set_token(&mut self, token: String) {
        self.auth_token = Some(token);
    }

    /// Create a new client with the given token, sharing the connection pool.
    pub fn with_token(&self, token: String) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            auth_token: Some(token),
            initial_backoff: self.initial_backoff,
        }
    }

    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    /// URL of a node. Each segment is percent-encoded, so a key can never
    /// spill into the query string or address a nested path.
    fn node_url(&self, path: &str, key: Option<&str>) -> Result<Url, SourceError> {
        let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if let Some(key) = key {
            segments.push(key);
        }
        let Some((last, parents)) = segments.split_last() else {
            return Err(SourceError::InvalidRequest("empty database path".to_string()));
        };

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SourceError::InvalidRequest(format!("{} cannot hold paths", self.base_url)))?
            .pop_if_empty()
            .extend(parents)
            .push(&format!("{}.json", last));
        Ok(url)
    }

    fn request(&self, method: Method, url: &Url) -> RequestBuilder {
        let builder = self.client.request(method, url.clone());
        match self.auth_token {
            Some(ref token) => builder.query(&[("auth", token.as_str())]),
            None => builder,
        }
    }

    /// Check if response is successful, returning an error with body if not.
    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit (should retry),
    /// or Err for other errors.
    async fn check_response_for_retry(response: Response) -> Result<Option<Response>, SourceError> {
        if response.status().is_success() {
            Ok(Some(response))
        } else if response.status().as_u16() == 429 {
            Ok(None)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(SourceError::from_status(status, &body))
        }
    }

    async fn send(&self, method: Method, url: &Url, body: Option<&Value>) -> Result<Response, SourceError> {
        let mut retries = 0;
        let mut backoff = self.initial_backoff;

        loop {
            let mut request = self.request(method.clone(), url);
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request.send().await?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => return Ok(response),
                None => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(SourceError::RateLimited);
                    }
                    warn!(url = %url, retry = retries, backoff_ms = backoff.as_millis() as u64, "Rate limited, backing off");
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
            }
        }
    }

    async fn get_value(&self, url: &Url) -> Result<Value, SourceError> {
        let response = self.send(Method::GET, url, None).await?;
        let value = response.json::<Value>().await?;
        Ok(value)
    }
}

#[async_trait]
impl DocumentSource for RealtimeDbClient {
    async fn read(&self, path: &str) -> Result<Vec<Document>, SourceError> {
        let url = self.node_url(path, None)?;
        let docs = documents_from_value(self.get_value(&url).await?)?;
        debug!(path, count = docs.len(), "Collection read");
        Ok(docs)
    }

    async fn read_one(&self, path: &str, key: &str) -> Result<Option<Value>, SourceError> {
        let url = self.node_url(path, Some(key))?;
        match self.get_value(&url).await? {
            Value::Null => Ok(None),
            value => Ok(Some(value)),
        }
    }

    async fn update(&self, path: &str, key: &str, partial: &Value) -> Result<(), SourceError> {
        if !partial.is_object() {
            return Err(SourceError::InvalidRequest(
                "partial update must be a JSON object".to_string(),
            ));
        }
        let url = self.node_url(path, Some(key))?;
        self.send(Method::PATCH, &url, Some(partial)).await?;
        debug!(path, key, "Document updated");
        Ok(())
    }

    async fn remove(&self, path: &str, key: &str) -> Result<(), SourceError> {
        let url = self.node_url(path, Some(key))?;
        self.send(Method::DELETE, &url, None).await?;
        debug!(path, key, "Document removed");
        Ok(())
    }
}
