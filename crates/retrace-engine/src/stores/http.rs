use crate::store::{AxTreeGenerator, AxTreeOutput, BlobStore, StoreError};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::json;
use std::time::Duration;
use tracing::debug;
use url::Url;

fn transport_error(e: reqwest::Error) -> StoreError {
    StoreError::Http {
        status: e.status().map(|s| s.as_u16()),
        message: e.to_string(),
    }
}

/// Fail on non-2xx, keeping the status so the retry policy can classify it.
async fn check_status(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Http {
        status: Some(status.as_u16()),
        message: format!("{} {}", status, body.trim()),
    })
}

/// Out-of-band HTML served over HTTP(S).
///
/// Absolute `http(s)` keys are fetched as-is; any other key is joined onto the
/// base URL.
pub struct HttpBlobStore {
    client: Client,
    base_url: Option<Url>,
}

impl HttpBlobStore {
    pub fn new(base_url: Option<Url>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: Option<Url>) -> Self {
        Self { client, base_url }
    }

    pub fn resolve(&self, key: &str) -> Result<Url, StoreError> {
        if let Ok(url) = Url::parse(key)
            && matches!(url.scheme(), "http" | "https")
        {
            return Ok(url);
        }
        let base = self
            .base_url
            .as_ref()
            .ok_or_else(|| StoreError::InvalidKey(key.to_string()))?;
        base.join(key.trim_start_matches('/'))
            .map_err(|_| StoreError::InvalidKey(key.to_string()))
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn fetch(&self, key: &str) -> Result<String, StoreError> {
        let url = self.resolve(key)?;
        debug!("Fetching blob {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(transport_error)?;
        let response = check_status(response).await?;
        response.text().await.map_err(transport_error)
    }
}

/// Client for an accessibility-tree service.
///
/// `POST {endpoint}` with `{"html": ...}`, answered by `{"axtree": ..., "html": ...}`.
pub struct HttpAxTreeGenerator {
    client: Client,
    endpoint: Url,
}

impl HttpAxTreeGenerator {
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(transport_error)?;
        Ok(Self::with_client(client, endpoint))
    }

    pub fn with_client(client: Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }
}

#[async_trait]
impl AxTreeGenerator for HttpAxTreeGenerator {
    async fn generate(&self, html: &str) -> Result<AxTreeOutput, StoreError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&json!({ "html": html }))
            .send()
            .await
            .map_err(transport_error)?;
        let body = check_status(response)
            .await?
            .bytes()
            .await
            .map_err(transport_error)?;
        Ok(serde_json::from_slice(&body)?)
    }
}
