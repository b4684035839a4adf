use crate::headers::HeaderSet;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client};
use std::time::Duration;

/// Fetches the raw markup behind a URL.
///
/// Transport and HTTP status errors are returned as-is; there are no retries.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str, headers: &HeaderSet) -> Result<String>;
}

/// Creates an HTTP client that never stores cookies.
///
/// Every `Set-Cookie` is dropped, so no session or tracking state carries
/// over from one request to the next. Headers are supplied per request.
pub fn create_http_client(timeout: Duration) -> Result<Client> {
    let client = Client::builder()
        .cookie_store(false)
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client")?;

    Ok(client)
}

/// Converts a header set into a `HeaderMap`, keeping field order
pub fn to_header_map(headers: &HeaderSet) -> Result<header::HeaderMap> {
    let mut map = header::HeaderMap::with_capacity(headers.len());

    for (name, value) in headers.iter() {
        let name = header::HeaderName::from_bytes(name.as_bytes())
            .with_context(|| format!("Invalid header name '{}'", name))?;
        let value = header::HeaderValue::from_str(value)
            .with_context(|| format!("Invalid value for header '{}'", name))?;
        map.append(name, value);
    }

    Ok(map)
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: create_http_client(timeout)?,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, headers: &HeaderSet) -> Result<String> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .headers(to_header_map(headers)?)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?
            .error_for_status()
            .with_context(|| format!("Unexpected status from {}", url))?;

        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read body of {}", url))?;

        tracing::trace!("Fetched {} bytes from {}", body.len(), url);
        Ok(body)
    }
}
