use crate::error::{ApiClientError, Result};
use crate::safety::{ensure_http_url, redact_url};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://payment-api.khipu.com";

/// Header carrying the merchant API key.
pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    pub base_url: String,
    pub api_key: String,
    /// Per-request timeout. `Duration::ZERO` disables it.
    pub timeout: Duration,
    /// Maximum response body size (bytes). `None` = unlimited.
    pub max_response_bytes: Option<usize>,
}

impl ApiClientConfig {
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(30),
            max_response_bytes: None,
        }
    }
}

/// One call against the API: method, path segments (percent-encoded on the way out), query pairs
/// and an optional JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub segments: Vec<String>,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new<I, S>(method: Method, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            method,
            segments: segments.into_iter().map(Into::into).collect(),
            query: Vec::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// `/a/b` form of the route, for logs.
    #[must_use]
    pub fn route(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }
}

/// Shared, immutable client. Cheap to clone.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    base_url: Url,
    api_key: String,
    client: Client,
    timeout: Duration,
    max_response_bytes: Option<usize>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("timeout", &self.inner.timeout)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Build a client from static config.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is not an absolute `http(s)` URL, the API key is empty,
    /// or the HTTP client cannot be constructed.
    pub fn new(config: ApiClientConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            ApiClientError::Config(format!("Invalid base URL '{}': {e}", config.base_url))
        })?;
        ensure_http_url(&base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(ApiClientError::Config(format!(
                "Base URL '{}' cannot carry a path",
                config.base_url
            )));
        }
        if config.api_key.trim().is_empty() {
            return Err(ApiClientError::Config("API key must not be empty".to_string()));
        }

        let client = Client::builder()
            .user_agent(concat!("khipu-mcp/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                base_url,
                api_key: config.api_key,
                client,
                timeout: config.timeout,
                max_response_bytes: config.max_response_bytes,
            }),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Absolute URL for `request`: base URL + encoded segments + query.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL cannot carry path segments.
    pub fn url_for(&self, request: &ApiRequest) -> Result<Url> {
        let mut url = self.inner.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                ApiClientError::Config("Base URL cannot carry a path".to_string())
            })?;
            segments.pop_if_empty();
            for s in &request.segments {
                segments.push(s);
            }
        }
        if !request.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in &request.query {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    /// Send `request` with the API key and return the decoded body.
    ///
    /// Bodies that are not JSON come back as a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, an oversized body, or a non-2xx status (carrying
    /// the decoded error body).
    pub async fn invoke(&self, request: &ApiRequest) -> Result<Value> {
        let url = self.url_for(request)?;
        tracing::debug!(method = %request.method, url = %redact_url(&url), "calling payment API");

        let mut builder = self
            .inner
            .client
            .request(request.method.clone(), url)
            .header(API_KEY_HEADER, &self.inner.api_key)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json");
        if !self.inner.timeout.is_zero() {
            builder = builder.timeout(self.inner.timeout);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let bytes = read_body_limited(response, self.inner.max_response_bytes).await?;
        let body = decode_body(&bytes);

        if status.is_success() {
            Ok(body)
        } else {
            tracing::debug!(
                method = %request.method,
                route = %request.route(),
                status = status.as_u16(),
                "payment API returned an error"
            );
            Err(ApiClientError::Api {
                status: status.as_u16(),
                body,
            })
        }
    }
}

async fn read_body_limited(mut response: reqwest::Response, max: Option<usize>) -> Result<Vec<u8>> {
    let Some(max) = max else {
        return Ok(response.bytes().await?.to_vec());
    };

    if let Some(len) = response.content_length()
        && len > max as u64
    {
        return Err(ApiClientError::TooLarge(format!(
            "{len} bytes (limit {max})"
        )));
    }

    let mut out: Vec<u8> = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        if out.len().saturating_add(chunk.len()) > max {
            return Err(ApiClientError::TooLarge(format!("exceeded {max} bytes")));
        }
        out.extend_from_slice(&chunk);
    }
    Ok(out)
}

fn decode_body(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}
