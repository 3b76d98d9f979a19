//! HTTP transport behind the offline proxy.
//!
//! ### Requests
//! - Method, headers and body are forwarded as given.
//! - `CacheMode::NoStore` adds `Cache-Control: no-cache, no-store` and
//!   `Pragma: no-cache` so intermediaries revalidate with the origin.
//! - Max redirects: 5
//! - Max body bytes: 20MB (configurable)
//!
//! ### Failures
//! - Connect, DNS, timeout and body-read failures are `Error::Network`.
//! - HTTP error statuses are ordinary responses.

pub mod url;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Method, header};

use biblio_core::proxy::{CacheMode, Network, ProxyRequest, ProxyResponse};
use biblio_core::{AppConfig, Error};

pub use url::{UrlError, canonicalize, normalize_trailing_slash};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "biblio-proxy/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 20MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "biblio-proxy/0.1".to_string(),
            max_bytes: 20 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl FetchConfig {
    pub fn from_app(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// reqwest-backed [`Network`].
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn build(&self, request: &ProxyRequest, cache: CacheMode) -> Result<reqwest::Request, Error> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| Error::InvalidInput(format!("invalid method {}: {}", request.method, e)))?;

        let mut builder = self.http.request(method, request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if cache == CacheMode::NoStore {
            builder = builder
                .header(header::CACHE_CONTROL, "no-cache, no-store")
                .header(header::PRAGMA, "no-cache");
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        builder
            .build()
            .map_err(|e| Error::InvalidInput(format!("invalid request for {}: {}", request.url, e)))
    }
}

#[async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &ProxyRequest, cache: CacheMode) -> Result<ProxyResponse, Error> {
        let start = Instant::now();
        let outbound = self.build(request, cache)?;

        let response = self
            .http
            .execute(outbound)
            .await
            .map_err(|e| Error::Network(format!("{}: {}", request.url, e)))?;

        let status = response.status();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("failed to read response: {}", e)))?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", bytes.len(), self.config.max_bytes)));
        }

        tracing::debug!(
            url = %request.url,
            status = status.as_u16(),
            bytes = bytes.len(),
            fetch_ms = start.elapsed().as_millis() as u64,
            "fetched"
        );

        let mut proxied = ProxyResponse::new(status.as_u16(), headers, bytes);
        proxied.status_text = status.canonical_reason().map(String::from);
        Ok(proxied)
    }
}
