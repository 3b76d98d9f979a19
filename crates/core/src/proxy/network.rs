//! Request/response types exchanged with the proxy, and the network seam.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;
use crate::store::StoredResponse;
use crate::store::hash::compute_request_key;

/// How the page issued the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestMode {
    /// Top-level page load.
    Navigate,
    /// Script, stylesheet, image, data fetch.
    #[default]
    Subresource,
}

/// Cache directive passed to the network layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    /// Let intermediaries answer as they normally would.
    Default,
    /// Force a round trip to the origin, bypassing intermediate caches.
    NoStore,
}

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Network,
    Cache,
    Fallback,
}

impl ResponseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseSource::Network => "network",
            ResponseSource::Cache => "cache",
            ResponseSource::Fallback => "fallback",
        }
    }
}

/// An outbound request observed by the proxy.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub method: String,
    pub url: Url,
    pub mode: RequestMode,
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
}

impl ProxyRequest {
    /// A subresource GET.
    pub fn get(url: Url) -> Self {
        Self { method: "GET".into(), url, mode: RequestMode::Subresource, headers: Vec::new(), body: None }
    }

    /// A page navigation.
    pub fn navigate(url: Url) -> Self {
        Self { mode: RequestMode::Navigate, ..Self::get(url) }
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    /// Carries a `Range` header, so the answer may be a fragment.
    pub fn is_ranged(&self) -> bool {
        self.headers.iter().any(|(k, _)| k.eq_ignore_ascii_case("range"))
    }

    /// Store key for this request.
    pub fn identity_key(&self) -> String {
        compute_request_key(&self.method, &self.url)
    }
}

/// A response handed back to the page.
///
/// The body is reference-counted: cloning it for the store leaves the
/// caller's copy fully readable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyResponse {
    pub status: u16,
    pub status_text: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub source: ResponseSource,
}

impl ProxyResponse {
    /// A network response.
    pub fn new(status: u16, headers: Vec<(String, String)>, body: impl Into<Bytes>) -> Self {
        Self { status, status_text: None, headers, body: body.into(), source: ResponseSource::Network }
    }

    /// 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 2xx with the whole representation; `206 Partial Content` does not count.
    pub fn is_complete(&self) -> bool {
        self.is_success() && self.status != 206
    }

    /// Value of the first header with this name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Empty-but-valid JSON document served when a data document is
    /// neither reachable nor cached.
    pub fn empty_document() -> Self {
        Self {
            status: 200,
            status_text: Some("OK".into()),
            headers: vec![("Content-Type".into(), "application/json".into())],
            body: Bytes::from_static(b"{}"),
            source: ResponseSource::Fallback,
        }
    }

    /// Distinguishable failure for assets with no cache and no network.
    pub fn offline() -> Self {
        Self {
            status: 503,
            status_text: Some("Offline".into()),
            headers: vec![("Content-Type".into(), "text/plain; charset=utf-8".into())],
            body: Bytes::from_static(b"Offline"),
            source: ResponseSource::Fallback,
        }
    }

    /// Copy for the store. The body bytes are copied out, so the caller's
    /// `Bytes` stays fully readable.
    pub fn to_stored(&self, request: &ProxyRequest) -> StoredResponse {
        let mut url = request.url.clone();
        url.set_fragment(None);
        StoredResponse {
            key_hash: request.identity_key(),
            method: request.method.to_ascii_uppercase(),
            url: url.to_string(),
            status_code: self.status,
            status_text: self.status_text.clone(),
            headers: self.headers.clone(),
            body: self.body.to_vec(),
            stored_at: StoredResponse::now(),
        }
    }
}

impl From<StoredResponse> for ProxyResponse {
    fn from(stored: StoredResponse) -> Self {
        Self {
            status: stored.status_code,
            status_text: stored.status_text,
            headers: stored.headers,
            body: Bytes::from(stored.body),
            source: ResponseSource::Cache,
        }
    }
}

/// The network as seen by the proxy.
///
/// `Err` means the network itself failed (offline, DNS, connect, timeout).
/// HTTP error statuses come back as `Ok` responses.
#[async_trait::async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &ProxyRequest, cache: CacheMode) -> Result<ProxyResponse, Error>;
}
