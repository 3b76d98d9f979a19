//! Data-document loading through the proxy.
//!
//! A page may be served from the site root, from a sub-path, or with a
//! trailing `index.html`. The loader tries the document relative to each
//! plausible base and keeps the first response that is a 2xx JSON body.

use serde_json::Value;
use url::Url;

use biblio_core::{Error, OfflineProxy, ProxyRequest};

use crate::fetch::normalize_trailing_slash;

/// A document and the URL it was finally read from.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedDocument {
    pub url: Url,
    pub body: Value,
}

/// URLs to try for `path` on `page`, in order, without duplicates.
///
/// 1. relative to the page path with one trailing slash removed
/// 2. relative to the full page URL
/// 3. at the origin root
pub fn candidate_urls(page: &Url, path: &str) -> Vec<Url> {
    let relative = format!("./{}", path.trim_start_matches("./").trim_start_matches('/'));
    let mut candidates: Vec<Url> = Vec::with_capacity(3);

    let mut base = page.clone();
    base.set_query(None);
    base.set_fragment(None);
    if let Some(stripped) = page.path().strip_suffix('/') {
        base.set_path(stripped);
    }
    candidates.extend(base.join(&relative).ok());
    candidates.extend(page.join(&relative).ok());
    candidates.extend(page.join(&relative[1..]).ok());

    let mut unique: Vec<Url> = Vec::with_capacity(candidates.len());
    for mut url in candidates {
        url.set_fragment(None);
        let url = normalize_trailing_slash(&url);
        if !unique.contains(&url) {
            unique.push(url);
        }
    }
    unique
}

/// Load a JSON data document, trying each candidate URL through the proxy.
///
/// # Errors
///
/// Returns `Error::CacheMiss` listing every URL tried when none yields a
/// 2xx JSON body.
pub async fn load_document(proxy: &OfflineProxy, page: &Url, path: &str) -> Result<LoadedDocument, Error> {
    let candidates = candidate_urls(page, path);
    let mut tried = Vec::with_capacity(candidates.len());

    for url in candidates {
        tried.push(url.to_string());
        let response = match proxy.fetch(&ProxyRequest::get(url.clone())).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "document candidate failed");
                continue;
            }
        };

        if !response.is_success() {
            tracing::warn!(url = %url, status = response.status, "document candidate failed");
            continue;
        }

        match serde_json::from_slice::<Value>(&response.body) {
            Ok(body) => {
                tracing::debug!(url = %url, source = response.source.as_str(), "document loaded");
                return Ok(LoadedDocument { url, body });
            }
            Err(e) => tracing::warn!(url = %url, error = %e, "document candidate is not JSON"),
        }
    }

    Err(Error::CacheMiss(format!("{path} not available; tried {}", tried.join(", "))))
}
