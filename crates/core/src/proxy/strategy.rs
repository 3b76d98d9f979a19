//! Network-first and cache-first resolution.
//!
//! Neither strategy ever fails: every path ends in a stored copy, a fresh
//! network response, or a synthetic fallback.

use super::{CacheMode, OfflineProxy, ProxyRequest, ProxyResponse, ResponseSource};

/// Only whole answers to whole requests are kept; the store key ignores
/// headers, so a fragment would stand in for the full resource.
fn storable(request: &ProxyRequest, response: &ProxyResponse) -> bool {
    response.is_complete() && !request.is_ranged()
}

impl OfflineProxy {
    /// Data documents: freshest copy wins, stored copy when offline, `{}` when
    /// there is nothing at all.
    pub(super) async fn network_first(&self, request: &ProxyRequest, store: &str) -> ProxyResponse {
        match self.network.fetch(request, CacheMode::NoStore).await {
            Ok(response) => {
                if storable(request, &response) {
                    self.store_copy(store, request, &response).await;
                }
                response
            }
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "network unavailable, trying store");
                match self.lookup(store, request).await {
                    Some(hit) => hit,
                    None => ProxyResponse::empty_document(),
                }
            }
        }
    }

    /// Shell and assets: stored copy wins, network fills misses, the shell
    /// document covers offline navigations.
    ///
    /// Ranged requests go to the network first: a stored full body is only
    /// their offline fallback.
    pub(super) async fn cache_first(&self, request: &ProxyRequest, store: &str) -> ProxyResponse {
        if !request.is_ranged() {
            if let Some(hit) = self.lookup(store, request).await {
                return hit;
            }
        }

        match self.network.fetch(request, CacheMode::Default).await {
            Ok(response) => {
                if storable(request, &response) {
                    self.store_copy(store, request, &response).await;
                }
                response
            }
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "network unavailable, no stored copy");
                if request.is_ranged() {
                    if let Some(hit) = self.lookup(store, request).await {
                        return hit;
                    }
                }
                if request.is_navigation() {
                    if let Some(shell) = self.lookup_shell(store).await {
                        return shell;
                    }
                }
                ProxyResponse::offline()
            }
        }
    }

    /// Read failures count as misses.
    async fn lookup(&self, store: &str, request: &ProxyRequest) -> Option<ProxyResponse> {
        match self.db.match_entry(store, &request.identity_key()).await {
            Ok(hit) => hit.map(ProxyResponse::from),
            Err(e) => {
                tracing::warn!(store = %store, url = %request.url, error = %e, "store read failed");
                None
            }
        }
    }

    async fn lookup_shell(&self, store: &str) -> Option<ProxyResponse> {
        let shell = ProxyRequest::get(self.config.shell_url.clone());
        let mut response = self.lookup(store, &shell).await?;
        response.source = ResponseSource::Fallback;
        Some(response)
    }

    /// Write failures are logged and never reach the caller.
    async fn store_copy(&self, store: &str, request: &ProxyRequest, response: &ProxyResponse) {
        if store == self.config.store_name() {
            if let Err(e) = self.db.open_store(store).await {
                tracing::warn!(store = %store, error = %e, "failed to open store");
                return;
            }
        }

        if let Err(e) = self.db.put_entry(store, &response.to_stored(request)).await {
            tracing::warn!(store = %store, url = %request.url, error = %e, "store write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{ScriptedNetwork, proxy_for};
    use super::*;
    use crate::store::StoreDb;
    use url::Url;

    #[tokio::test]
    async fn test_network_first_without_install_creates_store_lazily() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let proxy = proxy_for(db.clone(), ScriptedNetwork::with_site(), "v1");
        let request = ProxyRequest::get(Url::parse("https://biblioteca.example.org/data/books.json").unwrap());

        let response = proxy.network_first(&request, "biblioteca-cache-v1").await;
        assert_eq!(response.source, ResponseSource::Network);
        assert_eq!(db.entry_count("biblioteca-cache-v1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_write_to_missing_foreign_store_is_swallowed() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let proxy = proxy_for(db.clone(), ScriptedNetwork::with_site(), "v1");
        let request = ProxyRequest::get(Url::parse("https://biblioteca.example.org/app.js").unwrap());

        let response = proxy.cache_first(&request, "biblioteca-cache-gone").await;
        assert_eq!(response.status, 200);
        assert!(!db.has_store("biblioteca-cache-gone").await.unwrap());
    }

    #[tokio::test]
    async fn test_fragment_does_not_change_identity() {
        let network = ScriptedNetwork::with_site();
        let proxy = proxy_for(StoreDb::open_in_memory().await.unwrap(), network.clone(), "v1");
        proxy.register().await.unwrap();
        network.set_online(false);

        let request = ProxyRequest::get(Url::parse("https://biblioteca.example.org/app.js#top").unwrap());
        let response = proxy.cache_first(&request, "biblioteca-cache-v1").await;
        assert_eq!(response.source, ResponseSource::Cache);
    }
}
