//! Offline cache proxy.
//!
//! Sits between the page and the network. Every same-origin GET is answered
//! by one of two strategies against the durable store of the serving
//! generation:
//!
//! - data documents: network-first, falling back to the stored copy and
//!   then to an empty `{}` document
//! - shell and assets: cache-first, falling back to the network and then to
//!   the shell document (navigations) or `503 Offline`
//!
//! Non-GET and cross-origin requests are not intercepted.
//!
//! Generations move through `uninstalled → installing → installed →
//! activating → active` (see [`lifecycle`]); installing precaches the
//! manifest into a fresh store, activating deletes every other store.

pub mod classify;
pub mod config;
mod generation;
pub mod lifecycle;
pub mod network;
mod strategy;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, watch};

use crate::Error;
use crate::store::{StoreDb, StoreInfo};

pub use classify::{Classification, classify};
pub use config::ProxyConfig;
pub use generation::{ActivationReport, RegisterOutcome};
pub use lifecycle::{LifecyclePhase, Registration};
pub use network::{CacheMode, Network, ProxyRequest, ProxyResponse, RequestMode, ResponseSource};

/// What the proxy decided to do with a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intercept {
    /// The proxy answered.
    Respond(ProxyResponse),
    /// Not the proxy's business; send it straight to the network.
    Passthrough,
}

/// Operator-facing snapshot of the proxy.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ProxyStatus {
    pub scope: String,
    pub version: String,
    pub phase: LifecyclePhase,
    pub active_store: Option<String>,
    pub waiting_store: Option<String>,
    pub serving_store: String,
    pub stores: Vec<StoreInfo>,
}

/// The offline cache proxy for one scope.
pub struct OfflineProxy {
    db: StoreDb,
    network: Arc<dyn Network>,
    config: ProxyConfig,
    origin: url::Origin,
    registration: RwLock<Registration>,
    controller: watch::Sender<Option<String>>,
}

impl OfflineProxy {
    /// Create a proxy in the `uninstalled` phase.
    pub fn new(db: StoreDb, network: Arc<dyn Network>, config: ProxyConfig) -> Self {
        let origin = config.scope.origin();
        let (controller, _) = watch::channel(None);
        Self { db, network, config, origin, registration: RwLock::new(Registration::default()), controller }
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    pub fn db(&self) -> &StoreDb {
        &self.db
    }

    /// Current lifecycle phase.
    pub async fn phase(&self) -> LifecyclePhase {
        self.registration.read().await.phase
    }

    /// Store that answers requests right now: the active generation's, or
    /// the configured generation's when nothing has activated yet.
    pub async fn serving_store(&self) -> String {
        self.registration
            .read()
            .await
            .active_store
            .clone()
            .unwrap_or_else(|| self.config.store_name())
    }

    /// Observe which store controls the pages. Updated on every activation.
    pub fn subscribe_controller(&self) -> watch::Receiver<Option<String>> {
        self.controller.subscribe()
    }

    /// Decide how to answer a request.
    pub async fn handle(&self, request: &ProxyRequest) -> Intercept {
        if !request.is_get() {
            tracing::debug!(method = %request.method, url = %request.url, "not intercepted: non-GET");
            return Intercept::Passthrough;
        }

        let class = classify(&request.url, &self.origin, &self.config.data_documents);
        let store = self.serving_store().await;

        let response = match class {
            Classification::CrossOrigin => {
                tracing::debug!(url = %request.url, "not intercepted: cross-origin");
                return Intercept::Passthrough;
            }
            Classification::DataDocument => self.network_first(request, &store).await,
            Classification::ShellOrAsset => self.cache_first(request, &store).await,
        };

        tracing::debug!(
            url = %request.url,
            class = ?class,
            status = response.status,
            source = response.source.as_str(),
            "resolved"
        );
        Intercept::Respond(response)
    }

    /// Resolve a request end to end, going to the network for anything the
    /// proxy does not intercept.
    ///
    /// Intercepted requests never fail; passthrough requests surface network
    /// errors unchanged.
    pub async fn fetch(&self, request: &ProxyRequest) -> Result<ProxyResponse, Error> {
        match self.handle(request).await {
            Intercept::Respond(response) => Ok(response),
            Intercept::Passthrough => self.passthrough(request).await,
        }
    }

    /// Send a request the proxy does not intercept straight to the network.
    /// The store is neither read nor written.
    pub async fn passthrough(&self, request: &ProxyRequest) -> Result<ProxyResponse, Error> {
        self.network.fetch(request, CacheMode::Default).await
    }

    /// Snapshot for operators.
    pub async fn status(&self) -> Result<ProxyStatus, Error> {
        let registration = self.registration.read().await.clone();
        let stores = self.db.list_stores().await?;
        let serving_store = registration
            .active_store
            .clone()
            .unwrap_or_else(|| self.config.store_name());

        Ok(ProxyStatus {
            scope: self.config.scope.to_string(),
            version: self.config.version.clone(),
            phase: registration.phase,
            active_store: registration.active_store,
            waiting_store: registration.waiting_store,
            serving_store,
            stores,
        })
    }
}
