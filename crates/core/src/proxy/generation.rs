//! Installing, activating and restoring generations.

use futures_util::future::try_join_all;
use serde::{Deserialize, Serialize};

use super::{CacheMode, LifecyclePhase, OfflineProxy, ProxyRequest};
use crate::Error;
use crate::store::StoredResponse;

/// Result of an activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ActivationReport {
    /// Store now serving requests.
    pub active: String,
    /// Stores removed by garbage collection.
    pub deleted: Vec<String>,
}

/// What [`OfflineProxy::register`] ended up doing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RegisterOutcome {
    /// The configured generation already serves requests.
    AlreadyActive,
    /// Installed and waiting to take over.
    Installed { store: String },
    /// Installed (or found waiting) and activated.
    Activated(ActivationReport),
}

impl OfflineProxy {
    /// Resume from the persisted registration.
    ///
    /// Stores that no longer exist are forgotten. Returns the phase the
    /// proxy resumed in.
    pub async fn restore(&self) -> Result<LifecyclePhase, Error> {
        let Some(saved) = self.db.load_registration(self.config.scope.as_str()).await? else {
            return Ok(self.phase().await);
        };

        let active = match saved.active_store {
            Some(name) if self.db.has_store(&name).await? => Some(name),
            _ => None,
        };
        let waiting = match saved.waiting_store {
            Some(name) if self.db.has_store(&name).await? => Some(name),
            _ => None,
        };

        let mut registration = self.registration.write().await;
        registration.phase = if waiting.is_some() {
            LifecyclePhase::Installed
        } else if active.is_some() {
            LifecyclePhase::Active
        } else {
            LifecyclePhase::Uninstalled
        };
        registration.active_store = active;
        registration.waiting_store = waiting;

        if let Some(active) = &registration.active_store {
            self.controller.send_replace(Some(active.clone()));
        }

        tracing::info!(
            phase = %registration.phase,
            active = ?registration.active_store,
            waiting = ?registration.waiting_store,
            "restored registration"
        );
        Ok(registration.phase)
    }

    /// Bring the configured generation into service.
    ///
    /// Installs it unless it is already installed and waiting, then
    /// activates it right away when `skip_waiting` is set.
    pub async fn register(&self) -> Result<RegisterOutcome, Error> {
        let store = self.config.store_name();
        let registration = self.registration.read().await.clone();

        if registration.phase == LifecyclePhase::Active && registration.active_store.as_deref() == Some(store.as_str()) {
            tracing::debug!(store = %store, "generation already active");
            return Ok(RegisterOutcome::AlreadyActive);
        }

        let waiting = registration.waiting_store.as_deref() == Some(store.as_str()) && self.db.has_store(&store).await?;
        if !waiting {
            self.install().await?;
        }

        if self.config.skip_waiting {
            Ok(RegisterOutcome::Activated(self.activate().await?))
        } else {
            Ok(RegisterOutcome::Installed { store })
        }
    }

    /// Precache the manifest into the configured generation's store.
    ///
    /// All-or-nothing: a single failed manifest entry leaves the store
    /// untouched and the proxy in the phase it was in before.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidTransition` if an install is already running
    /// - `Error::InstallFailed` if any manifest entry could not be fetched or stored
    pub async fn install(&self) -> Result<String, Error> {
        let store = self.config.store_name();
        let previous = self.registration.write().await.transition(LifecyclePhase::Installing)?;
        tracing::info!(store = %store, urls = self.config.manifest.len(), "installing generation");

        match self.precache(&store).await {
            Ok(count) => {
                let (active, waiting) = {
                    let mut registration = self.registration.write().await;
                    registration.waiting_store = Some(store.clone());
                    registration.transition(LifecyclePhase::Installed)?;
                    (registration.active_store.clone(), registration.waiting_store.clone())
                };
                self.persist(active.as_deref(), waiting.as_deref()).await;
                tracing::info!(store = %store, entries = count, "generation installed");
                Ok(store)
            }
            Err(e) => {
                self.registration.write().await.transition(previous)?;
                tracing::error!(store = %store, error = %e, "install failed");
                Err(Error::InstallFailed { version: self.config.version.clone(), reason: e.to_string() })
            }
        }
    }

    /// Fetch every manifest URL, then write them all in one transaction.
    async fn precache(&self, store: &str) -> Result<usize, Error> {
        let requests: Vec<ProxyRequest> = self.config.manifest.iter().cloned().map(ProxyRequest::get).collect();

        let entries: Vec<StoredResponse> = try_join_all(requests.iter().map(|request| async move {
            let response = self.network.fetch(request, CacheMode::Default).await?;
            if !response.is_success() {
                return Err(Error::HttpError(format!("{} returned {}", request.url, response.status)));
            }
            Ok(response.to_stored(request))
        }))
        .await?;

        let created = self.db.open_store(store).await?;
        match self.db.put_entries(store, entries).await {
            Ok(count) => Ok(count),
            Err(e) => {
                if created {
                    if let Err(cleanup) = self.db.delete_store(store).await {
                        tracing::warn!(store = %store, error = %cleanup, "failed to drop partial store");
                    }
                }
                Err(e)
            }
        }
    }

    /// Promote the waiting generation and delete every other store.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidTransition` if nothing is installed and waiting.
    pub async fn activate(&self) -> Result<ActivationReport, Error> {
        let store = {
            let mut registration = self.registration.write().await;
            let Some(waiting) = registration.waiting_store.clone() else {
                return Err(Error::InvalidTransition {
                    from: registration.phase.to_string(),
                    to: LifecyclePhase::Activating.to_string(),
                });
            };
            registration.transition(LifecyclePhase::Activating)?;
            waiting
        };

        let names = match self.db.store_names().await {
            Ok(names) => names,
            Err(e) => {
                tracing::warn!(error = %e, "failed to list stores for cleanup");
                Vec::new()
            }
        };

        let mut deleted = Vec::new();
        for name in names.into_iter().filter(|name| *name != store) {
            match self.db.delete_store(&name).await {
                Ok(true) => deleted.push(name),
                Ok(false) => {}
                Err(e) => tracing::warn!(store = %name, error = %e, "failed to delete stale store"),
            }
        }

        {
            let mut registration = self.registration.write().await;
            registration.active_store = Some(store.clone());
            registration.waiting_store = None;
            registration.transition(LifecyclePhase::Active)?;
        }
        self.persist(Some(&store), None).await;
        self.controller.send_replace(Some(store.clone()));

        tracing::info!(store = %store, deleted = deleted.len(), "generation activated");
        Ok(ActivationReport { active: store, deleted })
    }

    async fn persist(&self, active: Option<&str>, waiting: Option<&str>) {
        if let Err(e) = self.db.save_registration(self.config.scope.as_str(), active, waiting).await {
            tracing::warn!(error = %e, "failed to persist registration");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{ScriptedNetwork, proxy_for};
    use super::*;
    use crate::store::StoreDb;

    #[tokio::test]
    async fn test_register_installs_and_activates() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let proxy = proxy_for(db.clone(), ScriptedNetwork::with_site(), "v1");

        let outcome = proxy.register().await.unwrap();
        assert_eq!(
            outcome,
            RegisterOutcome::Activated(ActivationReport { active: "biblioteca-cache-v1".into(), deleted: vec![] })
        );
        assert_eq!(proxy.phase().await, LifecyclePhase::Active);
        assert_eq!(db.entry_count("biblioteca-cache-v1").await.unwrap(), 11);
    }

    #[tokio::test]
    async fn test_repeated_install_keeps_one_store() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let proxy = proxy_for(db.clone(), ScriptedNetwork::with_site(), "v1");

        proxy.install().await.unwrap();
        proxy.install().await.unwrap();
        assert_eq!(db.store_names().await.unwrap(), vec!["biblioteca-cache-v1".to_string()]);
        assert_eq!(db.entry_count("biblioteca-cache-v1").await.unwrap(), 11);
        assert_eq!(proxy.phase().await, LifecyclePhase::Installed);
    }

    #[tokio::test]
    async fn test_install_failure_keeps_previous_generation() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let network = ScriptedNetwork::with_site();
        proxy_for(db.clone(), network.clone(), "v1").register().await.unwrap();

        network.route("https://biblioteca.example.org/assets/img/hero.png", 404, "text/plain", "gone");
        let v2 = proxy_for(db.clone(), network, "v2");
        v2.restore().await.unwrap();

        let err = v2.register().await.unwrap_err();
        assert!(matches!(err, Error::InstallFailed { ref version, .. } if version == "v2"));
        assert_eq!(v2.phase().await, LifecyclePhase::Active);
        assert_eq!(v2.serving_store().await, "biblioteca-cache-v1");
        assert_eq!(db.store_names().await.unwrap(), vec!["biblioteca-cache-v1".to_string()]);
    }

    #[tokio::test]
    async fn test_install_failure_without_prior_generation() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let network = ScriptedNetwork::with_site();
        network.set_online(false);
        let proxy = proxy_for(db.clone(), network, "v1");

        assert!(proxy.register().await.is_err());
        assert_eq!(proxy.phase().await, LifecyclePhase::Uninstalled);
        assert!(!db.has_store("biblioteca-cache-v1").await.unwrap());
    }

    #[tokio::test]
    async fn test_activation_removes_unrelated_stores() {
        let db = StoreDb::open_in_memory().await.unwrap();
        db.open_store("biblioteca-cache-v0").await.unwrap();
        db.open_store("something-else").await.unwrap();
        let proxy = proxy_for(db.clone(), ScriptedNetwork::with_site(), "v1");

        let RegisterOutcome::Activated(report) = proxy.register().await.unwrap() else {
            panic!("expected activation");
        };
        assert_eq!(report.deleted.len(), 2);
        assert_eq!(db.store_names().await.unwrap(), vec!["biblioteca-cache-v1".to_string()]);
    }

    #[tokio::test]
    async fn test_restore_then_register_is_noop() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let network = ScriptedNetwork::with_site();
        proxy_for(db.clone(), network.clone(), "v1").register().await.unwrap();
        let calls = network.total_calls();

        let restarted = proxy_for(db, network.clone(), "v1");
        assert_eq!(restarted.restore().await.unwrap(), LifecyclePhase::Active);
        assert_eq!(restarted.register().await.unwrap(), RegisterOutcome::AlreadyActive);
        assert_eq!(network.total_calls(), calls);
    }

    #[tokio::test]
    async fn test_without_skip_waiting_generation_waits() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let network = ScriptedNetwork::with_site();
        proxy_for(db.clone(), network.clone(), "v1").register().await.unwrap();

        let mut v2 = proxy_for(db.clone(), network.clone(), "v2");
        v2.config.skip_waiting = false;
        v2.restore().await.unwrap();

        let outcome = v2.register().await.unwrap();
        assert_eq!(outcome, RegisterOutcome::Installed { store: "biblioteca-cache-v2".into() });
        assert_eq!(v2.phase().await, LifecyclePhase::Installed);
        assert_eq!(v2.serving_store().await, "biblioteca-cache-v1");
        assert_eq!(db.store_names().await.unwrap().len(), 2);

        let report = v2.activate().await.unwrap();
        assert_eq!(report.active, "biblioteca-cache-v2");
        assert_eq!(report.deleted, vec!["biblioteca-cache-v1".to_string()]);
        assert_eq!(v2.serving_store().await, "biblioteca-cache-v2");
    }

    #[tokio::test]
    async fn test_restore_resumes_waiting_generation() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let network = ScriptedNetwork::with_site();
        let mut first = proxy_for(db.clone(), network.clone(), "v1");
        first.config.skip_waiting = false;
        first.register().await.unwrap();

        let restarted = proxy_for(db, network, "v1");
        assert_eq!(restarted.restore().await.unwrap(), LifecyclePhase::Installed);
        assert!(matches!(restarted.register().await.unwrap(), RegisterOutcome::Activated(_)));
    }

    #[tokio::test]
    async fn test_activate_without_waiting_generation() {
        let proxy = proxy_for(StoreDb::open_in_memory().await.unwrap(), ScriptedNetwork::with_site(), "v1");
        assert!(matches!(proxy.activate().await, Err(Error::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn test_controller_follows_activation() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let network = ScriptedNetwork::with_site();
        let proxy = proxy_for(db, network, "v1");
        let mut controller = proxy.subscribe_controller();
        assert_eq!(*controller.borrow(), None);

        proxy.register().await.unwrap();
        controller.changed().await.unwrap();
        assert_eq!(controller.borrow().as_deref(), Some("biblioteca-cache-v1"));
    }
}
