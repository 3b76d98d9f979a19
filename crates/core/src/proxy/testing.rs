//! Scripted network for proxy tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::{CacheMode, Network, OfflineProxy, ProxyConfig, ProxyRequest, ProxyResponse};
use crate::store::StoreDb;
use crate::{AppConfig, Error};

pub(crate) const SITE: &str = "https://biblioteca.example.org/";

/// Answers from a fixed route table; can be switched offline.
pub(crate) struct ScriptedNetwork {
    routes: Mutex<HashMap<String, (u16, String, Vec<u8>)>>,
    online: AtomicBool,
    calls: Mutex<Vec<(String, CacheMode)>>,
}

impl ScriptedNetwork {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self { routes: Mutex::new(HashMap::new()), online: AtomicBool::new(true), calls: Mutex::new(Vec::new()) })
    }

    /// Every file of the default precache manifest, served from [`SITE`].
    pub(crate) fn with_site() -> Arc<Self> {
        let network = Self::new();
        let html = "<html>shell</html>";
        for (path, content_type, body) in [
            ("", "text/html", html),
            ("index.html", "text/html", html),
            ("app.js", "text/javascript", "console.log('app')"),
            ("manifest.json", "application/manifest+json", r#"{"name":"Biblioteca"}"#),
            ("assets/css/tokens.css", "text/css", ":root{}"),
            ("assets/css/theme.css", "text/css", "body{}"),
            ("assets/css/app.css", "text/css", "main{}"),
            ("assets/css/books-detail.css", "text/css", ".book{}"),
            ("assets/img/hero.png", "image/png", "png"),
            ("data/presentation.json", "application/json", r#"{"title":"Biblioteca"}"#),
            ("data/books.json", "application/json", r#"{"books":[]}"#),
        ] {
            network.route(&format!("{SITE}{path}"), 200, content_type, body);
        }
        network
    }

    pub(crate) fn route(&self, url: &str, status: u16, content_type: &str, body: &str) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), (status, content_type.to_string(), body.as_bytes().to_vec()));
    }

    pub(crate) fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub(crate) fn call_count(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|(u, _)| u == url).count()
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn last_cache_mode(&self, url: &str) -> Option<CacheMode> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(u, _)| u == url)
            .map(|(_, mode)| *mode)
    }
}

#[async_trait::async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &ProxyRequest, cache: CacheMode) -> Result<ProxyResponse, Error> {
        self.calls.lock().unwrap().push((request.url.to_string(), cache));

        if !self.online.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("{}: offline", request.url)));
        }

        let mut url = request.url.clone();
        url.set_fragment(None);
        let route = self.routes.lock().unwrap().get(url.as_str()).cloned();
        Ok(match route {
            Some((status, content_type, body)) => {
                ProxyResponse::new(status, vec![("Content-Type".into(), content_type)], body)
            }
            None => ProxyResponse::new(404, vec![], "Not Found"),
        })
    }
}

/// Proxy for [`SITE`] at the given generation, with default settings.
pub(crate) fn proxy_for(db: StoreDb, network: Arc<ScriptedNetwork>, version: &str) -> OfflineProxy {
    let app = AppConfig { scope_url: SITE.into(), version: version.into(), ..Default::default() };
    let config = ProxyConfig::from_app(&app).unwrap();
    OfflineProxy::new(db, network, config)
}
