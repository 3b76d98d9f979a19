//! Resolved proxy configuration.

use url::Url;

use crate::{AppConfig, Error};

/// Proxy settings with every path already resolved against the scope.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Base URL of the application, always ending in `/`.
    pub scope: Url,
    pub version: String,
    pub cache_prefix: String,
    /// Precache manifest, de-duplicated, in declaration order.
    pub manifest: Vec<Url>,
    pub data_documents: Vec<String>,
    pub shell_url: Url,
    pub skip_waiting: bool,
}

impl ProxyConfig {
    /// Build from the application config.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUrl` if the scope or any manifest path
    /// cannot be resolved.
    pub fn from_app(config: &AppConfig) -> Result<Self, Error> {
        let scope = scope_url(&config.scope_url)?;

        let mut manifest: Vec<Url> = Vec::with_capacity(config.precache.len());
        for path in &config.precache {
            let url = resolve(&scope, path)?;
            if !manifest.contains(&url) {
                manifest.push(url);
            }
        }

        let shell_url = resolve(&scope, &config.shell_path)?;

        Ok(Self {
            scope,
            version: config.version.clone(),
            cache_prefix: config.cache_prefix.clone(),
            manifest,
            data_documents: config.data_documents.clone(),
            shell_url,
            skip_waiting: config.skip_waiting,
        })
    }

    /// Name of the store owned by the configured generation.
    pub fn store_name(&self) -> String {
        format!("{}{}", self.cache_prefix, self.version)
    }

    /// Resolve a path relative to the scope.
    pub fn resolve(&self, path: &str) -> Result<Url, Error> {
        resolve(&self.scope, path)
    }
}

/// Parse a scope URL, forcing a trailing slash so relative paths resolve
/// inside it rather than next to it.
pub fn scope_url(input: &str) -> Result<Url, Error> {
    let mut scope = Url::parse(input.trim()).map_err(|e| Error::InvalidUrl(format!("{input}: {e}")))?;
    if !matches!(scope.scheme(), "http" | "https") {
        return Err(Error::InvalidUrl(format!("unsupported scheme: {}", scope.scheme())));
    }
    if !scope.path().ends_with('/') {
        let path = format!("{}/", scope.path());
        scope.set_path(&path);
    }
    scope.set_query(None);
    scope.set_fragment(None);
    Ok(scope)
}

fn resolve(scope: &Url, path: &str) -> Result<Url, Error> {
    let mut url = scope
        .join(path.trim())
        .map_err(|e| Error::InvalidUrl(format!("{path}: {e}")))?;
    url.set_fragment(None);
    Ok(url)
}
