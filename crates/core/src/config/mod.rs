//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (BIBLIO_*)
//! 2. TOML config file (if BIBLIO_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::settings::{Language, Theme};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (BIBLIO_*)
/// 2. TOML config file (if BIBLIO_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite durable store.
    ///
    /// Set via BIBLIO_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Address the local HTTP front listens on.
    ///
    /// Set via BIBLIO_LISTEN_ADDR environment variable.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Base URL of the application. Manifest paths resolve against it and
    /// its origin decides what counts as same-origin.
    ///
    /// Set via BIBLIO_SCOPE_URL environment variable.
    #[serde(default = "default_scope_url")]
    pub scope_url: String,

    /// Generation tag embedded in the store name. Bump on every deploy
    /// that changes a precached file.
    ///
    /// Set via BIBLIO_VERSION environment variable.
    #[serde(default = "default_version")]
    pub version: String,

    /// Prefix shared by every generation's store name.
    ///
    /// Set via BIBLIO_CACHE_PREFIX environment variable.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Paths fetched eagerly at install time, relative to `scope_url`.
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    /// Path suffixes served network-first.
    #[serde(default = "default_data_documents")]
    pub data_documents: Vec<String>,

    /// Shell document served to navigations when offline.
    ///
    /// Set via BIBLIO_SHELL_PATH environment variable.
    #[serde(default = "default_shell_path")]
    pub shell_path: String,

    /// Activate a freshly installed generation without waiting.
    ///
    /// Set via BIBLIO_SKIP_WAITING environment variable.
    #[serde(default = "default_true")]
    pub skip_waiting: bool,

    /// User-Agent string for upstream requests.
    ///
    /// Set via BIBLIO_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Upstream request timeout in milliseconds.
    ///
    /// Set via BIBLIO_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes accepted per upstream response.
    ///
    /// Set via BIBLIO_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Serve the MCP operator tools on stdio.
    ///
    /// Set via BIBLIO_MCP_STDIO environment variable.
    #[serde(default)]
    pub mcp_stdio: bool,

    /// Theme used when neither the page nor a stored preference picks one.
    #[serde(default)]
    pub default_theme: Theme,

    /// Language used when neither the page nor a stored preference picks one.
    #[serde(default)]
    pub default_language: Language,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./biblio-store.sqlite")
}

fn default_listen_addr() -> String {
    "127.0.0.1:8787".into()
}

fn default_scope_url() -> String {
    "http://127.0.0.1:8000/".into()
}

fn default_version() -> String {
    "v202512111201".into()
}

fn default_cache_prefix() -> String {
    "biblioteca-cache-".into()
}

fn default_precache() -> Vec<String> {
    [
        "./",
        "./index.html",
        "./app.js",
        "./manifest.json",
        "./assets/css/tokens.css",
        "./assets/css/theme.css",
        "./assets/css/app.css",
        "./assets/css/books-detail.css",
        "./assets/img/hero.png",
        "./data/presentation.json",
        "./data/books.json",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_data_documents() -> Vec<String> {
    ["/data/presentation.json", "/data/books.json", "/data/faq.json"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_shell_path() -> String {
    "./index.html".into()
}

fn default_true() -> bool {
    true
}

fn default_user_agent() -> String {
    "biblio-proxy/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    20_971_520 // 20MB
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            listen_addr: default_listen_addr(),
            scope_url: default_scope_url(),
            version: default_version(),
            cache_prefix: default_cache_prefix(),
            precache: default_precache(),
            data_documents: default_data_documents(),
            shell_path: default_shell_path(),
            skip_waiting: true,
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            mcp_stdio: false,
            default_theme: Theme::default(),
            default_language: Language::default(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `BIBLIO_`
    /// 2. TOML file from `BIBLIO_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("BIBLIO_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("BIBLIO_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
