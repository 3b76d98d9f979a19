//! Core types and shared functionality for biblio-proxy.
//!
//! This crate provides:
//! - Durable response store with SQLite backend
//! - Offline cache proxy with generation lifecycle
//! - User settings and audio playback state
//! - Unified error types
//! - Configuration structures

pub mod config;
pub mod error;
pub mod playback;
pub mod proxy;
pub mod settings;
pub mod store;

pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use playback::{PlaybackController, PlaybackState};
pub use proxy::{Intercept, OfflineProxy, ProxyConfig, ProxyRequest, ProxyResponse, ProxyStatus};
pub use settings::{Language, Settings, SettingsManager, Theme};
pub use store::StoreDb;
