//! SQLite-backed durable store for cached responses.
//!
//! Each deployed generation owns one named store; a store maps request
//! identity to the last response written for it. Access is async via
//! tokio-rusqlite. The module provides:
//!
//! - Named stores with idempotent creation and whole-store deletion
//! - Request-identity keys using SHA-256 hashing
//! - Automatic schema migrations
//! - Persisted lifecycle registration and user preferences

pub mod connection;
pub mod entries;
pub mod generations;
pub mod hash;
pub mod migrations;
pub mod preferences;
pub mod registration;

pub use crate::Error;

pub use connection::StoreDb;
pub use entries::{EntryMeta, StoredResponse};
pub use generations::StoreInfo;
pub use registration::SavedRegistration;
