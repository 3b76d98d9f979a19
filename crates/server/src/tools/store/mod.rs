//! Store-related MCP tools.
//!
//! This module provides tools for inspecting and trimming the durable
//! response store.

pub mod get;
pub mod list;
pub mod purge;

pub use get::{StoreGetParams, get_impl};
pub use list::{StoreListParams, list_impl};
pub use purge::{StorePurgeParams, purge_impl};
