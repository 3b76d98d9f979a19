//! Client code for biblio-proxy.
//!
//! This crate provides the reqwest transport the proxy fetches through, and
//! the data-document loader shared by the server's HTTP front and tools.

pub mod documents;
pub mod fetch;

pub use documents::{LoadedDocument, candidate_urls, load_document};
pub use fetch::{FetchClient, FetchConfig, canonicalize};
