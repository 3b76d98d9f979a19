//! Request classification.

use serde::{Deserialize, Serialize};
use url::Url;

/// Which resolution strategy owns a GET request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Classification {
    /// Same-origin path ending in a data-document suffix; network-first.
    DataDocument,
    /// Any other same-origin request; cache-first.
    ShellOrAsset,
    /// Different origin; never touches the store.
    CrossOrigin,
}

/// Classify a request URL relative to the application origin.
pub fn classify(url: &Url, app_origin: &url::Origin, data_documents: &[String]) -> Classification {
    if &url.origin() != app_origin {
        return Classification::CrossOrigin;
    }

    let path = url.path();
    if data_documents.iter().any(|suffix| path.ends_with(suffix.as_str())) {
        Classification::DataDocument
    } else {
        Classification::ShellOrAsset
    }
}
