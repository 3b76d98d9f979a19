//! Request-identity key generation.

use sha2::{Digest, Sha256};

/// Compute the store key for a request: method plus URL without fragment.
///
/// The method is upper-cased so `get` and `GET` share a key.
pub fn compute_request_key(method: &str, url: &url::Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);

    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_str().as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_key_stability() {
        let a = compute_request_key("GET", &url("https://example.com/data/books.json"));
        let b = compute_request_key("GET", &url("https://example.com/data/books.json"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_ignores_fragment_and_method_case() {
        let a = compute_request_key("get", &url("https://example.com/index.html#publicacoes"));
        let b = compute_request_key("GET", &url("https://example.com/index.html"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_keeps_query() {
        let a = compute_request_key("GET", &url("https://example.com/data/books.json?v=1"));
        let b = compute_request_key("GET", &url("https://example.com/data/books.json?v=2"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_key_format() {
        let key = compute_request_key("GET", &url("https://example.com/"));
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
