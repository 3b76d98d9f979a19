//! Cached response CRUD operations.
//!
//! Entries are keyed by `(store, request key)`. Writes are upserts, so the
//! last completed write for a key wins.

use super::connection::StoreDb;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A response held in a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResponse {
    pub key_hash: String,
    pub method: String,
    pub url: String,
    pub status_code: u16,
    pub status_text: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub stored_at: String,
}

/// Entry metadata without the body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct EntryMeta {
    pub key_hash: String,
    pub method: String,
    pub url: String,
    pub status_code: u16,
    pub content_type: Option<String>,
    pub size: u64,
    pub stored_at: String,
}

impl StoredResponse {
    /// Current time in the `stored_at` format.
    pub fn now() -> String {
        chrono::Utc::now().to_rfc3339()
    }

    /// Value of the first header with this name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Metadata view of this entry.
    pub fn meta(&self) -> EntryMeta {
        EntryMeta {
            key_hash: self.key_hash.clone(),
            method: self.method.clone(),
            url: self.url.clone(),
            status_code: self.status_code,
            content_type: self.header("content-type").map(String::from),
            size: self.body.len() as u64,
            stored_at: self.stored_at.clone(),
        }
    }
}

fn insert_entry(conn: &rusqlite::Connection, store: &str, entry: &StoredResponse) -> Result<(), Error> {
    let headers_json =
        serde_json::to_string(&entry.headers).map_err(|e| Error::CorruptEntry(format!("headers: {e}")))?;
    conn.execute(
        "INSERT INTO entries (
            store_name, key_hash, method, url, status_code, status_text,
            headers_json, body, stored_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT(store_name, key_hash) DO UPDATE SET
            method = excluded.method,
            url = excluded.url,
            status_code = excluded.status_code,
            status_text = excluded.status_text,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            store,
            &entry.key_hash,
            &entry.method,
            &entry.url,
            entry.status_code as i64,
            &entry.status_text,
            headers_json,
            &entry.body,
            &entry.stored_at,
        ],
    )?;
    Ok(())
}

fn read_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<(StoredResponse, String)> {
    let headers_json: String = row.get(5)?;
    Ok((
        StoredResponse {
            key_hash: row.get(0)?,
            method: row.get(1)?,
            url: row.get(2)?,
            status_code: row.get::<_, i64>(3)? as u16,
            status_text: row.get(4)?,
            headers: Vec::new(),
            body: row.get(6)?,
            stored_at: row.get(7)?,
        },
        headers_json,
    ))
}

fn decode_headers((mut entry, headers_json): (StoredResponse, String)) -> Result<StoredResponse, Error> {
    entry.headers = serde_json::from_str(&headers_json)
        .map_err(|e| Error::CorruptEntry(format!("{}: headers: {e}", entry.url)))?;
    Ok(entry)
}

impl StoreDb {
    /// Insert or replace one entry. The store must already exist.
    pub async fn put_entry(&self, store: &str, entry: &StoredResponse) -> Result<(), Error> {
        let store = store.to_string();
        let entry = entry.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> { insert_entry(conn, &store, &entry) })
            .await
            .map_err(Error::from)
    }

    /// Insert or replace several entries in one transaction.
    ///
    /// Either every entry lands or none does.
    pub async fn put_entries(&self, store: &str, entries: Vec<StoredResponse>) -> Result<usize, Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<usize, Error> {
                let tx = conn.transaction()?;
                for entry in &entries {
                    insert_entry(&tx, &store, entry)?;
                }
                tx.commit()?;
                Ok(entries.len())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up an entry by request key.
    ///
    /// Returns None if the store or the key doesn't exist.
    pub async fn match_entry(&self, store: &str, key_hash: &str) -> Result<Option<StoredResponse>, Error> {
        let store = store.to_string();
        let key_hash = key_hash.to_string();
        self.conn
            .call(move |conn| -> Result<Option<StoredResponse>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT key_hash, method, url, status_code, status_text, headers_json, body, stored_at
                     FROM entries WHERE store_name = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![store, key_hash], read_entry);

                match result {
                    Ok(raw) => decode_headers(raw).map(Some),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Metadata of every entry in a store, most recently stored first.
    pub async fn list_entries(&self, store: &str) -> Result<Vec<EntryMeta>, Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<EntryMeta>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT key_hash, method, url, status_code, status_text, headers_json, body, stored_at
                     FROM entries WHERE store_name = ?1 ORDER BY stored_at DESC, url ASC",
                )?;
                let rows = stmt
                    .query_map(params![store], read_entry)?
                    .collect::<Result<Vec<_>, _>>()?;
                let entries = rows
                    .into_iter()
                    .map(|raw| decode_headers(raw).map(|entry| entry.meta()))
                    .collect::<Result<Vec<_>, Error>>()?;
                Ok(entries)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in a store.
    pub async fn entry_count(&self, store: &str) -> Result<u64, Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE store_name = ?1", params![store], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete entries whose URL contains `pattern`.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_entries_by_url(&self, store: &str, pattern: &str) -> Result<u64, Error> {
        let store = store.to_string();
        let pattern = format!("%{pattern}%");
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute(
                    "DELETE FROM entries WHERE store_name = ?1 AND url LIKE ?2",
                    params![store, pattern],
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Purge the least recently stored entries until count <= max_entries.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_lru_entries(&self, store: &str, max_entries: usize) -> Result<u64, Error> {
        let store = store.to_string();
        let max = max_entries as i64;
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE store_name = ?1", params![store], |row| {
                        row.get(0)
                    })?;
                if count <= max {
                    return Ok(0);
                }

                let to_delete = count - max;
                let deleted = conn.execute(
                    "DELETE FROM entries WHERE store_name = ?1 AND key_hash IN (
                        SELECT key_hash FROM entries WHERE store_name = ?1
                        ORDER BY stored_at ASC LIMIT ?2
                    )",
                    params![store, to_delete],
                )?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::hash::compute_request_key;

    fn make_entry(url: &str, body: &str, stored_at: &str) -> StoredResponse {
        let parsed = url::Url::parse(url).unwrap();
        StoredResponse {
            key_hash: compute_request_key("GET", &parsed),
            method: "GET".to_string(),
            url: url.to_string(),
            status_code: 200,
            status_text: Some("OK".to_string()),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: body.as_bytes().to_vec(),
            stored_at: stored_at.to_string(),
        }
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let db = StoreDb::open_in_memory().await.unwrap();
        db.open_store("v1").await.unwrap();
        let entry = make_entry("https://example.com/data/books.json", r#"{"books":[]}"#, &StoredResponse::now());

        db.put_entry("v1", &entry).await.unwrap();

        let found = db.match_entry("v1", &entry.key_hash).await.unwrap().unwrap();
        assert_eq!(found, entry);
        assert_eq!(found.header("content-type"), Some("application/json"));
    }

    #[tokio::test]
    async fn test_match_is_scoped_to_store() {
        let db = StoreDb::open_in_memory().await.unwrap();
        db.open_store("v1").await.unwrap();
        db.open_store("v2").await.unwrap();
        let entry = make_entry("https://example.com/app.js", "1", &StoredResponse::now());
        db.put_entry("v1", &entry).await.unwrap();

        assert!(db.match_entry("v2", &entry.key_hash).await.unwrap().is_none());
        assert!(db.match_entry("missing", &entry.key_hash).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_requires_store() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let entry = make_entry("https://example.com/app.js", "1", &StoredResponse::now());
        assert!(db.put_entry("nope", &entry).await.is_err());
    }

    #[tokio::test]
    async fn test_upsert_last_write_wins() {
        let db = StoreDb::open_in_memory().await.unwrap();
        db.open_store("v1").await.unwrap();
        let url = "https://example.com/data/books.json";
        db.put_entry("v1", &make_entry(url, "old", "2025-01-01T00:00:00Z"))
            .await
            .unwrap();
        db.put_entry("v1", &make_entry(url, "new", "2025-01-02T00:00:00Z"))
            .await
            .unwrap();

        assert_eq!(db.entry_count("v1").await.unwrap(), 1);
        let key = compute_request_key("GET", &url::Url::parse(url).unwrap());
        let found = db.match_entry("v1", &key).await.unwrap().unwrap();
        assert_eq!(found.body, b"new");
    }

    #[tokio::test]
    async fn test_put_entries_and_list() {
        let db = StoreDb::open_in_memory().await.unwrap();
        db.open_store("v1").await.unwrap();
        let written = db
            .put_entries(
                "v1",
                vec![
                    make_entry("https://example.com/index.html", "<html>", "2025-01-01T00:00:00Z"),
                    make_entry("https://example.com/app.js", "js", "2025-01-02T00:00:00Z"),
                ],
            )
            .await
            .unwrap();
        assert_eq!(written, 2);

        let listed = db.list_entries("v1").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].url, "https://example.com/app.js");
        assert_eq!(listed[1].size, 6);
        assert_eq!(listed[1].content_type.as_deref(), Some("application/json"));
    }

    #[tokio::test]
    async fn test_delete_store_cascades() {
        let db = StoreDb::open_in_memory().await.unwrap();
        db.open_store("v1").await.unwrap();
        db.put_entry("v1", &make_entry("https://example.com/", "x", &StoredResponse::now()))
            .await
            .unwrap();

        db.delete_store("v1").await.unwrap();
        db.open_store("v1").await.unwrap();
        assert_eq!(db.entry_count("v1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_purge_by_url() {
        let db = StoreDb::open_in_memory().await.unwrap();
        db.open_store("v1").await.unwrap();
        db.put_entry("v1", &make_entry("https://example.com/data/books.json", "b", &StoredResponse::now()))
            .await
            .unwrap();
        db.put_entry("v1", &make_entry("https://example.com/app.js", "a", &StoredResponse::now()))
            .await
            .unwrap();

        let deleted = db.purge_entries_by_url("v1", "/data/").await.unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(db.entry_count("v1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_purge_lru() {
        let db = StoreDb::open_in_memory().await.unwrap();
        db.open_store("v1").await.unwrap();
        db.put_entry("v1", &make_entry("https://example.com/old", "o", "2025-01-01T00:00:00Z"))
            .await
            .unwrap();
        db.put_entry("v1", &make_entry("https://example.com/new", "n", "2025-01-02T00:00:00Z"))
            .await
            .unwrap();

        assert_eq!(db.purge_lru_entries("v1", 5).await.unwrap(), 0);
        assert_eq!(db.purge_lru_entries("v1", 1).await.unwrap(), 1);

        let remaining = db.list_entries("v1").await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].url, "https://example.com/new");
    }
}
