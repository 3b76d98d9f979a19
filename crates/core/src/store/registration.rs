//! Persisted lifecycle registration.
//!
//! Records which generation is active and which one is installed and
//! waiting, so a restarted proxy resumes serving without reinstalling.

use super::connection::StoreDb;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Lifecycle record for one scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedRegistration {
    pub scope: String,
    pub active_store: Option<String>,
    pub waiting_store: Option<String>,
    pub updated_at: String,
}

impl StoreDb {
    /// Load the registration for a scope.
    pub async fn load_registration(&self, scope: &str) -> Result<Option<SavedRegistration>, Error> {
        let scope = scope.to_string();
        self.conn
            .call(move |conn| -> Result<Option<SavedRegistration>, Error> {
                let result = conn.query_row(
                    "SELECT scope, active_store, waiting_store, updated_at FROM registration WHERE scope = ?1",
                    params![scope],
                    |row| {
                        Ok(SavedRegistration {
                            scope: row.get(0)?,
                            active_store: row.get(1)?,
                            waiting_store: row.get(2)?,
                            updated_at: row.get(3)?,
                        })
                    },
                );

                match result {
                    Ok(saved) => Ok(Some(saved)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or replace the registration for a scope.
    pub async fn save_registration(
        &self, scope: &str, active_store: Option<&str>, waiting_store: Option<&str>,
    ) -> Result<(), Error> {
        let scope = scope.to_string();
        let active_store = active_store.map(String::from);
        let waiting_store = waiting_store.map(String::from);
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO registration (scope, active_store, waiting_store, updated_at)
                    VALUES (?1, ?2, ?3, ?4)
                    ON CONFLICT(scope) DO UPDATE SET
                        active_store = excluded.active_store,
                        waiting_store = excluded.waiting_store,
                        updated_at = excluded.updated_at",
                    params![scope, active_store, waiting_store, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}
