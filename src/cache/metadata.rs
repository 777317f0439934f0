//! JSON blob store keyed by (provider, id).
//!
//! Kept for expensive per-item detail lookups; no search path uses it yet.

use rusqlite::{params, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{CacheError, Database};

#[derive(Debug, Clone)]
pub struct MetadataStore {
    db: Database,
}

impl MetadataStore {
    pub(super) fn new(db: Database) -> Self {
        Self { db }
    }

    /// Store `value` as JSON, replacing any previous blob
    pub fn put<T: Serialize>(&self, provider: &str, id: &str, value: &T) -> Result<(), CacheError> {
        let json = serde_json::to_string(value)?;

        let conn = self.db.lock()?;
        conn.execute(
            "INSERT INTO metadata_items (provider, id, json) VALUES (?1, ?2, ?3)
             ON CONFLICT(provider, id) DO UPDATE SET json = excluded.json",
            params![provider, id, json],
        )?;

        Ok(())
    }

    /// Load and decode a stored blob
    pub fn get<T: DeserializeOwned>(&self, provider: &str, id: &str) -> Result<Option<T>, CacheError> {
        let json: Option<String> = {
            let conn = self.db.lock()?;
            conn.query_row(
                "SELECT json FROM metadata_items WHERE provider = ?1 AND id = ?2",
                params![provider, id],
                |row| row.get(0),
            )
            .optional()?
        };

        json.map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(CacheError::from)
    }
}
