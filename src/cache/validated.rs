//! Memoized identifier validation with time-based expiry.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use tracing::trace;

use super::{CacheError, Database};

/// Default lifetime of a validated identifier
pub const DEFAULT_TTL: Duration = Duration::from_secs(168 * 60 * 60);

/// Key to expiry store for identifiers already proven to exist.
///
/// Entries expire lazily: a lookup that finds a stale entry deletes it and
/// reports it absent. Nothing sweeps the table in the background.
#[derive(Debug, Clone)]
pub struct ValidationCache {
    db: Database,
}

impl ValidationCache {
    pub(super) fn new(db: Database) -> Self {
        Self { db }
    }

    /// Whether `(provider, id)` has a live entry
    pub fn exists(&self, provider: &str, id: &str) -> Result<bool, CacheError> {
        self.exists_at(provider, id, Utc::now())
    }

    /// Record `(provider, id)` as valid for `ttl` from now
    pub fn add(&self, provider: &str, id: &str, ttl: Duration) -> Result<(), CacheError> {
        self.add_at(provider, id, ttl, Utc::now())
    }

    /// `exists` evaluated against an explicit clock
    pub fn exists_at(
        &self,
        provider: &str,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, CacheError> {
        let conn = self.db.lock()?;

        let expires_at: Option<i64> = conn
            .query_row(
                "SELECT expires_at FROM validated_items WHERE provider = ?1 AND id = ?2",
                params![provider, id],
                |row| row.get(0),
            )
            .optional()?;

        let Some(expires_at) = expires_at else {
            return Ok(false);
        };

        if now.timestamp_millis() < expires_at {
            return Ok(true);
        }

        trace!(provider, id, "Removing expired validated item");
        conn.execute(
            "DELETE FROM validated_items WHERE provider = ?1 AND id = ?2",
            params![provider, id],
        )?;

        Ok(false)
    }

    /// `add` evaluated against an explicit clock
    pub fn add_at(
        &self,
        provider: &str,
        id: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<(), CacheError> {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let expires_at = now.timestamp_millis().saturating_add(ttl_ms);

        let conn = self.db.lock()?;
        conn.execute(
            "INSERT INTO validated_items (provider, id, expires_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(provider, id) DO UPDATE SET expires_at = excluded.expires_at",
            params![provider, id, expires_at],
        )?;

        Ok(())
    }

    /// Number of stored entries, live or not
    pub fn len(&self) -> Result<usize, CacheError> {
        let conn = self.db.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM validated_items", [], |r| r.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    pub fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len()? == 0)
    }
}
