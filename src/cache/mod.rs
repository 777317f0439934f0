//! Local SQLite store.
//!
//! One database file per process run holds two tables:
//! - `validated_items`: memoized "this identifier is real" facts with expiry
//! - `metadata_items`: opaque JSON blobs per item (currently unused by searches)

pub mod metadata;
pub mod validated;

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;
use thiserror::Error;
use tracing::debug;

pub use metadata::MetadataStore;
pub use validated::ValidationCache;

/// Errors raised by the local store
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Failed opening database {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Failed creating database directory {path}: {source}")]
    Directory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed encoding metadata: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database lock poisoned")]
    Poisoned,
}

/// Handle to the opened database, shared by the cache views
#[derive(Debug, Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database file and ensure the schema exists
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| CacheError::Directory {
                    path: parent.display().to_string(),
                    source,
                })?;
            }
        }

        let conn = Connection::open(path).map_err(|source| CacheError::Open {
            path: path.display().to_string(),
            source,
        })?;
        debug!(path = %path.display(), "Opened database");

        Self::from_connection(conn)
    }

    /// Open a throwaway in-memory database
    pub fn open_in_memory() -> Result<Self, CacheError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, CacheError> {
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// View over the validated-identifier table
    pub fn validation_cache(&self) -> ValidationCache {
        ValidationCache::new(self.clone())
    }

    /// View over the metadata-blob table
    pub fn metadata_store(&self) -> MetadataStore {
        MetadataStore::new(self.clone())
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Connection>, CacheError> {
        self.conn.lock().map_err(|_| CacheError::Poisoned)
    }
}

fn initialize_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS validated_items (
            provider TEXT NOT NULL,
            id TEXT NOT NULL,
            expires_at INTEGER NOT NULL,
            PRIMARY KEY (provider, id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS metadata_items (
            provider TEXT NOT NULL,
            id TEXT NOT NULL,
            json TEXT NOT NULL,
            PRIMARY KEY (provider, id)
        )",
        [],
    )?;

    Ok(())
}
