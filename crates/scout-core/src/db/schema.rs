//! Database schema and initialization

use crate::error::Result;
use rusqlite::{params, Connection};
use std::path::Path;

/// Main database handle
pub struct Database {
    pub(crate) conn: Connection,
}

const SCHEMA_VERSION: i32 = 1;

const CREATE_TABLES: &str = r#"
-- Exact-match tier: one row per normalized (query, depth, max_results)
CREATE TABLE IF NOT EXISTS search_cache (
    cache_key TEXT PRIMARY KEY,
    query_text TEXT NOT NULL,
    search_depth TEXT NOT NULL,
    max_results INTEGER NOT NULL,
    response_json TEXT NOT NULL,
    created_at REAL NOT NULL,
    expires_at REAL NOT NULL,
    hit_count INTEGER NOT NULL DEFAULT 0
);

-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);

CREATE INDEX IF NOT EXISTS idx_search_cache_expires ON search_cache(expires_at);
"#;

const CREATE_VECTOR_TABLES: &str = r#"
-- Semantic tier: query embeddings
CREATE TABLE IF NOT EXISTS search_vectors (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    model TEXT NOT NULL,
    embedding BLOB NOT NULL
);

-- Semantic tier: 1:1 metadata linking a vector to its exact row
CREATE TABLE IF NOT EXISTS search_vector_meta (
    id INTEGER PRIMARY KEY REFERENCES search_vectors(id) ON DELETE CASCADE,
    cache_key TEXT NOT NULL,
    query_text TEXT NOT NULL,
    search_depth TEXT NOT NULL,
    max_results INTEGER NOT NULL,
    created_at REAL NOT NULL,
    expires_at REAL NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_search_vectors_model ON search_vectors(model);
CREATE INDEX IF NOT EXISTS idx_search_vector_meta_key ON search_vector_meta(cache_key);
CREATE INDEX IF NOT EXISTS idx_search_vector_meta_expires ON search_vector_meta(expires_at);
"#;

impl Database {
    /// Open database at path, creating if necessary
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    /// Open in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Initialize database schema
    pub fn initialize(&self) -> Result<()> {
        // Set PRAGMAs for performance
        self.conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA cache_size = -16000;
             PRAGMA busy_timeout = 5000;",
        )?;

        self.conn.execute_batch(CREATE_TABLES)?;

        self.conn.execute(
            "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
            params![SCHEMA_VERSION],
        )?;

        Ok(())
    }

    /// Create the semantic tier tables if missing
    pub fn ensure_vector_tables(&self) -> Result<()> {
        self.conn.execute_batch(CREATE_VECTOR_TABLES)?;
        Ok(())
    }

    /// Check whether the semantic tier tables exist
    pub fn has_vector_tables(&self) -> bool {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'search_vectors'",
                [],
                |row| row.get::<_, i64>(0),
            )
            .map(|count| count > 0)
            .unwrap_or(false)
    }

    /// Get current schema version
    #[cfg(test)]
    pub fn schema_version(&self) -> Result<Option<i32>> {
        let version = self
            .conn
            .query_row(
                "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .ok();
        Ok(version)
    }
}
