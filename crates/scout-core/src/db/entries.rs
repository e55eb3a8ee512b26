//! Exact-match tier storage

use super::Database;
use crate::error::Result;
use rusqlite::{params, OptionalExtension, Row};

/// One cached search response
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub cache_key: String,
    pub query_text: String,
    pub search_depth: String,
    pub max_results: u32,
    /// Provider response, stored verbatim as JSON text
    pub response_json: String,
    /// Epoch seconds
    pub created_at: f64,
    /// Epoch seconds
    pub expires_at: f64,
    pub hit_count: u64,
}

impl CacheEntry {
    /// A row is live strictly before its expiry instant
    pub fn is_live(&self, now: f64) -> bool {
        now < self.expires_at
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            cache_key: row.get(0)?,
            query_text: row.get(1)?,
            search_depth: row.get(2)?,
            max_results: row.get(3)?,
            response_json: row.get(4)?,
            created_at: row.get(5)?,
            expires_at: row.get(6)?,
            hit_count: row.get::<_, i64>(7)? as u64,
        })
    }
}

impl Database {
    /// Get an entry by key, live or not
    pub fn get_entry(&self, cache_key: &str) -> Result<Option<CacheEntry>> {
        let entry = self
            .conn
            .query_row(
                "SELECT cache_key, query_text, search_depth, max_results, response_json,
                        created_at, expires_at, hit_count
                 FROM search_cache WHERE cache_key = ?1",
                params![cache_key],
                CacheEntry::from_row,
            )
            .optional()?;
        Ok(entry)
    }

    /// Insert or replace an entry. The hit count starts over at zero.
    pub fn upsert_entry(&self, entry: &CacheEntry) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO search_cache
                (cache_key, query_text, search_depth, max_results, response_json,
                 created_at, expires_at, hit_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0)",
            params![
                entry.cache_key,
                entry.query_text,
                entry.search_depth,
                entry.max_results,
                entry.response_json,
                entry.created_at,
                entry.expires_at,
            ],
        )?;
        Ok(())
    }

    /// Increment the persisted hit counter
    pub fn record_hit(&self, cache_key: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE search_cache SET hit_count = hit_count + 1 WHERE cache_key = ?1",
            params![cache_key],
        )?;
        Ok(())
    }

    /// Move an entry's expiry instant. Returns false when the key is unknown.
    pub fn set_expires_at(&self, cache_key: &str, expires_at: f64) -> Result<bool> {
        let rows = self.conn.execute(
            "UPDATE search_cache SET expires_at = ?2 WHERE cache_key = ?1",
            params![cache_key, expires_at],
        )?;
        if rows > 0 && self.has_vector_tables() {
            self.conn.execute(
                "UPDATE search_vector_meta SET expires_at = ?2 WHERE cache_key = ?1",
                params![cache_key, expires_at],
            )?;
        }
        Ok(rows > 0)
    }

    /// Delete an entry and any vectors linked to it
    pub fn delete_entry(&self, cache_key: &str) -> Result<bool> {
        let with_vectors = self.has_vector_tables();

        self.conn.execute("BEGIN IMMEDIATE", [])?;
        let result = (|| -> Result<bool> {
            if with_vectors {
                self.delete_vectors_for_key(cache_key)?;
            }
            let rows = self.conn.execute(
                "DELETE FROM search_cache WHERE cache_key = ?1",
                params![cache_key],
            )?;
            Ok(rows > 0)
        })();

        if result.is_ok() {
            self.conn.execute("COMMIT", [])?;
        } else {
            let _ = self.conn.execute("ROLLBACK", []);
        }
        result
    }

    /// Sweep every entry expired at `now` from both tiers.
    ///
    /// Returns the number of exact-tier rows removed.
    pub fn delete_expired(&self, now: f64) -> Result<usize> {
        let with_vectors = self.has_vector_tables();

        self.conn.execute("BEGIN IMMEDIATE", [])?;
        let result = (|| -> Result<usize> {
            if with_vectors {
                self.conn.execute(
                    "DELETE FROM search_vectors WHERE id IN
                     (SELECT id FROM search_vector_meta WHERE expires_at <= ?1)",
                    params![now],
                )?;
                self.conn.execute(
                    "DELETE FROM search_vector_meta WHERE expires_at <= ?1",
                    params![now],
                )?;
            }
            let rows = self.conn.execute(
                "DELETE FROM search_cache WHERE expires_at <= ?1",
                params![now],
            )?;
            Ok(rows)
        })();

        if result.is_ok() {
            self.conn.execute("COMMIT", [])?;
        } else {
            let _ = self.conn.execute("ROLLBACK", []);
        }
        result
    }
}
