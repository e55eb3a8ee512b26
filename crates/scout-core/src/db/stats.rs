//! Database statistics

use super::Database;
use crate::error::Result;

/// Persisted cache counters
#[derive(Debug, Clone, serde::Serialize)]
pub struct StoreStats {
    pub entries: usize,
    pub total_hits_stored: u64,
    pub vectors: usize,
}

impl Database {
    /// Get database statistics
    pub fn get_store_stats(&self) -> Result<StoreStats> {
        let (entries, total_hits): (i64, i64) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(hit_count), 0) FROM search_cache",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(StoreStats {
            entries: entries as usize,
            total_hits_stored: total_hits as u64,
            vectors: self.count_vectors()?,
        })
    }
}
