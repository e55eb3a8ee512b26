//! Database layer for scout
//!
//! Provides SQLite-based storage with:
//! - Exact-match search cache rows
//! - Query embeddings for the semantic tier
//! - Expiry sweeps spanning both tiers

mod entries;
mod schema;
mod stats;
pub mod vectors;

pub use entries::CacheEntry;
pub use schema::Database;
pub use stats::StoreStats;
pub use vectors::{
    bytes_to_embedding, cosine_similarity, embedding_to_bytes, VectorCandidate, VectorMeta,
};
use std::path::PathBuf;

impl Database {
    /// Get the default database path
    pub fn default_path() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CACHE_DIR_NAME)
            .join("search_cache.sqlite")
    }
}

/// Current time as fractional epoch seconds
pub fn now_epoch() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
