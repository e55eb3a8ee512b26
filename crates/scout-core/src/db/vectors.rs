//! Semantic tier storage
//!
//! Query embeddings are stored as little-endian f32 BLOBs and compared with
//! cosine similarity in Rust. Every vector carries the model that produced
//! it and lookups only consider vectors from the same model.

use super::Database;
use crate::error::Result;
use rusqlite::params;

/// Metadata row linking a vector to its exact-tier entry
#[derive(Debug, Clone, PartialEq)]
pub struct VectorMeta {
    pub cache_key: String,
    pub query_text: String,
    pub search_depth: String,
    pub max_results: u32,
    pub created_at: f64,
    pub expires_at: f64,
}

/// Nearest-neighbour result
#[derive(Debug, Clone)]
pub struct VectorCandidate {
    pub id: i64,
    pub meta: VectorMeta,
    pub similarity: f32,
}

impl Database {
    /// Store the embedding for a cache key, replacing any earlier vector for it
    pub fn replace_vector(&self, model: &str, embedding: &[f32], meta: &VectorMeta) -> Result<i64> {
        let embedding_bytes = embedding_to_bytes(embedding);

        self.conn.execute("BEGIN IMMEDIATE", [])?;
        let result = (|| -> Result<i64> {
            self.delete_vectors_for_key(&meta.cache_key)?;
            self.conn.execute(
                "INSERT INTO search_vectors (model, embedding) VALUES (?1, ?2)",
                params![model, embedding_bytes],
            )?;
            let id = self.conn.last_insert_rowid();
            self.conn.execute(
                "INSERT INTO search_vector_meta
                    (id, cache_key, query_text, search_depth, max_results, created_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    id,
                    meta.cache_key,
                    meta.query_text,
                    meta.search_depth,
                    meta.max_results,
                    meta.created_at,
                    meta.expires_at,
                ],
            )?;
            Ok(id)
        })();

        if result.is_ok() {
            self.conn.execute("COMMIT", [])?;
        } else {
            let _ = self.conn.execute("ROLLBACK", []);
        }
        result
    }

    /// Delete vectors linked to a cache key. Runs inside the caller's transaction.
    pub(crate) fn delete_vectors_for_key(&self, cache_key: &str) -> Result<usize> {
        let rows = self.conn.execute(
            "DELETE FROM search_vectors WHERE id IN
             (SELECT id FROM search_vector_meta WHERE cache_key = ?1)",
            params![cache_key],
        )?;
        self.conn.execute(
            "DELETE FROM search_vector_meta WHERE cache_key = ?1",
            params![cache_key],
        )?;
        Ok(rows)
    }

    /// Find the `k` stored vectors most similar to `query`.
    ///
    /// Candidates are ordered by decreasing cosine similarity (increasing
    /// distance) and include expired rows and rows for other search
    /// parameters; filtering is left to the caller.
    pub fn nearest_vectors(&self, model: &str, query: &[f32], k: usize) -> Result<Vec<VectorCandidate>> {
        let mut stmt = self.conn.prepare(
            "SELECT v.id, v.embedding, m.cache_key, m.query_text, m.search_depth,
                    m.max_results, m.created_at, m.expires_at
             FROM search_vectors v
             JOIN search_vector_meta m ON m.id = v.id
             WHERE v.model = ?1",
        )?;

        let rows = stmt.query_map(params![model], |row| {
            let bytes: Vec<u8> = row.get(1)?;
            Ok((
                row.get::<_, i64>(0)?,
                bytes,
                VectorMeta {
                    cache_key: row.get(2)?,
                    query_text: row.get(3)?,
                    search_depth: row.get(4)?,
                    max_results: row.get(5)?,
                    created_at: row.get(6)?,
                    expires_at: row.get(7)?,
                },
            ))
        })?;

        let mut candidates = Vec::new();
        for row in rows {
            let (id, bytes, meta) = row?;
            let embedding = bytes_to_embedding(&bytes);
            candidates.push(VectorCandidate {
                id,
                meta,
                similarity: cosine_similarity(query, &embedding),
            });
        }

        candidates.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        candidates.truncate(k);
        Ok(candidates)
    }

    /// Count stored vectors
    pub fn count_vectors(&self) -> Result<usize> {
        if !self.has_vector_tables() {
            return Ok(0);
        }
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM search_vectors", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

/// Convert f32 embedding to bytes (little-endian)
pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Convert bytes to f32 embedding
pub fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Compute cosine similarity between two embeddings
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::CacheEntry;

    fn db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        db.ensure_vector_tables().unwrap();
        db
    }

    fn meta(key: &str, depth: &str) -> VectorMeta {
        VectorMeta {
            cache_key: key.to_string(),
            query_text: key.to_string(),
            search_depth: depth.to_string(),
            max_results: 5,
            created_at: 0.0,
            expires_at: 100.0,
        }
    }

    #[test]
    fn test_embedding_roundtrip() {
        let original = vec![1.0f32, 2.0, 3.0, -1.5];
        let bytes = embedding_to_bytes(&original);
        assert_eq!(bytes_to_embedding(&bytes), original);
    }

    #[test]
    fn test_cosine_similarity_edge_cases() {
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_nearest_orders_by_similarity_and_scopes_model() {
        let db = db();
        db.replace_vector("m", &[1.0, 0.0], &meta("east", "basic")).unwrap();
        db.replace_vector("m", &[0.6, 0.8], &meta("north-east", "basic")).unwrap();
        db.replace_vector("m", &[0.0, 1.0], &meta("north", "advanced")).unwrap();
        db.replace_vector("other", &[1.0, 0.0], &meta("foreign", "basic")).unwrap();

        let found = db.nearest_vectors("m", &[1.0, 0.0], 2).unwrap();
        let keys: Vec<&str> = found.iter().map(|c| c.meta.cache_key.as_str()).collect();
        assert_eq!(keys, vec!["east", "north-east"]);
        assert!(found[0].similarity > found[1].similarity);
    }

    #[test]
    fn test_replace_keeps_one_vector_per_key() {
        let db = db();
        db.replace_vector("m", &[1.0, 0.0], &meta("k", "basic")).unwrap();
        db.replace_vector("m", &[0.0, 1.0], &meta("k", "basic")).unwrap();
        assert_eq!(db.count_vectors().unwrap(), 1);
    }

    #[test]
    fn test_delete_entry_removes_linked_vectors() {
        let db = db();
        db.upsert_entry(&CacheEntry {
            cache_key: "k".to_string(),
            query_text: "k".to_string(),
            search_depth: "basic".to_string(),
            max_results: 5,
            response_json: "{}".to_string(),
            created_at: 0.0,
            expires_at: 100.0,
            hit_count: 0,
        })
        .unwrap();
        db.replace_vector("m", &[1.0, 0.0], &meta("k", "basic")).unwrap();

        assert!(db.delete_entry("k").unwrap());
        assert_eq!(db.count_vectors().unwrap(), 0);
    }

    #[test]
    fn test_delete_expired_sweeps_vectors() {
        let db = db();
        db.replace_vector("m", &[1.0, 0.0], &meta("k", "basic")).unwrap();
        db.delete_expired(100.0).unwrap();
        assert_eq!(db.count_vectors().unwrap(), 0);
    }
}
