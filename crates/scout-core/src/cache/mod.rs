//! Two-tier search result cache
//!
//! The exact tier is keyed on the normalized query plus the search
//! parameters. On an exact miss the semantic tier embeds the query and looks
//! for a stored paraphrase with identical parameters. Semantic-tier failures
//! are logged and treated as misses; exact-tier failures propagate.

use crate::config::CacheConfig;
use crate::db::{self, CacheEntry, Database, VectorMeta};
use crate::error::{Result, ScoutError};
use crate::llm::{select_embedder, Embedder};
use crate::search::SearchDepth;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Threshold reported when no embedder is attached
const DEFAULT_THRESHOLD: f32 = 0.85;

/// Tunables fixed at construction
#[derive(Debug, Clone)]
pub struct CacheOptions {
    pub ttl_hours: u64,
    /// Overrides the embedder's recommended threshold
    pub similarity_threshold: Option<f32>,
    pub top_k: usize,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            ttl_hours: 24,
            similarity_threshold: None,
            top_k: 3,
        }
    }
}

impl From<&CacheConfig> for CacheOptions {
    fn from(config: &CacheConfig) -> Self {
        Self {
            ttl_hours: config.ttl_hours,
            similarity_threshold: config.similarity_threshold,
            top_k: config.top_k,
        }
    }
}

/// Cache statistics. Session counters reset when the cache is reopened.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub total_hits_stored: u64,
    /// Stored query embeddings across all embedder models
    pub vectors: usize,
    pub hits: u64,
    pub semantic_hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub ttl_hours: u64,
    pub semantic_enabled: bool,
    pub similarity_threshold: f32,
}

#[derive(Debug, Default)]
struct SessionCounters {
    hits: AtomicU64,
    semantic_hits: AtomicU64,
    misses: AtomicU64,
}

/// Persistent search cache with an optional semantic tier
pub struct SearchCache {
    db: Mutex<Database>,
    path: PathBuf,
    options: CacheOptions,
    /// Present only when the vector tables were usable at construction
    embedder: Option<Arc<dyn Embedder>>,
    threshold: f32,
    counters: SessionCounters,
}

/// Deterministic exact-tier key for a query and its search parameters
pub fn make_key(query: &str, depth: SearchDepth, max_results: u32) -> String {
    let raw = format!(
        "{}|{}|{}",
        query.trim().to_lowercase(),
        depth.as_str(),
        max_results
    );
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    format!("{:x}", hasher.finalize())
}

impl SearchCache {
    /// Open or create a cache at `path`.
    ///
    /// With an embedder the semantic tier is enabled, unless its tables
    /// cannot be created, in which case the cache runs exact-only.
    pub fn open(
        path: impl AsRef<Path>,
        options: CacheOptions,
        embedder: Option<Arc<dyn Embedder>>,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let db = Database::open(&path)?;
        db.initialize()?;

        let embedder = embedder.and_then(|embedder| match db.ensure_vector_tables() {
            Ok(()) => Some(embedder),
            Err(e) => {
                tracing::warn!("Semantic cache disabled, vector tables unavailable: {}", e);
                None
            }
        });

        let threshold = options.similarity_threshold.unwrap_or_else(|| {
            embedder
                .as_ref()
                .map(|e| e.recommended_threshold())
                .unwrap_or(DEFAULT_THRESHOLD)
        });

        tracing::debug!(
            "Opened search cache at {} (ttl {}h, semantic {}, threshold {:.2})",
            path.display(),
            options.ttl_hours,
            embedder.is_some(),
            threshold
        );

        Ok(Self {
            db: Mutex::new(db),
            path,
            options,
            embedder,
            threshold,
            counters: SessionCounters::default(),
        })
    }

    /// Open the cache described by the configuration, selecting an embedder
    pub async fn from_config(config: &CacheConfig) -> Result<Self> {
        let embedder = select_embedder(config).await;
        Self::open(config.db_path(), CacheOptions::from(config), Some(embedder))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn semantic_enabled(&self) -> bool {
        self.embedder.is_some()
    }

    pub fn similarity_threshold(&self) -> f32 {
        self.threshold
    }

    fn lock(&self) -> Result<MutexGuard<'_, Database>> {
        self.db
            .lock()
            .map_err(|_| ScoutError::Lock("search cache database".to_string()))
    }

    /// Look up a cached response, trying the exact tier then the semantic tier
    pub async fn get(
        &self,
        query: &str,
        depth: SearchDepth,
        max_results: u32,
    ) -> Result<Option<serde_json::Value>> {
        let key = make_key(query, depth, max_results);
        let now = db::now_epoch();

        if let Some(response) = self.exact_lookup(&key, now)? {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            tracing::info!("Cache hit: {}", query);
            return Ok(Some(response));
        }

        if let Some(embedder) = &self.embedder {
            match self.semantic_lookup(embedder.as_ref(), query, depth, max_results).await {
                Ok(Some((response, matched, similarity))) => {
                    self.counters.semantic_hits.fetch_add(1, Ordering::Relaxed);
                    tracing::info!(
                        "Semantic cache hit: '{}' matched '{}' ({:.3})",
                        query,
                        matched,
                        similarity
                    );
                    return Ok(Some(response));
                }
                Ok(None) => {}
                Err(e) => tracing::warn!("Semantic cache lookup failed: {}", e),
            }
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("Cache miss: {}", query);
        Ok(None)
    }

    fn exact_lookup(&self, key: &str, now: f64) -> Result<Option<serde_json::Value>> {
        let db = self.lock()?;
        let Some(entry) = db.get_entry(key)? else {
            return Ok(None);
        };

        if !entry.is_live(now) {
            db.delete_entry(key)?;
            tracing::debug!("Cache entry expired: {}", entry.query_text);
            return Ok(None);
        }

        db.record_hit(key)?;
        Ok(Some(serde_json::from_str(&entry.response_json)?))
    }

    async fn semantic_lookup(
        &self,
        embedder: &dyn Embedder,
        query: &str,
        depth: SearchDepth,
        max_results: u32,
    ) -> Result<Option<(serde_json::Value, String, f32)>> {
        let embedding = embedder.embed(query.trim()).await?;

        // Time is taken after the embedding call, which may be slow.
        let now = db::now_epoch();
        let db = self.lock()?;
        let candidates =
            db.nearest_vectors(embedder.model_name(), &embedding, self.options.top_k)?;

        for candidate in candidates {
            let meta = &candidate.meta;
            if now >= meta.expires_at
                || meta.search_depth != depth.as_str()
                || meta.max_results != max_results
                || candidate.similarity < self.threshold
            {
                continue;
            }

            let Some(entry) = db.get_entry(&meta.cache_key)? else {
                continue;
            };
            if !entry.is_live(now) {
                continue;
            }

            db.record_hit(&entry.cache_key)?;
            let response = serde_json::from_str(&entry.response_json)?;
            return Ok(Some((response, entry.query_text, candidate.similarity)));
        }

        Ok(None)
    }

    /// Store a response in both tiers
    pub async fn put(
        &self,
        query: &str,
        depth: SearchDepth,
        max_results: u32,
        response: &serde_json::Value,
    ) -> Result<()> {
        let now = db::now_epoch();
        let entry = CacheEntry {
            cache_key: make_key(query, depth, max_results),
            query_text: query.trim().to_string(),
            search_depth: depth.as_str().to_string(),
            max_results,
            response_json: serde_json::to_string(response)?,
            created_at: now,
            expires_at: now + self.options.ttl_hours as f64 * SECONDS_PER_HOUR,
            hit_count: 0,
        };

        self.lock()?.upsert_entry(&entry)?;
        tracing::debug!("Cached search result: {}", entry.query_text);

        if let Some(embedder) = &self.embedder {
            if let Err(e) = self.store_vector(embedder.as_ref(), &entry).await {
                tracing::warn!("Failed to store semantic vector for '{}': {}", query, e);
            }
        }
        Ok(())
    }

    async fn store_vector(&self, embedder: &dyn Embedder, entry: &CacheEntry) -> Result<()> {
        let embedding = embedder.embed(&entry.query_text).await?;
        let meta = VectorMeta {
            cache_key: entry.cache_key.clone(),
            query_text: entry.query_text.clone(),
            search_depth: entry.search_depth.clone(),
            max_results: entry.max_results,
            created_at: entry.created_at,
            expires_at: entry.expires_at,
        };
        self.lock()?
            .replace_vector(embedder.model_name(), &embedding, &meta)?;
        Ok(())
    }

    /// Delete expired rows from both tiers, returning the number of entries removed
    pub fn clear_expired(&self) -> Result<usize> {
        let removed = self.lock()?.delete_expired(db::now_epoch())?;
        if removed > 0 {
            tracing::info!("Cleared {} expired cache entries", removed);
        }
        Ok(removed)
    }

    /// Move an entry's expiry instant. Returns false when nothing is cached
    /// for these parameters.
    pub fn set_expires_at(
        &self,
        query: &str,
        depth: SearchDepth,
        max_results: u32,
        expires_at: f64,
    ) -> Result<bool> {
        let key = make_key(query, depth, max_results);
        self.lock()?.set_expires_at(&key, expires_at)
    }

    /// Persisted and session statistics
    pub fn get_stats(&self) -> Result<CacheStats> {
        let store = self.lock()?.get_store_stats()?;

        let hits = self.counters.hits.load(Ordering::Relaxed);
        let semantic_hits = self.counters.semantic_hits.load(Ordering::Relaxed);
        let misses = self.counters.misses.load(Ordering::Relaxed);
        let lookups = hits + semantic_hits + misses;

        Ok(CacheStats {
            entries: store.entries,
            total_hits_stored: store.total_hits_stored,
            vectors: store.vectors,
            hits,
            semantic_hits,
            misses,
            hit_rate: if lookups > 0 {
                (hits + semantic_hits) as f64 / lookups as f64
            } else {
                0.0
            },
            ttl_hours: self.options.ttl_hours,
            semantic_enabled: self.semantic_enabled(),
            similarity_threshold: self.threshold,
        })
    }
}
