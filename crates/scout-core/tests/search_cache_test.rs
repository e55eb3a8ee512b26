//! Integration tests for the two-tier search cache

use async_trait::async_trait;
use scout_core::db::now_epoch;
use scout_core::llm::HashEmbedder;
use scout_core::{
    CacheOptions, CachedSearch, Embedder, Result, ScoutError, SearchCache, SearchDepth,
    SearchProvider, SearchRequest,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

fn options(ttl_hours: u64) -> CacheOptions {
    CacheOptions {
        ttl_hours,
        ..CacheOptions::default()
    }
}

fn exact_cache(dir: &TempDir) -> SearchCache {
    SearchCache::open(dir.path().join("cache.sqlite"), options(24), None).unwrap()
}

fn semantic_cache(dir: &TempDir) -> SearchCache {
    SearchCache::open(
        dir.path().join("cache.sqlite"),
        options(24),
        Some(Arc::new(HashEmbedder::default())),
    )
    .unwrap()
}

fn response(tag: &str) -> serde_json::Value {
    json!({
        "query": tag,
        "answer": format!("answer for {}", tag),
        "results": [{"title": tag, "url": "https://example.com", "content": "...", "score": 0.7}]
    })
}

/// Embeds like the hash embedder but reports a different model
struct RenamedEmbedder(HashEmbedder);

#[async_trait]
impl Embedder for RenamedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.0.embed_sync(text))
    }

    fn dimensions(&self) -> usize {
        self.0.dimensions()
    }

    fn model_name(&self) -> &str {
        "renamed"
    }

    fn recommended_threshold(&self) -> f32 {
        0.20
    }
}

struct BrokenEmbedder;

#[async_trait]
impl Embedder for BrokenEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(ScoutError::Embedding("backend offline".to_string()))
    }

    fn dimensions(&self) -> usize {
        8
    }

    fn model_name(&self) -> &str {
        "broken"
    }
}

#[tokio::test]
async fn test_round_trip() {
    let dir = TempDir::new().unwrap();
    let cache = exact_cache(&dir);

    assert!(cache.get("rust async", SearchDepth::Basic, 5).await.unwrap().is_none());

    cache
        .put("rust async", SearchDepth::Basic, 5, &response("rust"))
        .await
        .unwrap();
    let cached = cache.get("rust async", SearchDepth::Basic, 5).await.unwrap();
    assert_eq!(cached, Some(response("rust")));
}

#[tokio::test]
async fn test_parameters_isolate_entries() {
    let dir = TempDir::new().unwrap();
    let cache = exact_cache(&dir);

    cache
        .put("rust async", SearchDepth::Basic, 5, &response("basic-5"))
        .await
        .unwrap();

    assert!(cache.get("rust async", SearchDepth::Advanced, 5).await.unwrap().is_none());
    assert!(cache.get("rust async", SearchDepth::Basic, 10).await.unwrap().is_none());

    cache
        .put("rust async", SearchDepth::Advanced, 5, &response("advanced-5"))
        .await
        .unwrap();
    assert_eq!(
        cache.get("rust async", SearchDepth::Basic, 5).await.unwrap(),
        Some(response("basic-5"))
    );
    assert_eq!(
        cache.get("rust async", SearchDepth::Advanced, 5).await.unwrap(),
        Some(response("advanced-5"))
    );
}

#[tokio::test]
async fn test_case_and_whitespace_insensitive() {
    let dir = TempDir::new().unwrap();
    let cache = exact_cache(&dir);

    cache
        .put("Rust Async", SearchDepth::Basic, 5, &response("rust"))
        .await
        .unwrap();
    let cached = cache.get("  rust async\n", SearchDepth::Basic, 5).await.unwrap();
    assert_eq!(cached, Some(response("rust")));
}

#[tokio::test]
async fn test_zero_ttl_is_expired_immediately() {
    let dir = TempDir::new().unwrap();
    let cache = SearchCache::open(dir.path().join("cache.sqlite"), options(0), None).unwrap();

    cache.put("a", SearchDepth::Basic, 5, &response("a")).await.unwrap();
    cache.put("b", SearchDepth::Basic, 5, &response("b")).await.unwrap();

    assert_eq!(cache.clear_expired().unwrap(), 2);
    assert_eq!(cache.clear_expired().unwrap(), 0);
    assert_eq!(cache.get_stats().unwrap().entries, 0);
}

#[tokio::test]
async fn test_expired_entry_is_lazily_deleted() {
    let dir = TempDir::new().unwrap();
    let cache = exact_cache(&dir);

    cache.put("old", SearchDepth::Basic, 5, &response("old")).await.unwrap();
    cache.put("new", SearchDepth::Basic, 5, &response("new")).await.unwrap();
    assert!(cache
        .set_expires_at("old", SearchDepth::Basic, 5, now_epoch() - 1.0)
        .unwrap());

    assert!(cache.get("old", SearchDepth::Basic, 5).await.unwrap().is_none());
    assert_eq!(cache.get_stats().unwrap().entries, 1);
    assert_eq!(cache.clear_expired().unwrap(), 0);
}

#[tokio::test]
async fn test_clear_expired_counts_backdated_rows() {
    let dir = TempDir::new().unwrap();
    let cache = semantic_cache(&dir);

    for query in ["one", "two", "three"] {
        cache.put(query, SearchDepth::Basic, 5, &response(query)).await.unwrap();
    }
    let past = now_epoch() - 3600.0;
    cache.set_expires_at("one", SearchDepth::Basic, 5, past).unwrap();
    cache.set_expires_at("two", SearchDepth::Basic, 5, past).unwrap();

    assert_eq!(cache.clear_expired().unwrap(), 2);
    let stats = cache.get_stats().unwrap();
    assert_eq!(stats.entries, 1);
    assert_eq!(stats.vectors, 1);
    assert!(cache.get("three", SearchDepth::Basic, 5).await.unwrap().is_some());
}

#[tokio::test]
async fn test_semantic_hit_for_paraphrase() {
    let dir = TempDir::new().unwrap();
    let cache = semantic_cache(&dir);

    cache
        .put("quantum computing basics", SearchDepth::Basic, 5, &response("quantum"))
        .await
        .unwrap();

    let hit = cache
        .get("introduction to quantum computing", SearchDepth::Basic, 5)
        .await
        .unwrap();
    assert_eq!(hit, Some(response("quantum")));

    let stats = cache.get_stats().unwrap();
    assert_eq!(stats.hits, 0);
    assert_eq!(stats.semantic_hits, 1);
    assert_eq!(stats.total_hits_stored, 1);
    assert_eq!(stats.vectors, 1);
}

#[tokio::test]
async fn test_no_semantic_hit_for_unrelated_query() {
    let dir = TempDir::new().unwrap();
    let cache = semantic_cache(&dir);

    cache
        .put("quantum computing basics", SearchDepth::Basic, 5, &response("quantum"))
        .await
        .unwrap();

    let miss = cache
        .get("best chocolate cake recipe", SearchDepth::Basic, 5)
        .await
        .unwrap();
    assert!(miss.is_none());
    assert_eq!(cache.get_stats().unwrap().misses, 1);
}

#[tokio::test]
async fn test_semantic_match_respects_parameters() {
    let dir = TempDir::new().unwrap();
    let cache = semantic_cache(&dir);

    cache
        .put("quantum computing basics", SearchDepth::Basic, 5, &response("quantum"))
        .await
        .unwrap();

    let paraphrase = "introduction to quantum computing";
    assert!(cache.get(paraphrase, SearchDepth::Advanced, 5).await.unwrap().is_none());
    assert!(cache.get(paraphrase, SearchDepth::Basic, 3).await.unwrap().is_none());
    assert!(cache.get(paraphrase, SearchDepth::Basic, 5).await.unwrap().is_some());
}

#[tokio::test]
async fn test_semantic_tier_ignores_expired_rows() {
    let dir = TempDir::new().unwrap();
    let cache = semantic_cache(&dir);

    cache
        .put("quantum computing basics", SearchDepth::Basic, 5, &response("quantum"))
        .await
        .unwrap();
    cache
        .set_expires_at("quantum computing basics", SearchDepth::Basic, 5, now_epoch() - 1.0)
        .unwrap();

    let result = cache
        .get("introduction to quantum computing", SearchDepth::Basic, 5)
        .await
        .unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn test_exact_only_cache_has_no_semantic_tier() {
    let dir = TempDir::new().unwrap();
    let cache = exact_cache(&dir);

    cache
        .put("quantum computing basics", SearchDepth::Basic, 5, &response("quantum"))
        .await
        .unwrap();
    let result = cache
        .get("introduction to quantum computing", SearchDepth::Basic, 5)
        .await
        .unwrap();
    assert!(result.is_none());

    let stats = cache.get_stats().unwrap();
    assert!(!stats.semantic_enabled);
    assert_eq!(stats.similarity_threshold, 0.85);
    assert_eq!(stats.vectors, 0);
}

#[tokio::test]
async fn test_vectors_are_scoped_to_embedder_model() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cache.sqlite");

    let hashed = SearchCache::open(&path, options(24), Some(Arc::new(HashEmbedder::default()))).unwrap();
    hashed
        .put("quantum computing basics", SearchDepth::Basic, 5, &response("quantum"))
        .await
        .unwrap();
    drop(hashed);

    let renamed = SearchCache::open(
        &path,
        options(24),
        Some(Arc::new(RenamedEmbedder(HashEmbedder::default()))),
    )
    .unwrap();
    let result = renamed
        .get("introduction to quantum computing", SearchDepth::Basic, 5)
        .await
        .unwrap();
    assert!(result.is_none());

    // The exact tier is shared regardless of embedder
    assert!(renamed
        .get("quantum computing basics", SearchDepth::Basic, 5)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_embedder_failures_are_swallowed() {
    let dir = TempDir::new().unwrap();
    let cache = SearchCache::open(
        dir.path().join("cache.sqlite"),
        options(24),
        Some(Arc::new(BrokenEmbedder)),
    )
    .unwrap();

    cache
        .put("rust async", SearchDepth::Basic, 5, &response("rust"))
        .await
        .unwrap();
    assert!(cache.get("rust async", SearchDepth::Basic, 5).await.unwrap().is_some());
    assert!(cache.get("tokio runtime", SearchDepth::Basic, 5).await.unwrap().is_none());
}

#[tokio::test]
async fn test_threshold_override() {
    let dir = TempDir::new().unwrap();
    let cache = SearchCache::open(
        dir.path().join("cache.sqlite"),
        CacheOptions {
            similarity_threshold: Some(0.95),
            ..CacheOptions::default()
        },
        Some(Arc::new(HashEmbedder::default())),
    )
    .unwrap();

    cache
        .put("quantum computing basics", SearchDepth::Basic, 5, &response("quantum"))
        .await
        .unwrap();
    let result = cache
        .get("introduction to quantum computing", SearchDepth::Basic, 5)
        .await
        .unwrap();
    assert!(result.is_none());
    assert_eq!(cache.get_stats().unwrap().similarity_threshold, 0.95);
}

#[tokio::test]
async fn test_stats_and_persistence() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cache.sqlite");

    {
        let cache = semantic_cache(&dir);
        cache.put("rust async", SearchDepth::Basic, 5, &response("rust")).await.unwrap();
        cache.get("rust async", SearchDepth::Basic, 5).await.unwrap();
        cache.get("rust async", SearchDepth::Basic, 5).await.unwrap();
        cache.get("go channels", SearchDepth::Basic, 5).await.unwrap();

        let stats = cache.get_stats().unwrap();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(stats.ttl_hours, 24);
        assert!(stats.semantic_enabled);
        assert_eq!(stats.similarity_threshold, 0.20);
    }

    let reopened = SearchCache::open(&path, options(24), None).unwrap();
    let stats = reopened.get_stats().unwrap();
    assert_eq!(stats.entries, 1);
    assert_eq!(stats.total_hits_stored, 2);
    assert_eq!(stats.hits, 0);
    assert_eq!(stats.hit_rate, 0.0);
}

#[tokio::test]
async fn test_reput_resets_hits_and_replaces_payload() {
    let dir = TempDir::new().unwrap();
    let cache = semantic_cache(&dir);

    cache.put("rust", SearchDepth::Basic, 5, &response("v1")).await.unwrap();
    cache.get("rust", SearchDepth::Basic, 5).await.unwrap();
    cache.put("rust", SearchDepth::Basic, 5, &response("v2")).await.unwrap();

    assert_eq!(cache.get_stats().unwrap().total_hits_stored, 0);
    assert_eq!(
        cache.get("rust", SearchDepth::Basic, 5).await.unwrap(),
        Some(response("v2"))
    );
}

struct CountingProvider {
    calls: AtomicUsize,
}

#[async_trait]
impl SearchProvider for CountingProvider {
    async fn search(&self, request: &SearchRequest) -> Result<serde_json::Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(response(&request.query))
    }

    fn name(&self) -> &str {
        "counting"
    }
}

#[tokio::test]
async fn test_cached_search_pays_once() {
    let dir = TempDir::new().unwrap();
    let cache = Arc::new(semantic_cache(&dir));
    let search = CachedSearch::new(
        Arc::clone(&cache),
        CountingProvider {
            calls: AtomicUsize::new(0),
        },
    );

    let request = SearchRequest::new("quantum computing basics");
    let first = search.search(&request).await.unwrap();
    assert!(!first.from_cache);

    let second = search.search(&request).await.unwrap();
    assert!(second.from_cache);
    assert_eq!(second.response, first.response);

    let paraphrase = search
        .search(&SearchRequest::new("introduction to quantum computing"))
        .await
        .unwrap();
    assert!(paraphrase.from_cache);

    let other = search
        .search(&SearchRequest::new("quantum computing basics").with_depth(SearchDepth::Advanced))
        .await
        .unwrap();
    assert!(!other.from_cache);
    assert_eq!(search.provider().calls.load(Ordering::SeqCst), 2);
}
