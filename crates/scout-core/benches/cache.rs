//! Cache performance benchmarks
//!
//! Measures performance of:
//! - Hash embedding of search queries
//! - Exact-tier key lookup
//! - Nearest-neighbour scan over stored query vectors

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use scout_core::db::{now_epoch, CacheEntry, VectorMeta};
use scout_core::{make_key, Database, HashEmbedder, SearchDepth};
use tempfile::TempDir;

const SAMPLE_QUERIES: &[&str] = &[
    "quantum computing basics",
    "rust async programming tutorial",
    "latest advances in renewable energy",
    "best chocolate cake recipe",
    "history of the roman empire",
    "how do vaccines train the immune system",
    "kubernetes networking explained",
    "climate change effects on coral reefs",
    "introduction to category theory",
    "sourdough starter troubleshooting",
];

fn setup_test_db(copies: usize) -> (Database, TempDir) {
    let temp = TempDir::new().unwrap();
    let db = Database::open(temp.path().join("cache_bench.sqlite")).unwrap();
    db.initialize().unwrap();
    db.ensure_vector_tables().unwrap();

    let embedder = HashEmbedder::default();
    let now = now_epoch();

    for copy in 0..copies {
        for query in SAMPLE_QUERIES {
            let query = format!("{} {}", query, copy);
            let key = make_key(&query, SearchDepth::Basic, 5);
            db.upsert_entry(&CacheEntry {
                cache_key: key.clone(),
                query_text: query.clone(),
                search_depth: "basic".to_string(),
                max_results: 5,
                response_json: r#"{"results":[]}"#.to_string(),
                created_at: now,
                expires_at: now + 86_400.0,
                hit_count: 0,
            })
            .unwrap();
            db.replace_vector(
                "hash-ngram-sha256",
                &embedder.embed_sync(&query),
                &VectorMeta {
                    cache_key: key,
                    query_text: query,
                    search_depth: "basic".to_string(),
                    max_results: 5,
                    created_at: now,
                    expires_at: now + 86_400.0,
                },
            )
            .unwrap();
        }
    }

    (db, temp)
}

fn bench_hash_embedding(c: &mut Criterion) {
    let embedder = HashEmbedder::default();

    c.bench_function("hash_embed_query", |b| {
        b.iter(|| embedder.embed_sync(black_box("introduction to quantum computing for beginners")))
    });
}

fn bench_exact_lookup(c: &mut Criterion) {
    let (db, _temp) = setup_test_db(10);
    let key = make_key("quantum computing basics 3", SearchDepth::Basic, 5);

    c.bench_function("exact_lookup", |b| {
        b.iter(|| db.get_entry(black_box(&key)).unwrap())
    });
}

fn bench_nearest_vectors(c: &mut Criterion) {
    let mut group = c.benchmark_group("nearest_vectors");
    let embedder = HashEmbedder::default();
    let query = embedder.embed_sync("introduction to quantum computing");

    for copies in [1, 10, 100] {
        let (db, _temp) = setup_test_db(copies);
        group.bench_with_input(
            BenchmarkId::from_parameter(copies * SAMPLE_QUERIES.len()),
            &query,
            |b, query| {
                b.iter(|| {
                    db.nearest_vectors("hash-ngram-sha256", black_box(query), 3)
                        .unwrap()
                })
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_hash_embedding,
    bench_exact_lookup,
    bench_nearest_vectors
);
criterion_main!(benches);
