//! Scout Core Library
//!
//! Cost controls for a research assistant that pays per web search and per
//! LLM call.
//!
//! # Features
//! - Two-tier search cache: exact match on normalized query and parameters,
//!   then nearest-neighbour match on query embeddings
//! - Hash-based or hosted embeddings
//! - Sliding-window rate limiting per LLM provider
//! - Fallback chain across OpenAI, Anthropic and DeepSeek with graceful
//!   degradation
//! - A concurrency gate for research pipelines

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod queue;
pub mod search;

pub use cache::{make_key, CacheOptions, CacheStats, SearchCache};
pub use config::{CacheConfig, Config, EmbeddingChoice, LlmConfig, RateLimitConfig};
pub use db::Database;
pub use error::{Error, Result, ScoutError};
pub use llm::{
    select_embedder, Completion, Embedder, FallbackChain, GenerateRequest, HashEmbedder,
    HttpEmbedder, LlmProvider, ProviderKind, RateLimiter,
};
pub use queue::{QueuePermit, ResearchQueue};
pub use search::{
    CachedSearch, SearchDepth, SearchOutcome, SearchProvider, SearchRequest, TavilyClient,
};

/// Default cache directory name
pub const CACHE_DIR_NAME: &str = "scout";

/// Default config directory name
pub const CONFIG_DIR_NAME: &str = "scout";
