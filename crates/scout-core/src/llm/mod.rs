//! LLM integration
//!
//! Provides traits and implementations for:
//! - Embedding generation (hashing trick or a hosted embeddings API)
//! - Chat completion against OpenAI, Anthropic and DeepSeek
//! - Per-provider rate limiting and retry with backoff
//! - A fallback chain that cascades across providers on quota failures

mod anthropic;
mod fallback;
mod hash_embedder;
pub(crate) mod http;
mod http_embedder;
mod openai;
mod provider;
mod rate_limit;
mod retry;
mod sse;
mod traits;

pub use anthropic::AnthropicClient;
pub use fallback::{
    degradation_message, is_degraded, ChunkCallback, Completion, FallbackChain, DEGRADED_MARKER,
};
pub use hash_embedder::{HashEmbedder, HASH_DIMENSIONS};
pub use http::{ApiMetrics, MetricsSnapshot};
pub use http_embedder::{select_embedder, HttpEmbedder};
pub use openai::{ChatMessage, OpenAiClient};
pub use provider::{ProviderClient, ProviderKind};
pub use rate_limit::RateLimiter;
pub use retry::{backoff_delay, with_backoff};
pub use sse::SseDecoder;
pub use traits::*;
