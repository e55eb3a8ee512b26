//! LLM trait definitions

use crate::error::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Incrementally delivered text fragments from a provider
pub type TextStream = BoxStream<'static, Result<String>>;

/// Embedding generation trait
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an L2-normalized embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Get model name
    fn model_name(&self) -> &str;

    /// Cosine similarity at or above which two queries count as the same search
    fn recommended_threshold(&self) -> f32 {
        0.85
    }
}

/// Parameters of one generation call
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub system_prompt: String,
    pub user_message: String,
    pub max_tokens: Option<u32>,
    pub temperature: f32,
}

impl GenerateRequest {
    pub fn new(system_prompt: impl Into<String>, user_message: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_message: user_message.into(),
            max_tokens: None,
            temperature: 0.7,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// A single model vendor the fallback chain can call
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a whole response
    async fn generate(&self, request: &GenerateRequest) -> Result<String>;

    /// Open a stream of response fragments
    async fn stream_generate(&self, request: &GenerateRequest) -> Result<TextStream>;

    /// Provider name used in logs and results
    fn name(&self) -> &str;
}
