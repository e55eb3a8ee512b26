//! Hosted embedder using an OpenAI-compatible embeddings endpoint

use super::hash_embedder::HashEmbedder;
use super::http::{build_client, error_from_response, ApiMetrics, MetricsSnapshot};
use super::Embedder;
use crate::config::{CacheConfig, EmbeddingChoice};
use crate::error::{Result, ScoutError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_EMBEDDING_URL: &str = "https://api.openai.com";
const EMBEDDING_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Deserialize)]
struct EmbedData {
    embedding: Vec<f32>,
}

/// Embedder backed by a hosted embeddings API
pub struct HttpEmbedder {
    http_client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
    dimensions: usize,
    metrics: ApiMetrics,
}

impl HttpEmbedder {
    pub fn new(api_key: impl Into<String>, url: Option<&str>, model: impl Into<String>) -> Result<Self> {
        let model = model.into();
        Ok(Self {
            http_client: build_client(EMBEDDING_TIMEOUT)?,
            url: url
                .unwrap_or(DEFAULT_EMBEDDING_URL)
                .trim_end_matches('/')
                .to_string(),
            api_key: api_key.into(),
            dimensions: model_dimensions(&model),
            model,
            metrics: ApiMetrics::default(),
        })
    }

    /// Create from the cache configuration, `None` when no key is configured
    pub fn from_config(config: &CacheConfig) -> Result<Option<Self>> {
        match config.embedding_api_key.as_deref() {
            Some(key) if !key.is_empty() => Ok(Some(Self::new(
                key,
                config.embedding_url.as_deref(),
                config.embedding_model.clone(),
            )?)),
            _ => Ok(None),
        }
    }

    /// Get current API metrics
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    async fn request_embedding(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/v1/embeddings", self.url);
        let response = self
            .http_client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&EmbedRequest {
                model: &self.model,
                input: text.trim(),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response("embeddings", response).await);
        }

        let body: EmbedResponse = response.json().await?;
        let mut embedding = body
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| ScoutError::Embedding("No embedding returned".to_string()))?;

        let norm = embedding.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            embedding.iter_mut().for_each(|v| *v /= norm);
        }
        Ok(embedding)
    }
}

fn model_dimensions(model: &str) -> usize {
    match model {
        "text-embedding-3-large" => 3072,
        _ => 1536,
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let started = self.metrics.start();
        let result = self.request_embedding(text).await;
        self.metrics.finish(started, &result);
        result
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Pick the embedder for the semantic tier.
///
/// Never fails: any problem with the hosted embedder falls back to hashing.
pub async fn select_embedder(config: &CacheConfig) -> Arc<dyn Embedder> {
    if config.embedding == EmbeddingChoice::Hash {
        tracing::info!("Using hash-based embeddings ({} dims)", super::HASH_DIMENSIONS);
        return Arc::new(HashEmbedder::default());
    }

    let hosted = match HttpEmbedder::from_config(config) {
        Ok(Some(embedder)) => Some(embedder),
        Ok(None) => None,
        Err(e) => {
            tracing::warn!("Hosted embeddings unavailable, falling back to hash: {}", e);
            None
        }
    };

    if let Some(embedder) = hosted {
        match config.embedding {
            EmbeddingChoice::Hosted => {
                tracing::info!("Using hosted embeddings ({})", embedder.model_name());
                return Arc::new(embedder);
            }
            _ => match embedder.embed("test").await {
                Ok(_) => {
                    tracing::info!("Using hosted embeddings ({}, auto-detected)", embedder.model_name());
                    return Arc::new(embedder);
                }
                Err(e) => {
                    tracing::warn!("Hosted embeddings unavailable, falling back to hash: {}", e)
                }
            },
        }
    }

    tracing::info!("Using hash-based embeddings ({} dims)", super::HASH_DIMENSIONS);
    Arc::new(HashEmbedder::default())
}
