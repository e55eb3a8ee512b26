//! Tavily search API client

use super::{SearchProvider, SearchRequest};
use crate::config::SearchConfig;
use crate::error::{Result, ScoutError};
use crate::llm::http::{build_client, error_from_response};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

#[derive(Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    search_depth: &'static str,
    max_results: u32,
    include_answer: bool,
}

/// Client for the Tavily search endpoint
pub struct TavilyClient {
    http_client: reqwest::Client,
    url: String,
    api_key: String,
}

impl TavilyClient {
    pub fn new(config: &SearchConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ScoutError::Config("tavily API key is not set (TAVILY_API_KEY)".to_string()))?;

        Ok(Self {
            http_client: build_client(Duration::from_secs(config.timeout_secs))?,
            url: config.url.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl SearchProvider for TavilyClient {
    async fn search(&self, request: &SearchRequest) -> Result<serde_json::Value> {
        tracing::info!(
            "Performing web search: {} (depth {}, max {})",
            request.query,
            request.depth,
            request.max_results
        );

        let response = self
            .http_client
            .post(&self.url)
            .json(&TavilyRequest {
                api_key: &self.api_key,
                query: &request.query,
                search_depth: request.depth.as_str(),
                max_results: request.max_results,
                include_answer: request.include_answer,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let err = error_from_response(self.name(), response).await;
            tracing::error!("Web search failed: {}", err);
            return Err(err);
        }

        Ok(response.json().await?)
    }

    fn name(&self) -> &str {
        "tavily"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_api_key() {
        let err = TavilyClient::new(&SearchConfig::default()).err();
        assert!(matches!(err, Some(ScoutError::Config(msg)) if msg.contains("TAVILY_API_KEY")));
    }

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(TavilyRequest {
            api_key: "tvly",
            query: "rust",
            search_depth: "advanced",
            max_results: 3,
            include_answer: true,
        })
        .unwrap();
        assert_eq!(body["search_depth"], "advanced");
        assert_eq!(body["max_results"], 3);
    }
}
