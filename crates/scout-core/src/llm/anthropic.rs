//! Anthropic messages API client

use super::http::{build_client, error_from_response, ApiMetrics, MetricsSnapshot};
use super::retry::with_backoff;
use super::sse::data_events;
use super::{GenerateRequest, LlmProvider, TextStream};
use crate::config::{ResolvedProvider, RetryConfig};
use crate::error::{Result, ScoutError};
use async_trait::async_trait;
use futures::{future, StreamExt};
use serde::{Deserialize, Serialize};

const API_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 1000;
const DEFAULT_STREAM_MAX_TOKENS: u32 = 4096;

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: [UserMessage<'a>; 1],
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Serialize)]
struct UserMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct StreamEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    delta: Option<TextDelta>,
    #[serde(default)]
    error: Option<StreamError>,
}

#[derive(Deserialize)]
struct TextDelta {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct StreamError {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    message: String,
}

/// Client for the Anthropic messages API
pub struct AnthropicClient {
    http_client: reqwest::Client,
    model: String,
    base_url: String,
    api_key: String,
    retry: RetryConfig,
    metrics: ApiMetrics,
}

impl AnthropicClient {
    pub fn new(resolved: &ResolvedProvider) -> Result<Self> {
        Ok(Self {
            http_client: build_client(resolved.timeout)?,
            model: resolved.model.clone(),
            base_url: resolved.base_url.trim_end_matches('/').to_string(),
            api_key: resolved.api_key.clone(),
            retry: resolved.retry,
            metrics: ApiMetrics::default(),
        })
    }

    /// Get current API metrics
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    fn build_request<'a>(&'a self, request: &'a GenerateRequest, stream: bool) -> MessagesRequest<'a> {
        let default_max = if stream {
            DEFAULT_STREAM_MAX_TOKENS
        } else {
            DEFAULT_MAX_TOKENS
        };
        MessagesRequest {
            model: &self.model,
            max_tokens: request.max_tokens.unwrap_or(default_max),
            temperature: request.temperature,
            system: &request.system_prompt,
            messages: [UserMessage {
                role: "user",
                content: &request.user_message,
            }],
            stream,
        }
    }

    async fn send(&self, body: &MessagesRequest<'_>) -> Result<reqwest::Response> {
        let url = format!("{}/v1/messages", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(self.name(), response).await);
        }
        Ok(response)
    }

    async fn message_once(&self, request: &GenerateRequest) -> Result<String> {
        let body = self.build_request(request, false);
        let response = self.send(&body).await?;
        let message: MessagesResponse = response.json().await?;

        let text = message
            .content
            .into_iter()
            .next()
            .ok_or_else(|| ScoutError::Llm("No response from anthropic".to_string()))?
            .text;

        Ok(text.unwrap_or_default())
    }
}

fn parse_event(payload: &str) -> Result<Option<String>> {
    let event: StreamEvent = serde_json::from_str(payload)?;
    match event.kind.as_str() {
        "content_block_delta" => Ok(event
            .delta
            .and_then(|delta| delta.text)
            .filter(|text| !text.is_empty())),
        "error" => {
            let error = event.error.unwrap_or(StreamError {
                kind: String::new(),
                message: "unknown stream error".to_string(),
            });
            let status = match error.kind.as_str() {
                "rate_limit_error" => Some(429),
                "authentication_error" => Some(401),
                "overloaded_error" => Some(529),
                _ => None,
            };
            Err(ScoutError::Provider {
                provider: "anthropic".to_string(),
                status,
                message: format!("{}: {}", error.kind, error.message),
            })
        }
        _ => Ok(None),
    }
}

#[async_trait]
impl LlmProvider for AnthropicClient {
    async fn generate(&self, request: &GenerateRequest) -> Result<String> {
        let started = self.metrics.start();
        let result = with_backoff(self.name(), &self.retry, || self.message_once(request)).await;
        self.metrics.finish(started, &result);

        if let Err(ref e) = result {
            tracing::error!("anthropic API call failed: {}", e);
        }
        result
    }

    async fn stream_generate(&self, request: &GenerateRequest) -> Result<TextStream> {
        let started = self.metrics.start();
        let body = self.build_request(request, true);
        let result = with_backoff(self.name(), &self.retry, || self.send(&body)).await;
        self.metrics.finish(started, &result);

        let response = result?;
        let stream = data_events(self.name().to_string(), response).filter_map(|payload| {
            future::ready(match payload {
                Ok(payload) => parse_event(&payload).transpose(),
                Err(e) => Some(Err(e)),
            })
        });
        Ok(stream.boxed())
    }

    fn name(&self) -> &str {
        "anthropic"
    }
}
