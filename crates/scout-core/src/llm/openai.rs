//! OpenAI-compatible chat completion client (OpenAI, DeepSeek)

use super::http::{build_client, error_from_response, ApiMetrics, MetricsSnapshot};
use super::retry::with_backoff;
use super::sse::data_events;
use super::{GenerateRequest, LlmProvider, TextStream};
use crate::config::{ResolvedProvider, RetryConfig};
use crate::error::{Result, ScoutError};
use async_trait::async_trait;
use futures::{future, Stream, StreamExt};
use serde::{Deserialize, Serialize};

/// Chat message for completion requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<StreamError>,
}

/// Error object sent in place of a delta once a stream has started
#[derive(Deserialize)]
struct StreamError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

impl StreamError {
    fn into_error(self, provider: &str) -> ScoutError {
        let code = self
            .code
            .as_ref()
            .and_then(|c| c.as_str())
            .map(str::to_string);
        let quota = [code.as_deref(), self.kind.as_deref()]
            .into_iter()
            .flatten()
            .any(|c| matches!(c, "rate_limit_exceeded" | "insufficient_quota"));

        ScoutError::Provider {
            provider: provider.to_string(),
            // Without a known code the message is left to quota classification
            status: quota.then_some(429),
            message: match code {
                Some(code) => format!("{}: {}", code, self.message),
                None => self.message,
            },
        }
    }
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Deserialize, Default)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Client for any endpoint speaking the OpenAI chat completions protocol
pub struct OpenAiClient {
    http_client: reqwest::Client,
    provider: String,
    model: String,
    base_url: String,
    api_key: String,
    retry: RetryConfig,
    metrics: ApiMetrics,
}

impl OpenAiClient {
    /// Create new client from a resolved provider configuration
    pub fn new(resolved: &ResolvedProvider) -> Result<Self> {
        Ok(Self {
            http_client: build_client(resolved.timeout)?,
            provider: resolved.kind.to_string(),
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

    fn build_request<'a>(&'a self, request: &GenerateRequest, stream: bool) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage::system(request.system_prompt.clone()),
                ChatMessage::user(request.user_message.clone()),
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream,
        }
    }

    async fn send(&self, body: &ChatRequest<'_>) -> Result<reqwest::Response> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(&self.provider, response).await);
        }
        Ok(response)
    }

    async fn chat_once(&self, request: &GenerateRequest) -> Result<String> {
        let body = self.build_request(request, false);
        let response = self.send(&body).await?;
        let chat: ChatResponse = response.json().await?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ScoutError::Llm(format!("No response from {}", self.provider)))?
            .message
            .content;

        Ok(content.unwrap_or_default())
    }
}

fn parse_delta(provider: &str, payload: &str) -> Result<Option<String>> {
    let chunk: StreamChunk = serde_json::from_str(payload)?;
    if let Some(error) = chunk.error {
        return Err(error.into_error(provider));
    }
    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|text| !text.is_empty()))
}

/// Turn `data:` payloads into text fragments, surfacing in-band errors
fn deltas<S>(provider: String, payloads: S) -> TextStream
where
    S: Stream<Item = Result<String>> + Send + 'static,
{
    payloads
        .filter_map(move |payload| {
            future::ready(match payload {
                Ok(payload) => parse_delta(&provider, &payload).transpose(),
                Err(e) => Some(Err(e)),
            })
        })
        .boxed()
}

#[async_trait]
impl LlmProvider for OpenAiClient {
    async fn generate(&self, request: &GenerateRequest) -> Result<String> {
        let started = self.metrics.start();
        let result = with_backoff(&self.provider, &self.retry, || self.chat_once(request)).await;
        self.metrics.finish(started, &result);

        if let Err(ref e) = result {
            tracing::error!("{} API call failed: {}", self.provider, e);
        }
        result
    }

    async fn stream_generate(&self, request: &GenerateRequest) -> Result<TextStream> {
        let started = self.metrics.start();
        let body = self.build_request(request, true);
        let result = with_backoff(&self.provider, &self.retry, || self.send(&body)).await;
        self.metrics.finish(started, &result);

        let response = result?;
        Ok(deltas(
            self.provider.clone(),
            data_events(self.provider.clone(), response),
        ))
    }

    fn name(&self) -> &str {
        &self.provider
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RateLimitConfig;
    use crate::llm::{FallbackChain, ProviderKind};
    use std::sync::Arc;
    use std::time::Duration;

    fn resolved(kind: ProviderKind) -> ResolvedProvider {
        ResolvedProvider {
            kind,
            api_key: "sk-test".to_string(),
            model: kind.default_model().to_string(),
            base_url: format!("{}/", kind.default_base_url()),
            rate_limit: RateLimitConfig::default(),
            timeout: Duration::from_secs(5),
            retry: RetryConfig::default(),
        }
    }

    #[test]
    fn test_request_body_shape() {
        let client = OpenAiClient::new(&resolved(ProviderKind::DeepSeek)).unwrap();
        let request = GenerateRequest::new("be brief", "hello").with_max_tokens(64);

        let body = serde_json::to_value(client.build_request(&request, false)).unwrap();
        assert_eq!(body["model"], "deepseek-chat");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hello");
        assert_eq!(body["max_tokens"], 64);
        assert!(body.get("stream").is_none());

        let streaming = serde_json::to_value(client.build_request(&request, true)).unwrap();
        assert_eq!(streaming["stream"], true);
    }

    #[test]
    fn test_base_url_is_normalized() {
        let client = OpenAiClient::new(&resolved(ProviderKind::OpenAi)).unwrap();
        assert_eq!(client.base_url, "https://api.openai.com");
        assert_eq!(client.name(), "openai");
    }

    #[test]
    fn test_parse_delta() {
        let payload = r#"{"choices":[{"delta":{"content":"Hel"}}]}"#;
        assert_eq!(parse_delta("openai", payload).unwrap(), Some("Hel".to_string()));

        let role_only = r#"{"choices":[{"delta":{"role":"assistant"}}]}"#;
        assert_eq!(parse_delta("openai", role_only).unwrap(), None);

        assert!(parse_delta("openai", "not json").is_err());
    }

    #[test]
    fn test_in_band_errors_are_typed() {
        let rate_limited = r#"{"error":{"message":"Rate limit reached for requests","code":"rate_limit_exceeded"}}"#;
        let err = parse_delta("openai", rate_limited).unwrap_err();
        assert!(matches!(
            err,
            ScoutError::Provider {
                status: Some(429),
                ..
            }
        ));
        assert!(err.is_quota_class());

        let billing = r#"{"error":{"message":"Insufficient Balance","code":null}}"#;
        let err = parse_delta("deepseek", billing).unwrap_err();
        assert!(matches!(err, ScoutError::Provider { status: None, .. }));
        assert!(err.is_quota_class());

        let invalid = r#"{"error":{"message":"bad prompt","type":"invalid_request_error","code":400}}"#;
        assert!(!parse_delta("openai", invalid).unwrap_err().is_quota_class());
    }

    /// Streams a fixed list of raw SSE payloads through the delta decoder
    struct ScriptedStream {
        name: &'static str,
        payloads: Vec<&'static str>,
    }

    #[async_trait]
    impl LlmProvider for ScriptedStream {
        async fn generate(&self, _request: &GenerateRequest) -> Result<String> {
            Err(ScoutError::Llm("streaming only".to_string()))
        }

        async fn stream_generate(&self, _request: &GenerateRequest) -> Result<TextStream> {
            let payloads: Vec<Result<String>> =
                self.payloads.iter().map(|p| Ok(p.to_string())).collect();
            Ok(deltas(self.name.to_string(), futures::stream::iter(payloads)))
        }

        fn name(&self) -> &str {
            self.name
        }
    }

    #[tokio::test]
    async fn test_in_band_rate_limit_moves_stream_to_fallback() {
        let primary: Arc<dyn LlmProvider> = Arc::new(ScriptedStream {
            name: "openai",
            payloads: vec![
                r#"{"choices":[{"delta":{"content":"partial"}}]}"#,
                r#"{"error":{"message":"Rate limit reached for requests","code":"rate_limit_exceeded"}}"#,
            ],
        });
        let fallback: Arc<dyn LlmProvider> = Arc::new(ScriptedStream {
            name: "deepseek",
            payloads: vec![
                r#"{"choices":[{"delta":{"content":"full "}}]}"#,
                r#"{"choices":[{"delta":{"content":"answer"}}]}"#,
            ],
        });
        let chain = FallbackChain::new(vec![
            (primary, RateLimitConfig::default()),
            (fallback, RateLimitConfig::default()),
        ])
        .unwrap();

        let completion = chain
            .generate_stream_detailed(&GenerateRequest::new("sys", "hi"), None)
            .await
            .unwrap();
        assert_eq!(completion.text, "full answer");
        assert_eq!(completion.served_by.as_deref(), Some("deepseek"));
        assert!(!completion.degraded);
    }
}
