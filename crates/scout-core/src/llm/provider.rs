//! Supported LLM vendors and the closed set of provider clients

use super::anthropic::AnthropicClient;
use super::openai::OpenAiClient;
use super::{GenerateRequest, LlmProvider, TextStream};
use crate::config::{RateLimitConfig, ResolvedProvider};
use crate::error::{Result, ScoutError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// LLM vendor identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[serde(rename = "openai")]
    OpenAi,
    Anthropic,
    #[serde(rename = "deepseek")]
    DeepSeek,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [
        ProviderKind::OpenAi,
        ProviderKind::Anthropic,
        ProviderKind::DeepSeek,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::DeepSeek => "deepseek",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4",
            Self::Anthropic => "claude-3-sonnet-20240229",
            Self::DeepSeek => "deepseek-chat",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com",
            Self::Anthropic => "https://api.anthropic.com",
            Self::DeepSeek => "https://api.deepseek.com",
        }
    }

    /// Request ceilings matching each vendor's published limits
    pub fn default_rate_limit(&self) -> RateLimitConfig {
        let (requests_per_minute, requests_per_hour) = match self {
            Self::OpenAi => (20, 1000),
            Self::Anthropic => (50, 2000),
            Self::DeepSeek => (100, 5000),
        };
        RateLimitConfig {
            requests_per_minute,
            requests_per_hour,
        }
    }

    /// Environment variable the application layer reads the key from
    pub fn api_key_var(&self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::DeepSeek => "DEEPSEEK_API_KEY",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ScoutError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "deepseek" => Ok(Self::DeepSeek),
            other => Err(ScoutError::Config(format!(
                "unsupported provider: {}",
                other
            ))),
        }
    }
}

/// Concrete provider client, one variant per supported vendor
pub enum ProviderClient {
    OpenAi(OpenAiClient),
    Anthropic(AnthropicClient),
    DeepSeek(OpenAiClient),
}

impl ProviderClient {
    /// Build the client for a resolved provider configuration
    pub fn from_resolved(resolved: &ResolvedProvider) -> Result<Self> {
        Ok(match resolved.kind {
            ProviderKind::OpenAi => Self::OpenAi(OpenAiClient::new(resolved)?),
            ProviderKind::Anthropic => Self::Anthropic(AnthropicClient::new(resolved)?),
            ProviderKind::DeepSeek => Self::DeepSeek(OpenAiClient::new(resolved)?),
        })
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::OpenAi(_) => ProviderKind::OpenAi,
            Self::Anthropic(_) => ProviderKind::Anthropic,
            Self::DeepSeek(_) => ProviderKind::DeepSeek,
        }
    }

    fn inner(&self) -> &dyn LlmProvider {
        match self {
            Self::OpenAi(client) | Self::DeepSeek(client) => client,
            Self::Anthropic(client) => client,
        }
    }
}

#[async_trait]
impl LlmProvider for ProviderClient {
    async fn generate(&self, request: &GenerateRequest) -> Result<String> {
        self.inner().generate(request).await
    }

    async fn stream_generate(&self, request: &GenerateRequest) -> Result<TextStream> {
        self.inner().stream_generate(request).await
    }

    fn name(&self) -> &str {
        self.kind().as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_provider_names() {
        assert_eq!("OpenAI".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!(
            " anthropic ".parse::<ProviderKind>().unwrap(),
            ProviderKind::Anthropic
        );
        assert_eq!(
            "deepseek".parse::<ProviderKind>().unwrap(),
            ProviderKind::DeepSeek
        );
        assert!("gemini".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_serde_names_match_display() {
        for kind in ProviderKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind));
        }
    }

    #[test]
    fn test_vendor_rate_limits_differ() {
        assert!(
            ProviderKind::OpenAi.default_rate_limit().requests_per_minute
                < ProviderKind::DeepSeek.default_rate_limit().requests_per_minute
        );
    }
}
