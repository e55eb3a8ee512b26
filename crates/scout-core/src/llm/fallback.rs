//! Multi-provider fallback chain
//!
//! Providers are tried in a fixed order. Each call first waits on the
//! provider's own rate limiter. A quota-class failure (rate limit, billing,
//! authentication) moves on to the next provider; any other failure is
//! returned immediately since another vendor would reject the same request.
//! When every provider has failed with a quota-class error the chain
//! answers with a labeled placeholder instead of an error.

use super::provider::ProviderClient;
use super::rate_limit::RateLimiter;
use super::{GenerateRequest, LlmProvider, ProviderKind};
use crate::config::{LlmConfig, RateLimitConfig};
use crate::error::{Result, ScoutError};
use futures::StreamExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// First line of every placeholder produced by an exhausted chain
pub const DEGRADED_MARKER: &str = "[AI Research Assistant - Service Temporarily Unavailable]";

const ECHO_CHARS: usize = 100;

/// Receives each streamed fragment together with the text accumulated so far
pub type ChunkCallback<'a> = dyn Fn(&str, &str) -> anyhow::Result<()> + Send + Sync + 'a;

/// Result of a chain call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Completion {
    pub text: String,
    /// Provider that produced the text, `None` when degraded
    pub served_by: Option<String>,
    pub degraded: bool,
}

struct ChainLink {
    provider: Arc<dyn LlmProvider>,
    limiter: RateLimiter,
}

/// Ordered, immutable list of providers with cascade logic
pub struct FallbackChain {
    links: Vec<ChainLink>,
}

impl FallbackChain {
    /// Create a chain from providers in the order they should be tried
    pub fn new(providers: Vec<(Arc<dyn LlmProvider>, RateLimitConfig)>) -> Result<Self> {
        if providers.is_empty() {
            return Err(ScoutError::Config(
                "a fallback chain needs at least one provider".to_string(),
            ));
        }
        let links = providers
            .into_iter()
            .map(|(provider, limits)| ChainLink {
                provider,
                limiter: RateLimiter::new(limits),
            })
            .collect();
        Ok(Self { links })
    }

    /// Build the chain described by the configuration.
    ///
    /// Every link is resolved before any client is constructed, so a
    /// missing key for any fallback fails the whole build.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let resolved = config.resolve_chain()?;
        let providers = resolved
            .iter()
            .map(|r| -> Result<(Arc<dyn LlmProvider>, RateLimitConfig)> {
                let client: Arc<dyn LlmProvider> = Arc::new(ProviderClient::from_resolved(r)?);
                Ok((client, r.rate_limit))
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            "Built LLM chain: {}",
            config
                .chain_order()
                .iter()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(" -> ")
        );
        Self::new(providers)
    }

    /// Build a chain from a primary provider name and up to two fallback names
    pub fn from_names(primary: &str, fallbacks: &[&str], config: &LlmConfig) -> Result<Self> {
        let mut config = config.clone();
        config.primary = primary.parse()?;
        config.fallbacks = fallbacks
            .iter()
            .map(|name| name.parse::<ProviderKind>())
            .collect::<Result<Vec<_>>>()?;
        Self::from_config(&config)
    }

    /// Provider names in the order they are tried
    pub fn providers(&self) -> Vec<&str> {
        self.links.iter().map(|link| link.provider.name()).collect()
    }

    /// Generate a response, falling back across providers
    pub async fn generate(&self, request: &GenerateRequest) -> Result<String> {
        Ok(self.generate_detailed(request).await?.text)
    }

    /// Generate a response and report which provider served it
    pub async fn generate_detailed(&self, request: &GenerateRequest) -> Result<Completion> {
        for (index, link) in self.links.iter().enumerate() {
            let name = link.provider.name();
            link.limiter.acquire().await;

            match link.provider.generate(request).await {
                Ok(text) => {
                    if index > 0 {
                        tracing::info!("Fallback provider {} answered", name);
                    }
                    return Ok(Completion {
                        text,
                        served_by: Some(name.to_string()),
                        degraded: false,
                    });
                }
                Err(e) if e.is_quota_class() => {
                    tracing::warn!("{} quota/rate limit exceeded: {}", name, e);
                    continue;
                }
                Err(e) => {
                    tracing::error!("LLM generation failed on {}: {}", name, e);
                    return Err(e);
                }
            }
        }

        tracing::warn!("All LLM providers exhausted, returning degraded response");
        Ok(degraded_completion(request))
    }

    /// Stream a response, reporting fragments through `on_chunk`.
    ///
    /// Returns the full text. A quota-class failure part-way through drops
    /// the partial text and restarts on the next provider.
    pub async fn generate_stream(
        &self,
        request: &GenerateRequest,
        on_chunk: Option<&ChunkCallback<'_>>,
    ) -> Result<String> {
        Ok(self.generate_stream_detailed(request, on_chunk).await?.text)
    }

    /// Streaming counterpart of [`FallbackChain::generate_detailed`]
    pub async fn generate_stream_detailed(
        &self,
        request: &GenerateRequest,
        on_chunk: Option<&ChunkCallback<'_>>,
    ) -> Result<Completion> {
        'providers: for link in &self.links {
            let name = link.provider.name();
            link.limiter.acquire().await;

            let mut stream = match link.provider.stream_generate(request).await {
                Ok(stream) => stream,
                Err(e) if e.is_quota_class() => {
                    tracing::warn!("{} stream refused, trying fallback: {}", name, e);
                    continue;
                }
                Err(e) => {
                    tracing::error!("LLM stream failed on {}: {}", name, e);
                    return Err(e);
                }
            };

            let mut accumulated = String::new();
            while let Some(item) = stream.next().await {
                match item {
                    Ok(fragment) => {
                        accumulated.push_str(&fragment);
                        notify(on_chunk, &fragment, &accumulated);
                    }
                    Err(e) if e.is_quota_class() => {
                        tracing::warn!(
                            "{} stream failed after {} chars, trying fallback: {}",
                            name,
                            accumulated.len(),
                            e
                        );
                        continue 'providers;
                    }
                    Err(e) => {
                        tracing::error!("LLM stream failed on {}: {}", name, e);
                        return Err(e);
                    }
                }
            }

            return Ok(Completion {
                text: accumulated,
                served_by: Some(name.to_string()),
                degraded: false,
            });
        }

        tracing::warn!("All LLM providers exhausted, returning degraded response");
        let completion = degraded_completion(request);
        notify(on_chunk, &completion.text, &completion.text);
        Ok(completion)
    }
}

fn notify(on_chunk: Option<&ChunkCallback<'_>>, fragment: &str, accumulated: &str) {
    let Some(callback) = on_chunk else {
        return;
    };
    match std::panic::catch_unwind(AssertUnwindSafe(|| callback(fragment, accumulated))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::debug!("Chunk callback failed: {}", e),
        Err(_) => tracing::debug!("Chunk callback panicked"),
    }
}

fn degraded_completion(request: &GenerateRequest) -> Completion {
    Completion {
        text: degradation_message(&request.user_message),
        served_by: None,
        degraded: true,
    }
}

/// Placeholder returned when no provider could serve a request
pub fn degradation_message(user_message: &str) -> String {
    let echo: String = user_message.chars().take(ECHO_CHARS).collect();
    format!(
        "{}\n\n\
         We're experiencing high demand and have temporarily exceeded our API quotas.\n\n\
         Your research topic: {}...\n\n\
         Please try again in a few minutes, or consider:\n\
         1. Breaking down your research into smaller, more specific topics\n\
         2. Trying again during off-peak hours\n\
         3. Using fewer research queries per session\n",
        DEGRADED_MARKER, echo
    )
}

/// Whether a text is a degradation placeholder rather than a model answer
pub fn is_degraded(text: &str) -> bool {
    text.trim_start().starts_with(DEGRADED_MARKER)
}
