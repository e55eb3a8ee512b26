//! Configuration management

use crate::error::{Result, ScoutError};
use crate::llm::ProviderKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Search cache configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// LLM provider chain configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Web search configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// Research pipeline configuration
    #[serde(default)]
    pub research: ResearchConfig,
}

/// Search cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Database path (defaults to the user cache directory)
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Hours a cached search response stays valid
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: u64,

    /// Overrides the embedder's recommended similarity threshold
    #[serde(default)]
    pub similarity_threshold: Option<f32>,

    /// Number of nearest neighbours inspected on a semantic lookup
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Which embedding provider backs the semantic tier
    #[serde(default)]
    pub embedding: EmbeddingChoice,

    /// API key for the hosted embedding endpoint
    #[serde(default)]
    pub embedding_api_key: Option<String>,

    /// Base URL of the hosted embedding endpoint
    #[serde(default)]
    pub embedding_url: Option<String>,

    /// Hosted embedding model
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
}

impl CacheConfig {
    /// Database path, falling back to the default cache location
    pub fn db_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(crate::db::Database::default_path)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: None,
            ttl_hours: default_ttl_hours(),
            similarity_threshold: None,
            top_k: default_top_k(),
            embedding: EmbeddingChoice::default(),
            embedding_api_key: None,
            embedding_url: None,
            embedding_model: default_embedding_model(),
        }
    }
}

fn default_ttl_hours() -> u64 {
    24
}

fn default_top_k() -> usize {
    3
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

/// Embedding provider selection policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingChoice {
    /// Hosted when a key is present and a trial call succeeds, hashing otherwise
    #[default]
    Auto,
    /// Always the hashing-trick embedder
    Hash,
    /// Hosted when a key is present, without a trial call
    Hosted,
}

/// Sliding-window request ceilings for one provider.
///
/// Both ceilings must be at least 1; a provider resolved with a zero
/// ceiling is a configuration error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub requests_per_minute: usize,
    pub requests_per_hour: usize,
}

impl RateLimitConfig {
    /// Reject ceilings that would block or disable a provider
    pub fn validate(&self, provider: ProviderKind) -> Result<()> {
        if self.requests_per_minute == 0 || self.requests_per_hour == 0 {
            return Err(ScoutError::Config(format!(
                "rate limits for provider '{}' must be at least 1 request per window",
                provider
            )));
        }
        Ok(())
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 60,
            requests_per_hour: 3500,
        }
    }
}

/// Bounded exponential backoff for transient provider failures
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

impl RetryConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            multiplier: default_multiplier(),
        }
    }
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_delay_ms() -> u64 {
    4_000
}

fn default_max_delay_ms() -> u64 {
    60_000
}

fn default_multiplier() -> f64 {
    2.0
}

/// Settings for one LLM vendor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// API key for the vendor
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model name (vendor default when unset)
    #[serde(default)]
    pub model: Option<String>,

    /// Base URL override (vendor default when unset)
    #[serde(default)]
    pub base_url: Option<String>,

    /// Request ceilings (vendor default when unset)
    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Local retry policy for transient failures
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: None,
            base_url: None,
            rate_limit: None,
            timeout_secs: default_timeout(),
            retry: RetryConfig::default(),
        }
    }
}

fn default_timeout() -> u64 {
    60
}

/// Fully resolved settings for one link of the fallback chain
#[derive(Debug, Clone)]
pub struct ResolvedProvider {
    pub kind: ProviderKind,
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub rate_limit: RateLimitConfig,
    pub timeout: Duration,
    pub retry: RetryConfig,
}

impl ProviderSettings {
    /// Fill vendor defaults and require an API key
    pub fn resolve(&self, kind: ProviderKind) -> Result<ResolvedProvider> {
        let api_key = self
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                ScoutError::Config(format!("missing API key for provider '{}'", kind))
            })?;

        let rate_limit = self.rate_limit.unwrap_or_else(|| kind.default_rate_limit());
        rate_limit.validate(kind)?;

        Ok(ResolvedProvider {
            kind,
            api_key,
            model: self
                .model
                .clone()
                .unwrap_or_else(|| kind.default_model().to_string()),
            base_url: self
                .base_url
                .clone()
                .unwrap_or_else(|| kind.default_base_url().to_string()),
            rate_limit,
            timeout: Duration::from_secs(self.timeout_secs),
            retry: self.retry,
        })
    }
}

/// LLM fallback chain configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider tried first
    #[serde(default = "default_primary")]
    pub primary: ProviderKind,

    /// Providers tried in order after a quota-class failure (at most two)
    #[serde(default)]
    pub fallbacks: Vec<ProviderKind>,

    #[serde(default)]
    pub openai: ProviderSettings,

    #[serde(default)]
    pub anthropic: ProviderSettings,

    #[serde(default)]
    pub deepseek: ProviderSettings,
}

impl LlmConfig {
    /// Settings for a provider kind
    pub fn settings(&self, kind: ProviderKind) -> &ProviderSettings {
        match kind {
            ProviderKind::OpenAi => &self.openai,
            ProviderKind::Anthropic => &self.anthropic,
            ProviderKind::DeepSeek => &self.deepseek,
        }
    }

    fn settings_mut(&mut self, kind: ProviderKind) -> &mut ProviderSettings {
        match kind {
            ProviderKind::OpenAi => &mut self.openai,
            ProviderKind::Anthropic => &mut self.anthropic,
            ProviderKind::DeepSeek => &mut self.deepseek,
        }
    }

    /// Chain order: primary first, then fallbacks
    pub fn chain_order(&self) -> Vec<ProviderKind> {
        std::iter::once(self.primary)
            .chain(self.fallbacks.iter().copied())
            .collect()
    }

    /// Resolve every link of the chain, failing on the first missing key
    pub fn resolve_chain(&self) -> Result<Vec<ResolvedProvider>> {
        if self.fallbacks.len() > 2 {
            return Err(ScoutError::Config(format!(
                "at most two fallback providers are supported, got {}",
                self.fallbacks.len()
            )));
        }
        self.chain_order()
            .into_iter()
            .map(|kind| self.settings(kind).resolve(kind))
            .collect()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            primary: default_primary(),
            fallbacks: Vec::new(),
            openai: ProviderSettings::default(),
            anthropic: ProviderSettings::default(),
            deepseek: ProviderSettings::default(),
        }
    }
}

fn default_primary() -> ProviderKind {
    ProviderKind::OpenAi
}

/// Web search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Tavily API key
    #[serde(default)]
    pub api_key: Option<String>,

    /// Search endpoint
    #[serde(default = "default_search_url")]
    pub url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            url: default_search_url(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_search_url() -> String {
    "https://api.tavily.com/search".to_string()
}

/// Research pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// Research pipelines allowed to run at once
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
        }
    }
}

fn default_max_concurrent() -> usize {
    2
}

impl Config {
    /// Load config from default path
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load config from a path, falling back to defaults when absent
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_yaml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save config to default path
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CONFIG_DIR_NAME)
            .join("config.yml")
    }

    /// Overlay values from the process environment.
    ///
    /// Only the application layer calls this; library components take
    /// their settings from the resulting struct.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Overlay values from an arbitrary variable lookup
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        for kind in ProviderKind::ALL {
            if let Some(key) = lookup(kind.api_key_var()) {
                self.llm.settings_mut(kind).api_key = Some(key);
            }
        }
        if let Some(key) = lookup("TAVILY_API_KEY") {
            self.search.api_key = Some(key);
        }
        if self.cache.embedding_api_key.is_none() {
            self.cache.embedding_api_key = self.llm.openai.api_key.clone();
        }
        if let Some(ttl) = lookup("SCOUT_CACHE_TTL_HOURS").and_then(|s| s.parse().ok()) {
            self.cache.ttl_hours = ttl;
        }
        if let Some(threshold) = lookup("SCOUT_SIMILARITY_THRESHOLD").and_then(|s| s.parse().ok())
        {
            self.cache.similarity_threshold = Some(threshold);
        }
        if let Some(max) = lookup("SCOUT_MAX_CONCURRENT").and_then(|s| s.parse().ok()) {
            self.research.max_concurrent = max;
        }
        self
    }
}
