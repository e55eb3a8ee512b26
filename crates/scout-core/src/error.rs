//! Error types for scout

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

/// Result type alias using ScoutError
pub type Result<T> = std::result::Result<T, ScoutError>;

/// Error type alias for convenience
pub type Error = ScoutError;

/// Exit codes for CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const NOT_FOUND: i32 = 2;
    pub const INVALID_INPUT: i32 = 3;
    pub const PROVIDER_UNAVAILABLE: i32 = 4;
}

lazy_static! {
    /// Message fragments that identify quota, billing and auth failures in
    /// errors that carry no status code.
    static ref QUOTA_PATTERN: Regex = Regex::new(
        r"(?i)quota|rate[ _-]?limit|\b429\b|insufficient[ _]balance|\b402\b|billing|limit exceeded|authentication[ _]error|invalid x-api-key|invalid api key|\b401\b"
    )
    .expect("quota pattern is a valid regex");
}

/// Main error type for scout
#[derive(Debug, Error)]
pub enum ScoutError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("{provider} request failed (status {status:?}): {message}")]
    Provider {
        provider: String,
        status: Option<u16>,
        message: String,
    },

    #[error("{provider} quota exceeded: {message}")]
    QuotaExceeded { provider: String, message: String },

    #[error("Retries exhausted after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<ScoutError>,
    },

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Lock poisoned: {0}")]
    Lock(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl ScoutError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidInput(_) | Self::Config(_) => exit_codes::INVALID_INPUT,
            _ if self.is_quota_class() => exit_codes::PROVIDER_UNAVAILABLE,
            _ => exit_codes::GENERAL_ERROR,
        }
    }

    /// Whether switching to another provider can recover from this error.
    ///
    /// Typed variants and HTTP status codes are consulted first. Message
    /// matching is only used for errors that carry no structure.
    pub fn is_quota_class(&self) -> bool {
        match self {
            Self::QuotaExceeded { .. } => true,
            Self::RetriesExhausted { source, .. } => source.is_quota_class(),
            Self::Provider {
                status: Some(status),
                ..
            } => matches!(status, 401 | 402 | 429),
            Self::Provider {
                status: None,
                message,
                ..
            } => QUOTA_PATTERN.is_match(message),
            Self::Llm(message) | Self::Search(message) => QUOTA_PATTERN.is_match(message),
            Self::Other(e) => QUOTA_PATTERN.is_match(&e.to_string()),
            _ => false,
        }
    }

    /// Whether a provider client should retry this error locally before
    /// surfacing it.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Provider {
                status: Some(429),
                message,
                ..
            } => !message.contains("insufficient_quota"),
            Self::Provider {
                status: Some(status),
                ..
            } => *status == 408 || (500..600).contains(status),
            _ => false,
        }
    }
}
