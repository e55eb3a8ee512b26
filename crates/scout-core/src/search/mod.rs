//! Web search module
//!
//! Provides:
//! - The `SearchProvider` seam for paid search backends
//! - A Tavily client
//! - `CachedSearch`, which consults the two-tier cache before paying

mod cached;
mod tavily;

pub use cached::{CachedSearch, SearchOutcome};
pub use tavily::TavilyClient;

use crate::error::{Result, ScoutError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Provider-side effort level. Part of the cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchDepth {
    #[default]
    Basic,
    Advanced,
}

impl SearchDepth {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchDepth::Basic => "basic",
            SearchDepth::Advanced => "advanced",
        }
    }
}

impl fmt::Display for SearchDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchDepth {
    type Err = ScoutError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(SearchDepth::Basic),
            "advanced" => Ok(SearchDepth::Advanced),
            other => Err(ScoutError::InvalidInput(format!(
                "unknown search depth '{}' (expected basic or advanced)",
                other
            ))),
        }
    }
}

/// Search request
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub max_results: u32,
    pub depth: SearchDepth,
    pub include_answer: bool,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            max_results: 5,
            depth: SearchDepth::Basic,
            include_answer: true,
        }
    }

    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_depth(mut self, depth: SearchDepth) -> Self {
        self.depth = depth;
        self
    }
}

/// Paid web search backend. Responses are opaque JSON.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<serde_json::Value>;

    fn name(&self) -> &str;
}

/// One result extracted from a raw search response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub content: String,
    pub score: f64,
    pub published_date: Option<String>,
}

/// Extract the result list from a raw response, skipping malformed items
pub fn parse_hits(response: &serde_json::Value) -> Vec<SearchHit> {
    let Some(results) = response.get("results").and_then(|r| r.as_array()) else {
        return Vec::new();
    };

    let text = |item: &serde_json::Value, field: &str| {
        item.get(field)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    };

    results
        .iter()
        .filter(|item| item.is_object())
        .map(|item| SearchHit {
            title: text(item, "title"),
            url: text(item, "url"),
            content: text(item, "content"),
            score: item.get("score").and_then(|v| v.as_f64()).unwrap_or(0.0),
            published_date: item
                .get("published_date")
                .and_then(|v| v.as_str())
                .map(String::from),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_depth_parsing() {
        assert_eq!("Advanced".parse::<SearchDepth>().unwrap(), SearchDepth::Advanced);
        assert_eq!(SearchDepth::default().to_string(), "basic");
        assert!("deep".parse::<SearchDepth>().is_err());
    }

    #[test]
    fn test_parse_hits_tolerates_missing_fields() {
        let response = json!({
            "answer": "yes",
            "results": [
                {"title": "A", "url": "https://a", "content": "alpha", "score": 0.9},
                {"url": "https://b"},
                "garbage"
            ]
        });

        let hits = parse_hits(&response);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].score, 0.9);
        assert_eq!(hits[1].title, "");
        assert!(parse_hits(&json!({"results": null})).is_empty());
    }
}
