//! Cache in front of a paid search provider

use super::{SearchProvider, SearchRequest};
use crate::cache::SearchCache;
use crate::error::Result;
use serde::Serialize;
use std::sync::Arc;

/// Search response plus where it came from
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub response: serde_json::Value,
    pub from_cache: bool,
}

/// Serves searches from the cache when possible and writes fresh results back
pub struct CachedSearch<P> {
    cache: Arc<SearchCache>,
    provider: P,
}

impl<P: SearchProvider> CachedSearch<P> {
    pub fn new(cache: Arc<SearchCache>, provider: P) -> Self {
        Self { cache, provider }
    }

    pub fn cache(&self) -> &SearchCache {
        &self.cache
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub async fn search(&self, request: &SearchRequest) -> Result<SearchOutcome> {
        if let Some(response) = self
            .cache
            .get(&request.query, request.depth, request.max_results)
            .await?
        {
            return Ok(SearchOutcome {
                response,
                from_cache: true,
            });
        }

        let response = self.provider.search(request).await?;

        // The paid result is returned even when it cannot be cached.
        if let Err(e) = self
            .cache
            .put(&request.query, request.depth, request.max_results, &response)
            .await
        {
            tracing::error!("Failed to cache {} result for '{}': {}", self.provider.name(), request.query, e);
        }

        Ok(SearchOutcome {
            response,
            from_cache: false,
        })
    }
}
