//! Cached web search command

use crate::app::{OutputFormat, SearchArgs};
use crate::output;
use anyhow::Result;
use scout_core::{CachedSearch, Config, SearchCache, SearchRequest, TavilyClient};
use std::sync::Arc;

pub async fn run(args: SearchArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let provider = TavilyClient::new(&config.search)?;
    let cache = Arc::new(SearchCache::from_config(&config.cache).await?);
    let search = CachedSearch::new(cache, provider);

    let mut request = SearchRequest::new(args.query.query_text())
        .with_depth(args.query.depth.into())
        .with_max_results(args.query.max_results);
    request.include_answer = !args.no_answer;

    let outcome = search.search(&request).await?;
    if format == OutputFormat::Cli {
        let source = if outcome.from_cache { "cache" } else { "tavily" };
        eprintln!("[served from {}]", source);
    }
    print!("{}", output::format_response(&outcome.response, format)?);
    Ok(())
}
