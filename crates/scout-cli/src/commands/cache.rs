//! Cache maintenance commands

use crate::app::{CacheAction, CacheArgs, OutputFormat};
use crate::output;
use anyhow::Result;
use scout_core::error::exit_codes;
use scout_core::{Config, SearchCache};

pub async fn run(args: CacheArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let cache = SearchCache::from_config(&config.cache).await?;

    match args.action {
        CacheAction::Stats => {
            let stats = cache.get_stats()?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
                OutputFormat::Cli => {
                    println!("Database:        {}", cache.path().display());
                    println!("Entries:         {}", stats.entries);
                    println!("Stored hits:     {}", stats.total_hits_stored);
                    println!("TTL:             {}h", stats.ttl_hours);
                    println!();
                    println!("Semantic tier:");
                    println!("  Enabled:       {}", stats.semantic_enabled);
                    println!("  Threshold:     {:.2}", stats.similarity_threshold);
                    println!("  Vectors:       {}", stats.vectors);
                }
            }
        }
        CacheAction::Get(query) => {
            let text = query.query_text();
            match cache.get(&text, query.depth.into(), query.max_results).await? {
                Some(response) => print!("{}", output::format_response(&response, format)?),
                None => {
                    eprintln!("No cached result for '{}'", text);
                    std::process::exit(exit_codes::NOT_FOUND);
                }
            }
        }
        CacheAction::ClearExpired => {
            let removed = cache.clear_expired()?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::json!({ "removed": removed })),
                OutputFormat::Cli => println!("Removed {} expired entries", removed),
            }
        }
    }
    Ok(())
}
