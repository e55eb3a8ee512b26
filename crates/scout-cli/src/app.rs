//! CLI argument definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use scout_core::SearchDepth;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "scout")]
#[command(
    author,
    version,
    about = "Search cache and LLM fallback chain for a research assistant"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "cli")]
    pub format: OutputFormat,

    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true, env = "SCOUT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Cache database path
    #[arg(long, global = true, env = "SCOUT_DB")]
    pub db: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Inspect and maintain the search cache
    Cache(CacheArgs),

    /// Web search, served from the cache when possible
    Search(SearchArgs),

    /// Ask the LLM fallback chain a question
    Ask(AskArgs),
}

#[derive(Args)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub action: CacheAction,
}

#[derive(Subcommand)]
pub enum CacheAction {
    /// Show cache statistics
    Stats,
    /// Look up a cached response without searching
    Get(QueryArgs),
    /// Delete expired entries
    ClearExpired,
}

#[derive(Args)]
pub struct QueryArgs {
    /// Search query
    #[arg(required = true)]
    pub query: Vec<String>,

    /// Search depth
    #[arg(long, value_enum, default_value = "basic")]
    pub depth: DepthArg,

    /// Maximum number of results
    #[arg(short = 'n', long, default_value = "5")]
    pub max_results: u32,
}

impl QueryArgs {
    pub fn query_text(&self) -> String {
        self.query.join(" ")
    }
}

#[derive(Args)]
pub struct SearchArgs {
    #[command(flatten)]
    pub query: QueryArgs,

    /// Skip the AI-generated answer
    #[arg(long)]
    pub no_answer: bool,
}

#[derive(Args)]
pub struct AskArgs {
    /// Question for the model
    #[arg(required = true)]
    pub question: Vec<String>,

    /// System prompt
    #[arg(long, default_value = "You are a helpful research assistant.")]
    pub system: String,

    /// Maximum tokens to generate
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Sampling temperature
    #[arg(long, default_value = "0.7")]
    pub temperature: f32,

    /// Print the response as it is generated
    #[arg(long)]
    pub stream: bool,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum DepthArg {
    Basic,
    Advanced,
}

impl From<DepthArg> for SearchDepth {
    fn from(depth: DepthArg) -> Self {
        match depth {
            DepthArg::Basic => SearchDepth::Basic,
            DepthArg::Advanced => SearchDepth::Advanced,
        }
    }
}

#[derive(Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    Cli,
    Json,
}
