//! Ask command

use crate::app::{AskArgs, OutputFormat};
use anyhow::Result;
use scout_core::llm::ChunkCallback;
use scout_core::{Config, FallbackChain, GenerateRequest, ResearchQueue};
use std::io::Write;

pub async fn run(args: AskArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let chain = FallbackChain::from_config(&config.llm)?;
    let queue = ResearchQueue::new(config.research.max_concurrent);

    let mut request =
        GenerateRequest::new(args.system, args.question.join(" ")).with_temperature(args.temperature);
    if let Some(max_tokens) = args.max_tokens {
        request = request.with_max_tokens(max_tokens);
    }

    let print_fragment = |fragment: &str, _: &str| -> anyhow::Result<()> {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(fragment.as_bytes())?;
        stdout.flush()?;
        Ok(())
    };
    let live_output = args.stream && format == OutputFormat::Cli;
    let on_chunk: Option<&ChunkCallback<'_>> = if live_output {
        Some(&print_fragment)
    } else {
        None
    };

    let completion = queue
        .run(async {
            if args.stream {
                chain.generate_stream_detailed(&request, on_chunk).await
            } else {
                chain.generate_detailed(&request).await
            }
        })
        .await??;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&completion)?),
        OutputFormat::Cli => {
            if live_output {
                println!();
            } else {
                println!("{}", completion.text);
            }
            if let Some(provider) = &completion.served_by {
                eprintln!("[answered by {}]", provider);
            }
        }
    }
    Ok(())
}
