//! Output formatters

use crate::app::OutputFormat;
use anyhow::Result;
use scout_core::search::parse_hits;

/// Format a raw search response
pub fn format_response(response: &serde_json::Value, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(format!("{}\n", serde_json::to_string_pretty(response)?)),
        OutputFormat::Cli => Ok(format_terminal(response)),
    }
}

fn format_terminal(response: &serde_json::Value) -> String {
    let mut output = String::new();

    if let Some(answer) = response.get("answer").and_then(|a| a.as_str()) {
        if !answer.is_empty() {
            output.push_str(answer);
            output.push_str("\n\n");
        }
    }

    for hit in parse_hits(response) {
        let score_pct = (hit.score * 100.0) as u32;
        output.push_str(&format!("{:>3}% {}\n", score_pct, hit.title));
        output.push_str(&format!("     {}\n", hit.url));
        if let Some(date) = &hit.published_date {
            output.push_str(&format!("     published {}\n", date));
        }
    }

    output
}
