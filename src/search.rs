//! `ai search`: one-shot web search through a search-backed model.

use anyhow::Result;
use colored::Colorize;

use crate::config::Config;
use crate::constants::{SEARCH_SYSTEM_PROMPT, SEARCH_TEMPERATURE};
use crate::format;
use crate::message::Message;
use crate::provider::{ApiError, CompletionClient, CompletionRequest, OpenAiClient};

/// Runs a search and prints the cleaned answer.
pub async fn run_search(config: &Config, query: &str, verbose: bool) -> Result<()> {
    let client = OpenAiClient::from_config(config)?;
    let model = config.models.search.as_str();

    println!("{} {}", "Search:".bold().cyan(), query);
    if verbose {
        println!("{} {}", "model:".dimmed(), model);
        println!("{} {}", "temperature:".dimmed(), SEARCH_TEMPERATURE);
    }
    println!();

    let answer = search(&client, model, query).await?;
    println!("{}", format::render_markdown_lite(&answer));
    Ok(())
}

/// Asks `model` once and returns the answer with citation markers removed.
pub(crate) async fn search<C: CompletionClient>(
    client: &C,
    model: &str,
    query: &str,
) -> Result<String, ApiError> {
    let request = CompletionRequest::new(
        model,
        vec![Message::system(SEARCH_SYSTEM_PROMPT), Message::user(query)],
        SEARCH_TEMPERATURE,
    );
    tracing::info!(model, "search request");
    let answer = client.complete(&request).await?;
    Ok(format::strip_citations(&answer))
}
