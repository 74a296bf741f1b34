//! Entry point for ai, a terminal LLM assistant.
//!
//! This binary loads environment variables, sets up file logging, parses CLI
//! arguments via [`cli`], and dispatches to the appropriate subcommand
//! handler.

mod ask;
mod chat;
mod cli;
mod config;
mod constants;
mod format;
mod logging;
mod message;
mod output;
mod provider;
mod search;
mod session;

use anyhow::Result;

/// Runs the ai CLI.
///
/// Loads `.env` files (silently ignored if absent), starts file logging,
/// parses command-line arguments into a [`cli::Cli`] struct, and dispatches
/// the chosen subcommand via [`cli::run`].
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let _log_guard = logging::init();
    let cli = cli::parse();
    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "starting");
    cli::run(cli).await
}
