//! Command-line interface definition and dispatch for ai.
//!
//! Uses [`clap`] for argument parsing with derive macros. Each subcommand is
//! routed to its handler; stored-chat operations live in the [`session`]
//! submodule.

mod session;

use crate::{ask, chat, config::Config, search};
use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;

/// Top-level CLI structure for ai.
#[derive(Parser)]
#[command(
    name = "ai",
    version,
    about = "Terminal LLM assistant: web search, quick questions and persistent chats"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for the ai CLI.
///
/// The `///` doc comments on variants double as `--help` text rendered by clap.
#[derive(Subcommand)]
pub enum Commands {
    /// Search the web and print a short answer
    Search {
        /// What to search for
        #[arg(required = true)]
        query: Vec<String>,
        /// Show model and parameters
        #[arg(short, long)]
        verbose: bool,
    },
    /// Ask a quick question (with up to two follow-ups)
    Ask {
        /// The question to ask
        #[arg(required = true)]
        question: Vec<String>,
        /// Show model and parameters
        #[arg(short, long)]
        verbose: bool,
    },
    /// Start or resume an interactive chat
    Chat {
        /// Chat name; resumed if it exists, created otherwise
        name: Option<String>,
        /// Show model and parameters
        #[arg(short, long)]
        verbose: bool,
    },
    /// Manage saved chats
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Subcommands for the `config` command.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the effective config (API key masked)
    Show,
    /// Print the config file path
    Path,
}

/// Subcommands for the `session` command.
#[derive(Subcommand)]
pub enum SessionAction {
    /// List saved chats
    List,
    /// Print a saved chat
    Show { name: String },
    /// Delete a saved chat
    Delete { name: String },
}

/// Parses command-line arguments into a [`Cli`] struct.
///
/// Delegates to [`clap::Parser::parse`], which exits the process on invalid input.
pub fn parse() -> Cli {
    Cli::parse()
}

/// Dispatches the parsed CLI command to its handler.
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Search { query, verbose } => {
            let query = join_words(&query, "ai search \"your query\"")?;
            let config = Config::load()?;
            search::run_search(&config, &query, verbose).await
        }
        Commands::Ask { question, verbose } => {
            let question = join_words(&question, "ai ask \"your question\"")?;
            let config = Config::load()?;
            ask::run_ask(&config, &question, verbose).await
        }
        Commands::Chat { name, verbose } => {
            let config = Config::load()?;
            chat::run_chat(config, name, verbose).await
        }
        Commands::Session { action } => {
            let config = Config::load()?;
            session::handle_session(&config, action)
        }
        Commands::Config { action } => match action {
            ConfigAction::Path => {
                println!("{}", Config::config_path()?.display());
                Ok(())
            }
            ConfigAction::Show => {
                let mut config = Config::load()?;
                config.api.proxyapi_key = mask_key(&config.api.proxyapi_key);
                let path = Config::config_path()?;
                println!("{} {}", "Config path:".bold(), path.display());
                println!("{} {}", "Chats:".bold(), config.chats_dir().display());
                println!();
                println!("{}", toml::to_string_pretty(&config)?);
                Ok(())
            }
        },
    }
}

fn join_words(words: &[String], usage: &str) -> Result<String> {
    let text = words.join(" ");
    let text = text.trim();
    if text.is_empty() {
        anyhow::bail!("Nothing to send. Usage: {}", usage);
    }
    Ok(text.to_string())
}

/// Keeps the first four characters of a key.
fn mask_key(key: &str) -> String {
    if key.chars().count() <= 8 {
        return key.to_string();
    }
    let head: String = key.chars().take(4).collect();
    format!("{}...", head)
}
