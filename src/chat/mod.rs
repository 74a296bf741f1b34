//! Interactive chat REPL for ai.
//!
//! Provides a multi-turn conversation loop using [`rustyline`] for readline
//! support (history, line editing). Turns and session commands are handled
//! by [`ChatEngine`]; this module only reads input and prints results.

mod commands;
mod engine;
mod error;

pub use engine::{ChatEngine, ChatSettings, CommandOutcome, TurnOutcome};
pub use error::ChatError;

use anyhow::{Context, Result};
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::io::{self, IsTerminal, Write};

use crate::config::Config;
use crate::format;
use crate::output::StdoutRenderer;
use crate::provider::{ApiError, CompletionClient, OpenAiClient};
use crate::session::{Session, SessionStore};
use commands::{Command, Input};

/// Runs the interactive chat REPL.
///
/// With `name`, an existing chat of that name is resumed and its transcript
/// printed; an unknown name starts a new chat under that name. Without it a
/// fresh chat with a generated name is started.
///
/// # Readline behavior
///
/// - **Ctrl+C** while typing: clears the line, stays in the REPL
/// - **Ctrl+C** while a reply streams: stops the reply
/// - **Ctrl+D**: same as `/exit`
/// - Readline history is persisted to `~/.cache/ai/chat_history.txt`
pub async fn run_chat(config: Config, name: Option<String>, verbose: bool) -> Result<()> {
    let client = OpenAiClient::from_config(&config)?;
    let store = SessionStore::new(config.chats_dir());
    std::fs::create_dir_all(store.dir())
        .with_context(|| format!("Chats directory {} is not usable", store.dir().display()))?;
    let settings = ChatSettings::from_config(&config);

    let resume = name.as_deref().is_some_and(|n| store.exists(n));
    let session = Session::new(if resume { None } else { name.clone() }, settings.model.clone());
    let mut engine = ChatEngine::new(client, store, settings, session);

    let shown = match &name {
        Some(name) if resume => name.clone(),
        _ => engine.session().name.clone(),
    };
    println!(
        "{} [chat: {}] (/help for commands, Ctrl+D to exit)",
        "ai chat".bold().cyan(),
        shown.yellow(),
    );
    if let (true, Some(name)) = (resume, name) {
        let outcome = engine.execute(Command::Load(name))?;
        report_outcome(&engine, outcome);
    }
    if verbose {
        print_settings(&engine);
    }
    println!();

    // Set up readline with persistent history
    let mut rl = DefaultEditor::new()?;
    let history_path = Config::cache_dir()?.join(crate::constants::HISTORY_FILENAME);
    if history_path.exists() {
        let _ = rl.load_history(&history_path);
    }

    loop {
        let readline = rl.readline(&format!("{} ", ">".green().bold()));

        match readline {
            Ok(line) => {
                let input = match engine.accept(&line) {
                    Ok(input) => input,
                    Err(e) => {
                        report_error(&e);
                        continue;
                    }
                };
                match input {
                    Input::Empty => continue,
                    Input::Command(command) => {
                        if run_command(&mut engine, &mut rl, command) {
                            break;
                        }
                    }
                    Input::Message(text) => {
                        let _ = rl.add_history_entry(&text);
                        run_turn(&mut engine, &text).await;
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "^C".dimmed());
                continue;
            }
            Err(ReadlineError::Eof) => {
                if run_command(&mut engine, &mut rl, Command::Exit) {
                    break;
                }
            }
            Err(e) => {
                eprintln!("{} {}", "error:".red().bold(), e);
                if engine.is_dirty() {
                    if let Err(e) = engine.terminate(true) {
                        report_error(&e);
                    }
                }
                break;
            }
        }
    }

    // Save readline history
    if let Some(parent) = history_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let _ = rl.save_history(&history_path);

    println!("{}", "goodbye.".dimmed());
    Ok(())
}

/// Streams one reply, then reprints it with formatting.
async fn run_turn<C: CompletionClient>(engine: &mut ChatEngine<C>, text: &str) {
    println!();
    let mut renderer = StdoutRenderer::new();

    match engine.send(text, &mut renderer, ctrl_c()).await {
        Ok(TurnOutcome::Completed) => {
            if io::stdout().is_terminal() {
                // Move cursor up to start of streamed content, then clear to end of screen
                print!("\x1b[{}A\x1b[J", renderer.visual_line_count());
                io::stdout().flush().ok();
                if let Some(reply) = engine.session().messages.last() {
                    println!("{}", format::render_markdown_lite(reply.text()));
                    println!();
                }
            }
        }
        Ok(TurnOutcome::Interrupted { kept: true }) => {
            println!("{}", "interrupted; partial reply kept".yellow());
        }
        Ok(TurnOutcome::Interrupted { kept: false }) => {
            println!("{}", "interrupted".yellow());
        }
        Err(e) => report_hint(&e),
    }

    if let Some(Err(e)) = engine.autosave() {
        eprintln!("{} autosave failed: {}", "warning:".yellow().bold(), e);
    }
}

/// Resolves on the first Ctrl+C. If the handler cannot be installed the
/// turn simply cannot be interrupted.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "could not listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

/// Executes a session command; returns true once the chat has ended.
fn run_command<C: CompletionClient>(
    engine: &mut ChatEngine<C>,
    rl: &mut DefaultEditor,
    command: Command,
) -> bool {
    match engine.execute(command) {
        Ok(CommandOutcome::Exited) => true,
        Ok(CommandOutcome::ExitPending) => confirm_exit(engine, rl),
        Ok(outcome) => {
            report_outcome(engine, outcome);
            false
        }
        Err(e) => {
            report_error(&e);
            false
        }
    }
}

/// Asks whether to save unsaved messages, then ends the chat. Ctrl+C at the
/// prompt cancels the exit.
fn confirm_exit<C: CompletionClient>(engine: &mut ChatEngine<C>, rl: &mut DefaultEditor) -> bool {
    let prompt = format!("Save '{}' before exit? [Y/n] ", engine.session().name);
    let save = match rl.readline(&prompt) {
        Ok(answer) => !answer.trim().to_lowercase().starts_with('n'),
        Err(ReadlineError::Interrupted) => {
            println!("{}", "exit cancelled".dimmed());
            return false;
        }
        Err(_) => true,
    };

    match engine.terminate(save) {
        Ok(Some(path)) => {
            println!("{} {}", "saved to".dimmed(), path.display());
            true
        }
        Ok(None) => true,
        Err(e) => {
            report_error(&e);
            println!("{}", "chat kept open; /exit to try again".dimmed());
            false
        }
    }
}

fn report_outcome<C: CompletionClient>(engine: &ChatEngine<C>, outcome: CommandOutcome) {
    match outcome {
        CommandOutcome::Created {
            name,
            saved_previous,
        } => {
            print_saved_previous(saved_previous);
            println!("{} {}", "new chat".green(), name.yellow());
        }
        CommandOutcome::Loaded {
            name,
            model,
            messages,
            dropped_unanswered,
            saved_previous,
        } => {
            print_saved_previous(saved_previous);
            println!(
                "{} {} [model: {}] ({} messages)",
                "loaded".green(),
                name.yellow(),
                model.yellow(),
                messages
            );
            println!();
            for msg in &engine.session().messages {
                println!("{}", format::format_message(msg));
                println!();
            }
            if dropped_unanswered {
                println!(
                    "{}",
                    "the last question was never answered and has been removed".dimmed()
                );
            }
        }
        CommandOutcome::Listed(names) => {
            if names.is_empty() {
                println!("{}", "No saved chats.".dimmed());
            }
            for name in names {
                let marker = if name == engine.session().name { "*" } else { " " };
                println!("{} {}", marker.green(), name);
            }
        }
        CommandOutcome::Saved(path) => {
            println!("{} {}", "saved to".dimmed(), path.display());
        }
        CommandOutcome::Help => {
            for (command, description) in commands::HELP {
                println!("  {} {}", format!("{:<14}", command).cyan(), description.dimmed());
            }
        }
        CommandOutcome::ExitPending | CommandOutcome::Exited => {}
    }
}

fn print_saved_previous(path: Option<std::path::PathBuf>) {
    if let Some(path) = path {
        println!("{} {}", "saved previous chat to".dimmed(), path.display());
    }
}

fn print_settings<C: CompletionClient>(engine: &ChatEngine<C>) {
    let settings = engine.settings();
    println!("{} {}", "model:".dimmed(), engine.session().model);
    println!("{} {}", "temperature:".dimmed(), settings.temperature);
    if let Some(max_tokens) = settings.max_tokens {
        println!("{} {}", "max tokens:".dimmed(), max_tokens);
    }
    println!("{} {}", "chats:".dimmed(), engine.store().dir().display());
}

fn report_error(err: &ChatError) {
    eprintln!("{} {}", "error:".red().bold(), err);
}

/// The renderer already printed the error itself; add the remedy, if any.
fn report_hint(err: &ChatError) {
    match err {
        ChatError::Api(api @ (ApiError::Network(_) | ApiError::Timeout(_))) => {
            if let Some(hint) = api.hint() {
                eprintln!("{} {}", "hint:".yellow(), hint);
            }
        }
        ChatError::Api(_) => {}
        other => report_error(other),
    }
}
