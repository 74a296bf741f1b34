//! Saved-chat management through the `ai session` subcommand family.
//!
//! Lists, prints and deletes chats in the configured chats directory with
//! table-formatted output.

use anyhow::Result;
use colored::Colorize;

use super::SessionAction;
use crate::config::Config;
use crate::format;
use crate::session::{Session, SessionStore};

/// Dispatches a session subcommand to its handler.
pub(crate) fn handle_session(config: &Config, action: SessionAction) -> Result<()> {
    let store = SessionStore::new(config.chats_dir());
    match action {
        SessionAction::List => session_list(&store),
        SessionAction::Show { name } => session_show(&store, &name),
        SessionAction::Delete { name } => session_delete(&store, &name),
    }
}

/// Lists all saved chats in a formatted table, newest first.
///
/// Displays name, message count, creation time and model. Adapts the name
/// column to the terminal size.
pub(crate) fn session_list(store: &SessionStore) -> Result<()> {
    let mut sessions: Vec<Session> = Vec::new();
    for name in store.list()? {
        match store.load(&name) {
            Ok(session) => sessions.push(session),
            Err(e) => eprintln!("{} {}", "skipping:".yellow(), e),
        }
    }
    if sessions.is_empty() {
        println!("{}", "No saved chats.".dimmed());
        println!("Start one with: {}", "ai chat".cyan());
        return Ok(());
    }
    sessions.sort_by(|a, b| b.created.cmp(&a.created));

    // Dynamic column layout based on terminal width
    let term_width = terminal_size::terminal_size()
        .map(|(w, _)| w.0 as usize)
        .unwrap_or(80);

    // Fixed column widths: MSGS=6, CREATED=18, MODEL~24, gaps between columns
    let fixed_cols = 6 + 18 + 24;
    let max_name_len = sessions
        .iter()
        .map(|s| s.name.chars().count())
        .max()
        .unwrap_or(4);
    let max_from_terminal = term_width.saturating_sub(fixed_cols).clamp(8, 50);
    let name_width = max_name_len.max(4).min(max_from_terminal);
    let header_width = name_width + 2 + 6 + 18 + 24;

    println!(
        "{} {} {} {}",
        format!("{:<nw$}", "NAME", nw = name_width + 2).bold(),
        format!("{:<6}", "MSGS").bold(),
        format!("{:<18}", "CREATED").bold(),
        "MODEL".bold(),
    );
    println!("{}", "-".repeat(term_width.min(header_width)));

    for s in &sessions {
        let name = if s.name.chars().count() > name_width {
            let truncated: String = s.name.chars().take(name_width - 3).collect();
            format!("{}...", truncated)
        } else {
            s.name.clone()
        };
        let created = s
            .created
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M")
            .to_string();

        // Pad first, then colorize to avoid ANSI escape code width issues
        let name_col = format!("{:<nw$}", name, nw = name_width + 2);
        let msgs_col = format!("{:<6}", s.messages.len());
        let created_col = format!("{:<18}", created);

        println!(
            "{} {} {} {}",
            name_col.cyan(),
            msgs_col.yellow(),
            created_col.dimmed(),
            s.model.dimmed(),
        );
    }
    println!();
    println!(
        "{} {} chats. Resume with: {}",
        "total:".dimmed(),
        sessions.len(),
        "ai chat <name>".cyan()
    );
    Ok(())
}

/// Prints a saved chat's transcript.
pub(crate) fn session_show(store: &SessionStore, name: &str) -> Result<()> {
    let session = store.load(name)?;
    println!(
        "{} {} [model: {}] [created: {}]",
        "chat".bold().cyan(),
        session.name.yellow(),
        session.model.yellow(),
        session
            .created
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M"),
    );
    println!();
    if session.is_empty() {
        println!("{}", "(no messages)".dimmed());
    }
    for msg in &session.messages {
        println!("{}", format::format_message(msg));
        println!();
    }
    Ok(())
}

/// Deletes a saved chat by name.
pub(crate) fn session_delete(store: &SessionStore, name: &str) -> Result<()> {
    store.delete(name)?;
    println!("{} {}", "Deleted".green(), name.cyan());
    Ok(())
}
