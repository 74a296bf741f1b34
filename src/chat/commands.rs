//! Parsing of chat input lines into slash commands and messages.

use super::ChatError;

/// One line of user input, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Input {
    /// Blank line; ignored.
    Empty,
    Command(Command),
    /// Conversational text for the model.
    Message(String),
}

/// Session-control commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    /// `/new [name]`
    New(Option<String>),
    /// `/load <name>`
    Load(String),
    /// `/list`
    List,
    /// `/save`
    Save,
    /// `/exit`
    Exit,
    /// `/help`
    Help,
}

/// Classifies an input line.
///
/// Lines starting with `/` are commands; the rest of the line (whitespace
/// normalized) is the argument. Unrecognised commands are rejected with
/// [`ChatError::UnknownCommand`].
pub(crate) fn parse_input(line: &str) -> Result<Input, ChatError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Input::Empty);
    }
    if !line.starts_with('/') {
        return Ok(Input::Message(line.to_string()));
    }

    let mut words = line.split_whitespace();
    let command = words.next().unwrap_or(line);
    let arg = words.collect::<Vec<_>>().join(" ");
    let arg = (!arg.is_empty()).then_some(arg);

    let command = match command {
        "/new" => Command::New(arg),
        "/load" => Command::Load(arg.ok_or(ChatError::Usage("/load <name>"))?),
        "/list" => Command::List,
        "/save" => Command::Save,
        "/exit" | "/quit" => Command::Exit,
        "/help" => Command::Help,
        other => return Err(ChatError::UnknownCommand(other.to_string())),
    };
    Ok(Input::Command(command))
}

/// Lines printed by `/help` and the chat banner: (command, description).
pub(crate) const HELP: &[(&str, &str)] = &[
    ("/new [name]", "start a new chat (saves the current one first)"),
    ("/load <name>", "switch to a saved chat"),
    ("/list", "list saved chats"),
    ("/save", "save the current chat"),
    ("/exit", "leave (asks before dropping unsaved messages)"),
    ("/help", "show this help"),
    ("Ctrl+C", "stop the reply being streamed"),
];
