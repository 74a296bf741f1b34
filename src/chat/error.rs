use thiserror::Error;

use crate::provider::ApiError;
use crate::session::StoreError;

/// Everything a chat turn or command can fail with. None of these end the
/// session; the REPL reports them and keeps reading input.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("unknown command: {0} (try /help)")]
    UnknownCommand(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("chat '{0}' already exists; use /load {0}")]
    SessionExists(String),

    #[error("a reply is still streaming")]
    Busy,

    #[error("the chat session has ended")]
    Terminated,
}
