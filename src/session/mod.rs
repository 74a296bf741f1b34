//! Session persistence for ai.
//!
//! Each chat session is stored as one pretty-printed JSON document under the
//! configured chats directory (`~/.local/share/ai/chats/` by default). Files
//! are rewritten in full through a temp file and rename, so a save either
//! replaces the previous version completely or leaves it untouched.

mod store;

pub use store::SessionStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::message::{Message, Role};

/// A named conversation transcript plus the model it talks to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub name: String,
    pub created: DateTime<Utc>,
    pub model: String,
    pub messages: Vec<Message>,
}

/// Errors raised by [`SessionStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("chat '{0}' not found")]
    NotFound(String),

    #[error("chat '{name}' is corrupt: {reason}")]
    Corrupt { name: String, reason: String },

    #[error("could not write {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Session {
    /// Creates an empty session. Without a name, one is generated from the
    /// current local time (`chat-YYYYMMDD-HHMMSS`).
    pub fn new(name: Option<String>, model: impl Into<String>) -> Self {
        let name = name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(default_name);
        Self {
            name,
            created: Utc::now(),
            model: model.into(),
            messages: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Checks the stored-transcript schema: user and assistant turns that
    /// alternate, starting with the user. A trailing unanswered question is
    /// allowed.
    fn validate(&self) -> Result<(), String> {
        if let Some(pos) = self.messages.iter().position(|m| m.role == Role::System) {
            return Err(format!("message {} has role 'system'", pos));
        }
        for (pos, message) in self.messages.iter().enumerate() {
            let expected = if pos % 2 == 0 { Role::User } else { Role::Assistant };
            if message.role != expected {
                return Err(format!(
                    "message {} breaks user/assistant alternation",
                    pos
                ));
            }
        }
        Ok(())
    }
}

fn default_name() -> String {
    format!(
        "{}-{}",
        crate::constants::SESSION_NAME_PREFIX,
        chrono::Local::now().format("%Y%m%d-%H%M%S")
    )
}

/// Maps a session name to a file stem that is safe on every platform.
///
/// `%`, path separators, control characters and characters reserved on
/// Windows are percent-encoded, as is a leading dot, so names never produce
/// hidden files or `..` traversal and distinct names never share a file.
pub(crate) fn file_stem(name: &str) -> String {
    if name.is_empty() {
        return "%".to_string();
    }
    let mut stem = String::with_capacity(name.len());
    for (i, c) in name.char_indices() {
        let escape = match c {
            '%' | '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => true,
            '.' => i == 0,
            c => c.is_control(),
        };
        if escape {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                stem.push_str(&format!("%{:02X}", byte));
            }
        } else {
            stem.push(c);
        }
    }
    stem
}
