//! File loading for ai configuration.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

use super::types::Config;
use crate::constants;

impl Config {
    /// Loads the config from `~/.config/ai/config.toml`.
    ///
    /// If no config file exists, writes a commented default and fails so the
    /// user fills in the API key before the first request.
    pub(super) fn load_global() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            Self::write_default(&path)?;
            bail!(
                "Created config file {}\nAdd your API key to [api] proxyapi_key (or set {}) and run again.",
                path.display(),
                constants::API_KEY_ENV
            );
        }
        Self::load_from(&path)
    }

    /// Parses a config file at an explicit path.
    pub(super) fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config at {:?}", path))
    }

    pub(super) fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Writes the default config template, creating parent directories.
    pub(super) fn write_default(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, default_toml())
            .with_context(|| format!("Failed to write default config to {:?}", path))?;
        tracing::info!(path = %path.display(), "wrote default config");
        Ok(())
    }
}

/// The template written on first run.
pub(super) fn default_toml() -> String {
    format!(
        r#"[api]
proxyapi_key = "{key}"
base_url = "{base_url}"
# timeout_secs = {timeout}
# chunk_timeout_secs = {chunk_timeout}

[models]
search = "{search}"
ask = "{ask}"
chat = "{chat}"

[storage]
chats_dir = "{chats_dir}"
autosave = true

[chat]
# system_prompt = "..."
temperature = {temperature}
max_tokens = {max_tokens}
context_messages = {context}
"#,
        key = constants::API_KEY_PLACEHOLDER,
        base_url = constants::DEFAULT_BASE_URL,
        timeout = constants::DEFAULT_TIMEOUT_SECS,
        chunk_timeout = constants::DEFAULT_CHUNK_TIMEOUT_SECS,
        search = constants::DEFAULT_SEARCH_MODEL,
        ask = constants::DEFAULT_ASK_MODEL,
        chat = constants::DEFAULT_CHAT_MODEL,
        chats_dir = constants::DEFAULT_CHATS_DIR,
        temperature = constants::CHAT_TEMPERATURE,
        max_tokens = constants::CHAT_MAX_TOKENS,
        context = constants::CHAT_CONTEXT_MESSAGES,
    )
}
