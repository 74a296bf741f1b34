//! Struct definitions and serde defaults for ai configuration.

use serde::{Deserialize, Serialize};

use crate::constants;

/// Root configuration for ai, deserialized from `config.toml`.
///
/// Every section uses serde defaults so a partially filled file still
/// yields a usable config.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    /// Endpoint and credentials.
    #[serde(default)]
    pub api: ApiConfig,
    /// Model identifier per command.
    #[serde(default)]
    pub models: ModelsConfig,
    /// Where chat sessions are stored.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Interactive chat tunables.
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Connection details for the OpenAI-compatible endpoint.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ApiConfig {
    /// API key sent as a bearer token. `PROXYAPI_API_KEY` takes precedence.
    #[serde(default)]
    pub proxyapi_key: String,
    /// Base URL; `/chat/completions` is appended to it.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Seconds to wait for the first byte of a response.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Seconds to wait for each chunk of a streamed response.
    #[serde(default = "default_chunk_timeout_secs")]
    pub chunk_timeout_secs: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ModelsConfig {
    #[serde(default = "default_search_model")]
    pub search: String,
    #[serde(default = "default_ask_model")]
    pub ask: String,
    #[serde(default = "default_chat_model")]
    pub chat: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StorageConfig {
    /// Directory holding one JSON file per chat session. `~` is expanded.
    #[serde(default = "default_chats_dir")]
    pub chats_dir: String,
    /// Save the session after every completed turn.
    #[serde(default = "default_true")]
    pub autosave: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChatConfig {
    /// Overrides the built-in chat system prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(default = "default_chat_temperature")]
    pub temperature: f32,
    #[serde(default = "default_chat_max_tokens")]
    pub max_tokens: u32,
    /// Most recent transcript messages sent with each request.
    #[serde(default = "default_context_messages")]
    pub context_messages: usize,
}

fn default_base_url() -> String {
    constants::DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    constants::DEFAULT_TIMEOUT_SECS
}

fn default_chunk_timeout_secs() -> u64 {
    constants::DEFAULT_CHUNK_TIMEOUT_SECS
}

fn default_search_model() -> String {
    constants::DEFAULT_SEARCH_MODEL.to_string()
}

fn default_ask_model() -> String {
    constants::DEFAULT_ASK_MODEL.to_string()
}

fn default_chat_model() -> String {
    constants::DEFAULT_CHAT_MODEL.to_string()
}

fn default_chats_dir() -> String {
    constants::DEFAULT_CHATS_DIR.to_string()
}

fn default_true() -> bool {
    true
}

fn default_chat_temperature() -> f32 {
    constants::CHAT_TEMPERATURE
}

fn default_chat_max_tokens() -> u32 {
    constants::CHAT_MAX_TOKENS
}

fn default_context_messages() -> usize {
    constants::CHAT_CONTEXT_MESSAGES
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            proxyapi_key: String::new(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            chunk_timeout_secs: default_chunk_timeout_secs(),
        }
    }
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            search: default_search_model(),
            ask: default_ask_model(),
            chat: default_chat_model(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            chats_dir: default_chats_dir(),
            autosave: true,
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            system_prompt: None,
            temperature: default_chat_temperature(),
            max_tokens: default_chat_max_tokens(),
            context_messages: default_context_messages(),
        }
    }
}
