//! Centralized constants for ai.
//!
//! All magic numbers, default strings, and configuration constants live here
//! so they can be changed in one place.

/// Application name used in CLI output and directory paths.
pub const APP_NAME: &str = "ai";

/// Configuration filename.
pub const CONFIG_FILENAME: &str = "config.toml";

/// Log filename, written under the data directory.
pub const LOG_FILENAME: &str = "ai.log";

/// Readline history filename.
pub const HISTORY_FILENAME: &str = "chat_history.txt";

/// Environment variable that overrides the configured API key.
pub const API_KEY_ENV: &str = "PROXYAPI_API_KEY";

/// Environment variable holding the tracing filter directive.
pub const LOG_ENV: &str = "AI_LOG";

/// Filter used when [`LOG_ENV`] is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,hyper=warn,reqwest=warn";

/// Placeholder key written into a freshly generated config.
pub const API_KEY_PLACEHOLDER: &str = "sk-...";

// --- API defaults ---

/// Default OpenAI-compatible endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.proxyapi.ru/openrouter/v1";

/// Seconds to wait for response headers.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Seconds to wait for each streamed chunk once a response has started.
pub const DEFAULT_CHUNK_TIMEOUT_SECS: u64 = 60;

/// Seconds to wait for the TCP/TLS connection.
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

// --- Models ---

pub const DEFAULT_SEARCH_MODEL: &str = "perplexity/sonar";
pub const DEFAULT_ASK_MODEL: &str = "deepseek/deepseek-v3.2";
pub const DEFAULT_CHAT_MODEL: &str = "anthropic/claude-opus-4.5";

// --- Storage ---

/// Default chats directory (tilde is expanded at load time).
pub const DEFAULT_CHATS_DIR: &str = "~/.local/share/ai/chats";

/// Extension of session files.
pub const SESSION_EXTENSION: &str = "json";

// --- Chat ---

pub const CHAT_TEMPERATURE: f32 = 0.7;
pub const CHAT_MAX_TOKENS: u32 = 4000;

/// Most recent transcript messages sent with each chat request.
pub const CHAT_CONTEXT_MESSAGES: usize = 40;

/// Prefix of generated session names (`chat-YYYYMMDD-HHMMSS`).
pub const SESSION_NAME_PREFIX: &str = "chat";

pub const CHAT_SYSTEM_PROMPT: &str = "You are a thoughtful AI assistant optimized for deep conversations \
and technical discussions. You are helping a technical user who values:
- Direct, honest communication without corporate politeness
- Deep reasoning and nuanced thinking
- Code examples in C++, Python, Rust when relevant
- Arch Linux and FOSS ecosystem knowledge

Engage naturally in extended dialogues. Ask clarifying questions. Provide detailed explanations \
when the topic is complex. Be intellectually curious and explore ideas thoroughly.";

// --- Ask ---

pub const ASK_TEMPERATURE: f32 = 0.4;
pub const ASK_MAX_TOKENS: u32 = 1500;

/// Number of question/answer exchanges allowed per `ai ask`.
pub const ASK_MAX_EXCHANGES: usize = 3;

pub const ASK_SYSTEM_PROMPT: &str = "You are a helpful assistant for quick questions. \
Provide clear, concise answers.

Guidelines:
- Keep responses focused and practical
- Use code examples when relevant
- Prefer bullet points for lists
- Maximum 200 words per response
- Be direct, avoid unnecessary explanations";

// --- Search ---

pub const SEARCH_TEMPERATURE: f32 = 0.3;

pub const SEARCH_SYSTEM_PROMPT: &str = "You are a precise web search assistant. Provide concise, \
factual answers with current information from the web. Structure responses as:
1. Direct answer (1-2 sentences)
2. Key facts (bullet points)
3. Sources (if available)

Keep responses under 300 words. Focus on accuracy and relevance.

IMPORTANT: Do NOT include citation numbers in square brackets like [1], [2], etc. in your \
response. Provide information naturally without reference markers.";
