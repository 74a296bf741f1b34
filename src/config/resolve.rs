//! Environment variable substitution and API key resolution.

use anyhow::{bail, Result};

use super::types::Config;
use crate::constants::{API_KEY_ENV, API_KEY_PLACEHOLDER};

impl Config {
    /// Resolve {env:VAR_NAME} patterns in string fields.
    pub(super) fn resolve_substitutions(&mut self) {
        self.api.proxyapi_key = Self::resolve_str(&self.api.proxyapi_key);
        self.api.base_url = Self::resolve_str(&self.api.base_url);
        self.models.search = Self::resolve_str(&self.models.search);
        self.models.ask = Self::resolve_str(&self.models.ask);
        self.models.chat = Self::resolve_str(&self.models.chat);
        self.storage.chats_dir = Self::resolve_str(&self.storage.chats_dir);
        if let Some(ref mut sp) = self.chat.system_prompt {
            *sp = Self::resolve_str(sp);
        }
    }

    /// Replace {env:VAR} with the environment variable value.
    pub(super) fn resolve_str(s: &str) -> String {
        let mut result = s.to_string();
        while let Some(start) = result.find("{env:") {
            if let Some(end) = result[start..].find('}') {
                let var_name = &result[start + 5..start + end];
                let value = std::env::var(var_name).unwrap_or_default();
                result = format!(
                    "{}{}{}",
                    &result[..start],
                    value,
                    &result[start + end + 1..]
                );
            } else {
                break;
            }
        }
        result
    }

    /// Resolve the API key: env var first, then config value.
    ///
    /// # Errors
    ///
    /// Fails when neither source holds a real key (empty or the `sk-...`
    /// placeholder written into the default config).
    pub fn api_key(&self) -> Result<String> {
        if let Ok(val) = std::env::var(API_KEY_ENV) {
            if !val.is_empty() {
                return Ok(val);
            }
        }
        Self::check_key(&self.api.proxyapi_key)
    }

    pub(super) fn check_key(key: &str) -> Result<String> {
        let key = key.trim();
        if key.is_empty() || key == API_KEY_PLACEHOLDER {
            let path = Self::config_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| "config.toml".to_string());
            bail!(
                "API key is not configured. Set [api] proxyapi_key in {} or export {}",
                path,
                API_KEY_ENV
            );
        }
        Ok(key.to_string())
    }

    /// The chat system prompt, configured or built in.
    pub fn chat_system_prompt(&self) -> &str {
        self.chat
            .system_prompt
            .as_deref()
            .unwrap_or(crate::constants::CHAT_SYSTEM_PROMPT)
    }
}
