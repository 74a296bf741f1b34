//! Configuration types and path resolution for ai.
//!
//! Settings live as TOML at the platform's XDG config path
//! (`~/.config/ai/config.toml` on Linux); logs and chats live under the XDG
//! data directory (`~/.local/share/ai/`).

mod loader;
mod paths;
mod resolve;
mod types;

pub use types::Config;

use anyhow::Result;

impl Config {
    /// Load the global config and resolve `{env:VAR}` placeholders.
    /// Writes a default config (and fails) on first run.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_global()?;
        config.resolve_substitutions();
        Ok(config)
    }
}
