//! XDG path resolution for ai configuration and data directories.

use anyhow::Result;
use std::path::{Path, PathBuf};

use super::types::Config;

impl Config {
    /// Returns the platform-specific configuration directory for ai.
    ///
    /// Returns `~/.config/ai/` on Linux (`XDG_CONFIG_HOME/ai`).
    ///
    /// # Errors
    ///
    /// Returns an error if the platform's config directory cannot be determined.
    pub fn config_dir() -> Result<PathBuf> {
        let dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
            .join(crate::constants::APP_NAME);
        Ok(dir)
    }

    /// Returns the platform-specific data directory for ai.
    ///
    /// Returns `~/.local/share/ai/` on Linux (`XDG_DATA_HOME/ai`).
    /// Holds the log file and, by default, the chats directory.
    pub fn data_dir() -> Result<PathBuf> {
        let dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?
            .join(crate::constants::APP_NAME);
        Ok(dir)
    }

    /// Returns the platform-specific cache directory for ai.
    ///
    /// Used for readline history.
    pub fn cache_dir() -> Result<PathBuf> {
        let dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine cache directory"))?
            .join(crate::constants::APP_NAME);
        Ok(dir)
    }

    /// Returns the full path to the configuration file.
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(crate::constants::CONFIG_FILENAME))
    }

    /// Returns the chats directory with a leading `~` expanded.
    pub fn chats_dir(&self) -> PathBuf {
        expand_tilde(&self.storage.chats_dir, dirs::home_dir().as_deref())
    }
}

/// Expands a leading `~` or `~/` against `home`. Other paths pass through.
pub(super) fn expand_tilde(path: &str, home: Option<&Path>) -> PathBuf {
    match (path, home) {
        ("~", Some(home)) => home.to_path_buf(),
        (p, Some(home)) if p.starts_with("~/") => home.join(&p[2..]),
        (p, _) => PathBuf::from(p),
    }
}
