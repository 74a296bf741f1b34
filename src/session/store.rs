//! File-backed [`SessionStore`].

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::{file_stem, Session, StoreError};
use crate::constants::SESSION_EXTENSION;

/// Durable mapping from session name to [`Session`] snapshot.
///
/// Owns one directory; every session lives in `<dir>/<stem>.json`.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the canonical file path for a session name.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", file_stem(name), SESSION_EXTENSION))
    }

    fn temp_path_for(&self, name: &str) -> PathBuf {
        self.dir
            .join(format!(".{}.{}.tmp", file_stem(name), SESSION_EXTENSION))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).is_file()
    }

    /// Writes the session to its canonical location and returns that path.
    ///
    /// The JSON is written to a sibling temp file, synced, then renamed over
    /// the target. On any failure the temp file is removed and the previous
    /// version stays in place.
    pub fn save(&self, session: &Session) -> Result<PathBuf, StoreError> {
        let path = self.path_for(&session.name);
        fs::create_dir_all(&self.dir).map_err(|source| StoreError::Persistence {
            path: self.dir.clone(),
            source,
        })?;

        let json = serde_json::to_string_pretty(session).map_err(|e| StoreError::Persistence {
            path: path.clone(),
            source: e.into(),
        })?;

        let tmp_path = self.temp_path_for(&session.name);
        let written = write_synced(&tmp_path, json.as_bytes())
            .and_then(|()| fs::rename(&tmp_path, &path));
        if let Err(source) = written {
            let _ = fs::remove_file(&tmp_path);
            warn!(path = %path.display(), error = %source, "session save failed");
            return Err(StoreError::Persistence { path, source });
        }

        info!(
            name = %session.name,
            messages = session.messages.len(),
            path = %path.display(),
            "session saved"
        );
        Ok(path)
    }

    /// Reads a session by name.
    pub fn load(&self, name: &str) -> Result<Session, StoreError> {
        let path = self.path_for(name);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(name.to_string()))
            }
            Err(e) => {
                return Err(StoreError::Corrupt {
                    name: name.to_string(),
                    reason: e.to_string(),
                })
            }
        };
        let session = parse_session(&contents).map_err(|reason| StoreError::Corrupt {
            name: name.to_string(),
            reason,
        })?;
        if session.name != name {
            warn!(
                path = %path.display(),
                stored = %session.name,
                "session file holds another name"
            );
            return Err(StoreError::NotFound(name.to_string()));
        }
        debug!(name = %session.name, messages = session.messages.len(), "session loaded");
        Ok(session)
    }

    /// Lists the names of all stored sessions in lexical order.
    ///
    /// Names come from each file's `name` field. Files that cannot be read or
    /// parsed are skipped. A missing directory yields an empty list.
    pub fn list(&self) -> Result<Vec<String>, StoreError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Persistence {
                    path: self.dir.clone(),
                    source,
                })
            }
        };

        let mut names = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if !is_session_file(&path) {
                continue;
            }
            match fs::read_to_string(&path)
                .map_err(|e| e.to_string())
                .and_then(|c| parse_session(&c))
            {
                Ok(session) => names.push(session.name),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable session"),
            }
        }
        names.sort();
        names.dedup();
        Ok(names)
    }

    /// Removes a stored session.
    pub fn delete(&self, name: &str) -> Result<(), StoreError> {
        let path = self.path_for(name);
        match fs::remove_file(&path) {
            Ok(()) => {
                info!(name, "session deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(name.to_string()))
            }
            Err(source) => Err(StoreError::Persistence { path, source }),
        }
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

fn is_session_file(path: &Path) -> bool {
    let visible = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| !n.starts_with('.'))
        .unwrap_or(false);
    visible
        && path.is_file()
        && path
            .extension()
            .map(|e| e == SESSION_EXTENSION)
            .unwrap_or(false)
}

fn parse_session(contents: &str) -> Result<Session, String> {
    let session: Session = serde_json::from_str(contents).map_err(|e| e.to_string())?;
    session.validate()?;
    Ok(session)
}
