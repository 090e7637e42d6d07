//! User preferences — a small string key/value file (currently only the
//! theme).
//!
//! Values are not validated: whatever the UI stores under
//! `dashboard-theme` is handed back verbatim. Every change is written
//! through immediately; there is no dirty flag or batching.

#[cfg(test)]
#[path = "prefs_test.rs"]
mod prefs_test;

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::consts::THEME_PREF_KEY;

pub const DEFAULT_THEME: &str = "light";

#[derive(Debug, thiserror::Error)]
pub enum PrefsError {
    #[error("preferences io failed for {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("preferences file {path} is malformed: {source}")]
    Decode { path: PathBuf, source: serde_json::Error },
    #[error("preferences encode failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Preferences backed by one JSON object file.
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl PreferenceStore {
    /// Load `path`, starting empty if the file does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns `PrefsError::Io` if the file exists but cannot be read, or
    /// `PrefsError::Decode` if it is not a JSON object of strings.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PrefsError> {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).map_err(|source| PrefsError::Decode { path: path.clone(), source })?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(PrefsError::Io { path, source }),
        };
        debug!(path = %path.display(), entries = values.len(), "preferences loaded");
        Ok(Self { path, values })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Store `value` under `key` and write the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn set(&mut self, key: &str, value: impl Into<String>) -> Result<(), PrefsError> {
        self.values.insert(key.to_owned(), value.into());
        self.write()
    }

    // --- Theme ---

    /// Current theme, `light` until one is chosen.
    #[must_use]
    pub fn theme(&self) -> &str {
        self.get(THEME_PREF_KEY).unwrap_or(DEFAULT_THEME)
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn set_theme(&mut self, theme: impl Into<String>) -> Result<(), PrefsError> {
        let theme = theme.into();
        info!(%theme, "theme changed");
        self.set(THEME_PREF_KEY, theme)
    }

    fn write(&self) -> Result<(), PrefsError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| PrefsError::Io { path: parent.to_path_buf(), source })?;
        }
        let text = serde_json::to_string_pretty(&self.values)?;
        std::fs::write(&self.path, text).map_err(|source| PrefsError::Io { path: self.path.clone(), source })
    }
}
