//! Dashboard repository — where `load_dashboard` reads and `save_dashboard` writes.
//!
//! DESIGN
//! ======
//! The store only knows the [`DashboardRepository`] trait, so hosts pick the
//! backing medium. Two implementations ship here: an in-process map (the
//! default, also used in tests) and a directory of JSON files, one per
//! dashboard.
//!
//! ERROR HANDLING
//! ==============
//! A missing dashboard is `Ok(None)`, not an error. I/O and decode failures
//! surface as [`RepoError`] and are wrapped by the store.

#[cfg(test)]
#[path = "repo_test.rs"]
mod repo_test;

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::model::{Dashboard, DashboardId};

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("dashboard io failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("dashboard {path} is not valid JSON: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("dashboard encode failed: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("invalid dashboard id: {0:?}")]
    InvalidId(String),
}

/// Storage backend for whole dashboards. Enables swapping media in tests.
pub trait DashboardRepository: Send + Sync {
    /// Fetch a dashboard by id.
    ///
    /// # Errors
    ///
    /// Returns a [`RepoError`] if the backend cannot be read.
    fn load(&self, id: &str) -> Result<Option<Dashboard>, RepoError>;

    /// Store a dashboard, replacing any previous version with the same id.
    ///
    /// # Errors
    ///
    /// Returns a [`RepoError`] if the backend cannot be written.
    fn save(&self, dashboard: &Dashboard) -> Result<(), RepoError>;
}

// =============================================================================
// MEMORY
// =============================================================================

/// Process-local repository. Contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    dashboards: Mutex<HashMap<DashboardId, Dashboard>>,
}

impl MemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored dashboards.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dashboards.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DashboardRepository for MemoryRepository {
    fn load(&self, id: &str) -> Result<Option<Dashboard>, RepoError> {
        let dashboards = self.dashboards.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(dashboards.get(id).cloned())
    }

    fn save(&self, dashboard: &Dashboard) -> Result<(), RepoError> {
        let mut dashboards = self.dashboards.lock().unwrap_or_else(PoisonError::into_inner);
        dashboards.insert(dashboard.id.clone(), dashboard.clone());
        Ok(())
    }
}

// =============================================================================
// JSON FILES
// =============================================================================

/// One `<id>.json` file per dashboard under a root directory.
#[derive(Debug, Clone)]
pub struct JsonFileRepository {
    root: PathBuf,
}

impl JsonFileRepository {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: &str) -> Result<PathBuf, RepoError> {
        let valid = !id.is_empty()
            && id.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !id.starts_with('.');
        if !valid {
            return Err(RepoError::InvalidId(id.to_owned()));
        }
        Ok(self.root.join(format!("{id}.json")))
    }
}

impl DashboardRepository for JsonFileRepository {
    fn load(&self, id: &str) -> Result<Option<Dashboard>, RepoError> {
        let path = self.path_for(id)?;
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(RepoError::Io { path, source }),
        };
        let dashboard = serde_json::from_str(&text).map_err(|source| RepoError::Decode { path: path.clone(), source })?;
        debug!(path = %path.display(), "dashboard read");
        Ok(Some(dashboard))
    }

    fn save(&self, dashboard: &Dashboard) -> Result<(), RepoError> {
        let path = self.path_for(&dashboard.id)?;
        std::fs::create_dir_all(&self.root).map_err(|source| RepoError::Io { path: self.root.clone(), source })?;
        let text = serde_json::to_string_pretty(dashboard).map_err(RepoError::Encode)?;
        std::fs::write(&path, text).map_err(|source| RepoError::Io { path: path.clone(), source })?;
        debug!(path = %path.display(), "dashboard written");
        Ok(())
    }
}
