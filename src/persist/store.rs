//! Whole-collection JSON config store

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::registry::StreamConfig;

/// Persistence failures
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("config store I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("config store format error: {0}")]
    Format(#[from] serde_json::Error),
}

/// Reads and writes the persisted stream set as a single JSON file
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Platform config location, e.g. `~/.config/livecast/streams.json`.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "livecast")
            .map(|dirs| dirs.config_dir().join("streams.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the whole stream set. A missing file is an empty set, never an
    /// error.
    pub async fn load(&self) -> Result<Vec<StreamConfig>, PersistError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write the whole stream set, creating parent directories as needed.
    pub async fn save(&self, entries: &[StreamConfig]) -> Result<(), PersistError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(entries)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}
