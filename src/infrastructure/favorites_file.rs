// src/infrastructure/favorites_file.rs
use crate::application::{FavoriteStorage, FAVORITES_KEY};
use crate::domain::DomainError;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, instrument};

/// Favorites persisted as one JSON file named after the storage key.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    /// Store inside `dir` as `poem_app_favorites.json`.
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            path: dir.as_ref().join(format!("{FAVORITES_KEY}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FavoriteStorage for JsonFileStorage {
    #[instrument(level = "trace", skip(self), fields(path = %self.path.display()))]
    fn load(&self) -> Result<Option<String>, DomainError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No favorites file yet");
                Ok(None)
            }
            Err(e) => Err(DomainError::Storage(format!(
                "Failed to read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    /// Write through a temp file in the same directory so readers never see a partial file.
    #[instrument(level = "trace", skip(self, raw), fields(path = %self.path.display()))]
    fn save(&self, raw: &str) -> Result<(), DomainError> {
        let dir = self
            .path
            .parent()
            .ok_or_else(|| DomainError::Storage("favorites path has no parent".to_string()))?;
        fs::create_dir_all(dir)
            .map_err(|e| DomainError::Storage(format!("Failed to create {}: {}", dir.display(), e)))?;

        let mut tmp = NamedTempFile::new_in(dir)
            .map_err(|e| DomainError::Storage(format!("Failed to create temp file: {e}")))?;
        tmp.write_all(raw.as_bytes())
            .map_err(|e| DomainError::Storage(format!("Failed to write favorites: {e}")))?;
        tmp.persist(&self.path).map_err(|e| {
            DomainError::Storage(format!("Failed to replace {}: {}", self.path.display(), e))
        })?;
        Ok(())
    }
}
