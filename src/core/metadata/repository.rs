//! core::metadata::repository
//!
//! The forge repository record.
//!
//! Written once by `av init` to `.git/av/repository.json` and treated as
//! immutable afterwards. It pins the forge identity of the repository so
//! later runs do not have to re-derive owner/name from remote URLs.

use std::fs;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::paths::AvPaths;

/// Errors from repository-record I/O.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("repository is not initialized (run 'av init')")]
    NotInitialized,

    #[error("repository record is corrupted at {path}: {message}")]
    Corrupted { path: String, message: String },

    #[error("failed to write repository record: {0}")]
    Write(#[from] std::io::Error),
}

/// Identity of the forge repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    /// Forge-assigned opaque id.
    pub id: String,
    /// Repository owner (user or organization).
    pub owner: String,
    /// Repository name.
    pub name: String,
}

impl RepositoryRecord {
    /// Load the record, failing if `av init` has not been run.
    pub fn load(paths: &AvPaths) -> Result<Self, RepositoryError> {
        let path = paths.repository_record();
        if !path.exists() {
            return Err(RepositoryError::NotInitialized);
        }
        let text = fs::read_to_string(&path)?;
        serde_json::from_str(&text).map_err(|e| RepositoryError::Corrupted {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Load the record if present.
    pub fn try_load(paths: &AvPaths) -> Result<Option<Self>, RepositoryError> {
        match Self::load(paths) {
            Ok(record) => Ok(Some(record)),
            Err(RepositoryError::NotInitialized) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Persist the record.
    pub fn save(&self, paths: &AvPaths) -> Result<(), RepositoryError> {
        paths.ensure_dir()?;
        // Struct serialization cannot fail.
        let text = serde_json::to_string_pretty(self).expect("repository record serialization");
        fs::write(paths.repository_record(), text)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn save_and_load() {
        let dir = tempdir().unwrap();
        let paths = AvPaths::new(dir.path().join(".git"));

        let record = RepositoryRecord {
            id: "R_abc123".into(),
            owner: "octo".into(),
            name: "widgets".into(),
        };
        record.save(&paths).unwrap();

        assert_eq!(RepositoryRecord::load(&paths).unwrap(), record);
    }

    #[test]
    fn missing_record_is_not_initialized() {
        let dir = tempdir().unwrap();
        let paths = AvPaths::new(dir.path().join(".git"));
        assert!(matches!(
            RepositoryRecord::load(&paths),
            Err(RepositoryError::NotInitialized)
        ));
        assert!(RepositoryRecord::try_load(&paths).unwrap().is_none());
    }

    #[test]
    fn corrupt_record_is_an_error() {
        let dir = tempdir().unwrap();
        let paths = AvPaths::new(dir.path().join(".git"));
        paths.ensure_dir().unwrap();
        fs::write(paths.repository_record(), "{ nope").unwrap();
        assert!(matches!(
            RepositoryRecord::load(&paths),
            Err(RepositoryError::Corrupted { .. })
        ));
    }
}
