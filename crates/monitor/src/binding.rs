//! Persistent link between this device and a parent account.
//!
//! Stored as a small JSON file, written once after a successful link and
//! read at every start.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum BindingError {
    #[error("Binding file I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Binding file {path} is corrupt: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Device is not linked; run `family-guard-monitor link` first")]
    NotLinked,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceBinding {
    pub parent_id: Uuid,
    pub child_id: Uuid,
    pub device_token: String,
    pub linked_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct BindingStore {
    path: PathBuf,
}

impl BindingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored binding, or `None` when the device was never linked.
    pub fn load(&self) -> Result<Option<DeviceBinding>, BindingError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(BindingError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| BindingError::Json {
                path: self.path.clone(),
                source,
            })
    }

    pub fn require(&self) -> Result<DeviceBinding, BindingError> {
        self.load()?.ok_or(BindingError::NotLinked)
    }

    /// Writes through a temporary file and rename so a crash never leaves a
    /// half-written binding.
    pub fn save(&self, binding: &DeviceBinding) -> Result<(), BindingError> {
        let io_err = |source| BindingError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(io_err)?;
            }
        }

        let json = serde_json::to_vec_pretty(binding).map_err(|source| BindingError::Json {
            path: self.path.clone(),
            source,
        })?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding() -> DeviceBinding {
        DeviceBinding {
            parent_id: Uuid::new_v4(),
            child_id: Uuid::new_v4(),
            device_token: "fgd_abcdefgh".into(),
            linked_at: Utc::now(),
        }
    }

    #[test]
    fn test_missing_file_means_not_linked() {
        let dir = tempfile::tempdir().unwrap();
        let store = BindingStore::new(dir.path().join("binding.json"));
        assert!(store.load().unwrap().is_none());
        assert!(matches!(store.require(), Err(BindingError::NotLinked)));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = BindingStore::new(dir.path().join("nested/state/binding.json"));
        let saved = binding();

        store.save(&saved).unwrap();
        assert_eq!(store.load().unwrap(), Some(saved.clone()));
        assert!(!dir.path().join("nested/state/binding.json.tmp").exists());

        let replacement = binding();
        store.save(&replacement).unwrap();
        assert_eq!(store.require().unwrap(), replacement);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("binding.json");
        std::fs::write(&path, b"{not json").unwrap();

        let store = BindingStore::new(&path);
        assert!(matches!(store.load(), Err(BindingError::Json { .. })));
    }
}
