pub mod signing;

use anyhow::{Result, bail};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

/// Manages on-disk object storage.
///
/// Each object is stored as a single flat file at `{dir}/{key}`, where the
/// key is `{folder_id}/{file_id}`. Keys are write-once: an upload never
/// overwrites an existing object.
pub struct Storage {
    dir: PathBuf,
}

impl Storage {
    pub async fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Object storage directory: {}", dir.display());
        Ok(Self { dir })
    }

    /// Absolute path for a storage key. Rejects keys that would escape the
    /// storage directory.
    pub fn object_path(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.starts_with('/') || key.split('/').any(|seg| seg == "..") {
            bail!("Invalid storage key: {}", key);
        }
        Ok(self.dir.join(key))
    }

    /// Write an object. The key must not already exist.
    pub async fn put(&self, key: &str, data: &[u8]) -> Result<()> {
        let path = self.object_path(key)?;
        if fs::try_exists(&path).await? {
            bail!("Storage key already exists: {}", key);
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, data).await?;
        Ok(())
    }

    pub async fn read(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.object_path(key)?;
        Ok(fs::read(&path).await?)
    }

    pub async fn exists(&self, key: &str) -> Result<bool> {
        let path = self.object_path(key)?;
        Ok(fs::try_exists(&path).await?)
    }

    /// Remove a batch of objects. Missing objects are not an error; genuine
    /// IO failures are collected and returned so the caller can log the keys
    /// for reconciliation.
    pub async fn remove(&self, keys: &[String]) -> Vec<(String, anyhow::Error)> {
        let mut failures = Vec::new();
        for key in keys {
            let path = match self.object_path(key) {
                Ok(p) => p,
                Err(e) => {
                    failures.push((key.clone(), e));
                    continue;
                }
            };
            match fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    warn!("Storage object already gone: {}", key);
                }
                Err(e) => failures.push((key.clone(), e.into())),
            }
        }
        failures
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
