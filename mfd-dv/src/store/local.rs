//! Filesystem object store under the root folder

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use mfd_common::{Error, Result};
use tracing::debug;

use super::ObjectStore;

/// Objects stored as plain files below a base directory
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    base: PathBuf,
}

impl LocalObjectStore {
    pub fn new(base: impl AsRef<Path>) -> Self {
        Self {
            base: base.as_ref().to_path_buf(),
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Absolute location of an object; only plain relative paths are accepted
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        let plain = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if path.is_empty() || !plain {
            return Err(Error::InvalidInput(format!("Invalid object path: {}", path)));
        }
        Ok(self.base.join(relative))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>> {
        let full = self.resolve(path)?;
        debug!(path = %full.display(), "Reading object");
        tokio::fs::read(&full).await.map_err(|e| Error::Download {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }

    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<()> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full, bytes).await?;
        Ok(())
    }
}
