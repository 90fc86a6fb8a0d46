use std::io::ErrorKind;
use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs;

use super::blob::BlobStore;

/// Filesystem-backed blob store. Each named blob is one JSON file under the
/// configured data directory. Used in development and as the fallback when
/// the object store is unreachable.
pub struct LocalBlobStore {
    base_dir: PathBuf,
}

impl LocalBlobStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.base_dir.join(name)
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn get(&self, name: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.path_for(name)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).context("failed to read local blob"),
        }
    }

    async fn put(&self, name: &str, bytes: Vec<u8>) -> Result<()> {
        fs::create_dir_all(&self.base_dir)
            .await
            .context("failed to create data directory")?;
        fs::write(self.path_for(name), bytes)
            .await
            .context("failed to write local blob")?;
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<()> {
        match fs::remove_file(self.path_for(name)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).context("failed to delete local blob"),
        }
    }
}
