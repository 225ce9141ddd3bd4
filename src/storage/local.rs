//! Local filesystem image storage

use std::path::PathBuf;

use super::ImageStorage;
use crate::error::StorageError;
use crate::fsutil::write_atomic;

/// Stores images as files in one directory
pub struct LocalImageStorage {
    dir: PathBuf,
}

impl LocalImageStorage {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

#[async_trait::async_trait]
impl ImageStorage for LocalImageStorage {
    async fn put(&self, name: &str, data: &[u8]) -> Result<(), StorageError> {
        // Readers see either the previous image or the complete new one
        write_atomic(&self.dir.join(name), data).await?;
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Vec<u8>, StorageError> {
        match tokio::fs::read(self.dir.join(name)).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::ObjectNotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, name: &str) -> Result<bool, StorageError> {
        Ok(tokio::fs::try_exists(self.dir.join(name)).await?)
    }
}
