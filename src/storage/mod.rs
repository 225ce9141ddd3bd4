//! Card image storage
//!
//! Images are keyed by file name. Two backends exist: a local directory and
//! an S3-compatible bucket; both sit behind [`ImageStorage`].

mod local;
mod s3_client;

pub use local::LocalImageStorage;
pub use s3_client::{S3Client, S3ImageStorage};

use std::path::PathBuf;
use std::sync::Arc;

use crate::cards::IMAGE_EXTENSION;
use crate::config::{ImageBackend, StorageConfig};
use crate::error::{AppError, Result, StorageError};

/// Trait for image storage backends
#[async_trait::async_trait]
pub trait ImageStorage: Send + Sync {
    /// Store an image, replacing any existing one with the same name
    async fn put(&self, name: &str, data: &[u8]) -> std::result::Result<(), StorageError>;

    /// Read an image
    async fn get(&self, name: &str) -> std::result::Result<Vec<u8>, StorageError>;

    /// Check whether an image exists
    async fn exists(&self, name: &str) -> std::result::Result<bool, StorageError>;
}

/// Image store with name validation over a pluggable backend
#[derive(Clone)]
pub struct ImageStore {
    backend: Arc<dyn ImageStorage>,
}

impl ImageStore {
    pub fn new(backend: Arc<dyn ImageStorage>) -> Self {
        Self { backend }
    }

    /// Create with local filesystem storage
    pub fn with_local_storage(dir: PathBuf) -> Self {
        Self::new(Arc::new(LocalImageStorage::new(dir)))
    }

    /// Create the backend selected in configuration
    pub async fn from_config(config: &StorageConfig) -> Result<Self> {
        match config.backend {
            ImageBackend::Local => Ok(Self::with_local_storage(config.image_dir.clone())),
            ImageBackend::S3 => {
                let s3 = config.s3.as_ref().ok_or_else(|| {
                    AppError::Internal("IMAGE_BACKEND=s3 but S3 is not configured".to_string())
                })?;
                let client = S3Client::new(s3).await?;
                Ok(Self::new(Arc::new(S3ImageStorage::new(client, s3.prefix.clone()))))
            }
        }
    }

    pub async fn save(&self, name: &str, data: &[u8]) -> Result<()> {
        validate_image_name(name)?;
        self.backend.put(name, data).await?;
        tracing::info!(image = %name, bytes = data.len(), "Image stored");
        Ok(())
    }

    pub async fn load(&self, name: &str) -> Result<Vec<u8>> {
        validate_image_name(name)?;
        Ok(self.backend.get(name).await?)
    }

    pub async fn exists(&self, name: &str) -> Result<bool> {
        validate_image_name(name)?;
        Ok(self.backend.exists(name).await?)
    }
}

/// Image names are plain file names with the catalog's image extension
pub fn validate_image_name(name: &str) -> std::result::Result<(), StorageError> {
    let stem = name.strip_suffix(IMAGE_EXTENSION).unwrap_or_default();
    let valid = !stem.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\', '\0'])
        && !name.contains("..");

    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidName(name.to_string()))
    }
}
