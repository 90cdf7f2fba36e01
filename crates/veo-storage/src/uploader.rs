//! Video uploader.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, info};

use veo_models::{StoredVideoLocator, VideoAsset};

use crate::error::{StorageError, StorageResult};
use crate::keys::upload_key;

/// Minimal object store contract used by the pipeline.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Bucket (or container) name.
    fn bucket(&self) -> &str;

    /// Scheme used when rendering locators, e.g. "gs".
    fn locator_scheme(&self) -> &str;

    /// Single-shot, non-resumable write.
    async fn put(&self, data: Bytes, key: &str, content_type: &str) -> StorageResult<()>;

    /// Delete an object.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Check that the bucket is reachable.
    async fn check_connectivity(&self) -> StorageResult<()>;
}

/// Persists uploaded videos and hands out durable locators.
#[derive(Clone)]
pub struct VideoUploader {
    store: Arc<dyn ObjectStore>,
}

impl VideoUploader {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Upload a video under a fresh destination key.
    pub async fn upload(&self, asset: &VideoAsset) -> StorageResult<StoredVideoLocator> {
        let key = upload_key(&asset.filename);
        debug!("Uploading {} ({} bytes) to {}", asset.filename, asset.size, key);

        self.store
            .put(asset.data.clone(), &key, &asset.mime_type)
            .await?;

        let locator = StoredVideoLocator::new(
            self.store.locator_scheme(),
            self.store.bucket(),
            key,
            asset.mime_type.clone(),
        );
        info!("Uploaded {} to {}", asset.filename, locator);
        Ok(locator)
    }

    /// Delete a previously uploaded video.
    pub async fn delete(&self, locator: &StoredVideoLocator) -> StorageResult<()> {
        if locator.bucket != self.store.bucket() {
            return Err(StorageError::InvalidKey(format!(
                "{} does not belong to bucket {}",
                locator,
                self.store.bucket()
            )));
        }
        self.store.delete(&locator.key).await
    }
}
