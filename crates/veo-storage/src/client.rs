//! S3-compatible client implementation.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};
use crate::uploader::ObjectStore;

/// Configuration for the S3-compatible client.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// S3 API endpoint URL (GCS interop, R2); `None` for AWS S3
    pub endpoint_url: Option<String>,
    /// Access key ID
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// Bucket name
    pub bucket_name: String,
    /// Region ("auto" for R2 and GCS interop)
    pub region: String,
    /// Scheme for locators handed to the vision model ("gs" for GCS)
    pub locator_scheme: String,
}

impl StorageConfig {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        let bucket_name = std::env::var("STORAGE_BUCKET")
            .map_err(|_| StorageError::config_error("STORAGE_BUCKET not set"))?;
        if bucket_name.trim().is_empty() {
            return Err(StorageError::config_error("STORAGE_BUCKET cannot be empty"));
        }

        Ok(Self {
            endpoint_url: std::env::var("STORAGE_ENDPOINT_URL")
                .ok()
                .filter(|s| !s.is_empty()),
            access_key_id: std::env::var("STORAGE_ACCESS_KEY_ID")
                .map_err(|_| StorageError::config_error("STORAGE_ACCESS_KEY_ID not set"))?,
            secret_access_key: std::env::var("STORAGE_SECRET_ACCESS_KEY")
                .map_err(|_| StorageError::config_error("STORAGE_SECRET_ACCESS_KEY not set"))?,
            bucket_name,
            region: std::env::var("STORAGE_REGION").unwrap_or_else(|_| "auto".to_string()),
            locator_scheme: std::env::var("STORAGE_LOCATOR_SCHEME")
                .unwrap_or_else(|_| "gs".to_string()),
        })
    }
}

/// S3-compatible object store client.
#[derive(Clone)]
pub struct S3Store {
    client: Client,
    bucket: String,
    locator_scheme: String,
}

impl S3Store {
    /// Create a new client from configuration.
    pub fn new(config: StorageConfig) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "veo-storage",
        );

        let mut builder = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region))
            .credentials_provider(credentials);

        if let Some(endpoint) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self {
            client: Client::from_conf(builder.build()),
            bucket: config.bucket_name,
            locator_scheme: config.locator_scheme,
        }
    }

    /// Create from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self::new(StorageConfig::from_env()?))
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn locator_scheme(&self) -> &str {
        &self.locator_scheme
    }

    async fn put(&self, data: Bytes, key: &str, content_type: &str) -> StorageResult<()> {
        debug!("Uploading {} bytes to {}", data.len(), key);
        let len = data.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        info!("Uploaded {} bytes to {}/{}", len, self.bucket, key);
        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        debug!("Deleting {}", key);

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::delete_failed(e.to_string()))?;

        Ok(())
    }

    async fn check_connectivity(&self) -> StorageResult<()> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| StorageError::AwsSdk(format!("Storage connectivity check failed: {}", e)))?;
        Ok(())
    }
}
