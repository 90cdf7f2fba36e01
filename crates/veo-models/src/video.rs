//! Video asset models.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Filename used when the caller did not send one.
pub const DEFAULT_FILENAME: &str = "uploaded_video";

/// MIME type assumed when the caller did not declare one.
pub const DEFAULT_MIME_TYPE: &str = "video/mp4";

/// A video submitted for one pipeline run.
///
/// Owned by the orchestrator for the duration of a single run; the bytes are
/// reference counted so handing them to the uploader and the vision backend
/// does not copy the payload.
#[derive(Clone)]
pub struct VideoAsset {
    /// Raw video bytes
    pub data: Bytes,
    /// Declared MIME type
    pub mime_type: String,
    /// Original filename
    pub filename: String,
    /// Size in bytes
    pub size: u64,
}

impl VideoAsset {
    /// Create an asset, deriving the size from the payload.
    pub fn new(data: impl Into<Bytes>, mime_type: impl Into<String>, filename: impl Into<String>) -> Self {
        let data = data.into();
        let size = data.len() as u64;
        Self {
            data,
            mime_type: mime_type.into(),
            filename: filename.into(),
            size,
        }
    }

    /// Create an asset from optional caller metadata, applying the defaults
    /// for a missing filename or content type.
    pub fn from_upload(data: impl Into<Bytes>, mime_type: Option<&str>, filename: Option<&str>) -> Self {
        let mime_type = mime_type
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(DEFAULT_MIME_TYPE);
        let filename = filename
            .filter(|f| !f.trim().is_empty())
            .unwrap_or(DEFAULT_FILENAME);
        Self::new(data, mime_type, filename)
    }
}

impl fmt::Debug for VideoAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoAsset")
            .field("mime_type", &self.mime_type)
            .field("filename", &self.filename)
            .field("size", &self.size)
            .finish()
    }
}

/// Durable reference to an uploaded video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredVideoLocator {
    /// URI scheme used when rendering the locator (e.g. "gs", "s3")
    pub scheme: String,
    /// Bucket name
    pub bucket: String,
    /// Object key inside the bucket
    pub key: String,
    /// MIME type confirmed by the store
    pub mime_type: String,
}

impl StoredVideoLocator {
    pub fn new(
        scheme: impl Into<String>,
        bucket: impl Into<String>,
        key: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            scheme: scheme.into(),
            bucket: bucket.into(),
            key: key.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Full URI, e.g. `gs://bucket/uploads/123_clip.mp4`.
    pub fn uri(&self) -> String {
        format!("{}://{}/{}", self.scheme, self.bucket, self.key)
    }
}

impl fmt::Display for StoredVideoLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uri())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_size_from_payload() {
        let asset = VideoAsset::new(vec![0u8; 1024], "video/mp4", "clip.mp4");
        assert_eq!(asset.size, 1024);
    }

    #[test]
    fn test_asset_upload_defaults() {
        let asset = VideoAsset::from_upload(vec![1u8, 2, 3], None, Some("  "));
        assert_eq!(asset.mime_type, DEFAULT_MIME_TYPE);
        assert_eq!(asset.filename, DEFAULT_FILENAME);

        let asset = VideoAsset::from_upload(vec![1u8], Some("video/webm"), Some("a.webm"));
        assert_eq!(asset.mime_type, "video/webm");
        assert_eq!(asset.filename, "a.webm");
    }

    #[test]
    fn test_asset_debug_omits_payload() {
        let asset = VideoAsset::new(vec![7u8; 16], "video/mp4", "clip.mp4");
        let debug = format!("{:?}", asset);
        assert!(debug.contains("clip.mp4"));
        assert!(!debug.contains("data"));
    }

    #[test]
    fn test_locator_uri() {
        let locator = StoredVideoLocator::new("gs", "bucket", "uploads/1_clip.mp4", "video/mp4");
        assert_eq!(locator.uri(), "gs://bucket/uploads/1_clip.mp4");
        assert_eq!(locator.to_string(), locator.uri());
    }
}
