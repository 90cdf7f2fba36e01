//! Object storage for uploaded videos.
//!
//! This crate provides:
//! - An S3-compatible client (GCS interop, Cloudflare R2, AWS S3)
//! - An in-memory store for local development
//! - Collision-resistant destination keys with filename sanitization
//! - The video uploader used by the pipeline

pub mod client;
pub mod error;
pub mod keys;
pub mod memory;
pub mod uploader;

pub use client::{S3Store, StorageConfig};
pub use error::{StorageError, StorageResult};
pub use keys::{sanitize_filename, upload_key, UPLOAD_PREFIX};
pub use memory::MemoryStore;
pub use uploader::{ObjectStore, VideoUploader};
