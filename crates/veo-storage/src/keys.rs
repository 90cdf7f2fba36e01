//! Destination keys for uploaded videos.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Prefix for every uploaded video.
pub const UPLOAD_PREFIX: &str = "uploads";

/// Fallback name when sanitization leaves nothing.
const FALLBACK_NAME: &str = "video";

/// Replace every character outside `[A-Za-z0-9._-]` with `_`.
pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        sanitized
    }
}

/// Build a collision-resistant key for a new upload.
///
/// Format: `uploads/{unix_millis}_{nonce}_{sanitized_name}`.
pub fn upload_key(filename: &str) -> String {
    let nonce = Uuid::new_v4().simple().to_string();
    upload_key_at(filename, Utc::now(), &nonce[..8])
}

/// Deterministic variant of [`upload_key`].
pub fn upload_key_at(filename: &str, at: DateTime<Utc>, nonce: &str) -> String {
    format!(
        "{}/{}_{}_{}",
        UPLOAD_PREFIX,
        at.timestamp_millis(),
        nonce,
        sanitize_filename(filename)
    )
}
