//! Pre-flight validation of uploaded video files.
//!
//! Runs before any network call. Failures carry a user-facing message that
//! tells the caller how to fix the upload.

/// Maximum accepted file size (2 GiB).
pub const MAX_FILE_SIZE: u64 = 2 * 1024 * 1024 * 1024;

/// Accepted MIME types.
pub const SUPPORTED_MIME_TYPES: &[&str] = &[
    "video/mp4",
    "video/mov",
    "video/avi",
    "video/mkv",
    "video/webm",
    "video/quicktime",
];

/// Result of validating an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileValidationResult {
    /// File passes every check.
    Valid,
    /// File is larger than [`MAX_FILE_SIZE`].
    TooLarge(u64),
    /// MIME type is missing or not in [`SUPPORTED_MIME_TYPES`].
    UnsupportedType(String),
    /// Filename is missing or blank.
    MissingFilename,
}

impl FileValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// Human-readable reason, `None` when valid.
    pub fn reason(&self) -> Option<String> {
        match self {
            Self::Valid => None,
            Self::TooLarge(_) => {
                Some("File size exceeds 2GB. Please compress the video and try again.".to_string())
            }
            Self::UnsupportedType(_) => Some(
                "Please upload a video file. Supported formats: MP4, MOV, AVI, MKV, WebM".to_string(),
            ),
            Self::MissingFilename => {
                Some("Please upload a file with a valid filename.".to_string())
            }
        }
    }

    /// Convert to Result for easy error handling.
    pub fn into_result(self) -> Result<(), String> {
        match self.reason() {
            None => Ok(()),
            Some(reason) => Err(reason),
        }
    }
}

/// Validate size, MIME type and filename of an uploaded video.
///
/// Checks run in that order and the first failure wins.
pub fn validate_video_file(size: u64, mime_type: &str, filename: &str) -> FileValidationResult {
    if size > MAX_FILE_SIZE {
        return FileValidationResult::TooLarge(size);
    }

    if mime_type.is_empty() || !SUPPORTED_MIME_TYPES.contains(&mime_type) {
        return FileValidationResult::UnsupportedType(mime_type.to_string());
    }

    if filename.trim().is_empty() {
        return FileValidationResult::MissingFilename;
    }

    FileValidationResult::Valid
}
