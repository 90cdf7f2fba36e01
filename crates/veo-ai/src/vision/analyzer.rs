//! Vision analysis with per-model retry and model fallback.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use veo_models::{AnalysisResult, StoredVideoLocator, VideoAsset};

use crate::error::{AiError, AiResult};
use crate::metrics::record_fallback;
use crate::retry::{retry_async, RetryPolicy, RetryResult};

use super::{FileReference, FileState, FileStore, RemoteFile, VisionModel};
use super::vertex::PROVIDER as VERTEX_PROVIDER;

/// Instruction sent with every video.
pub const ANALYSIS_INSTRUCTION: &str =
    "Describe this video in as much detail as possible. Output nothing except the description.";

/// How the video reaches the vision model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisionStrategy {
    /// Upload to the provider's file store and poll until active.
    UploadAndPoll,
    /// Pass the object-store locator straight to the model.
    DirectReference,
}

impl VisionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisionStrategy::UploadAndPoll => "files",
            VisionStrategy::DirectReference => "vertex",
        }
    }
}

impl std::str::FromStr for VisionStrategy {
    type Err = AiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "files" | "gemini" | "upload" => Ok(VisionStrategy::UploadAndPoll),
            "vertex" | "direct" | "gcs" => Ok(VisionStrategy::DirectReference),
            other => Err(AiError::config_error(format!(
                "Unknown VISION_STRATEGY '{}', expected 'files' or 'vertex'",
                other
            ))),
        }
    }
}

/// Vision analysis settings.
#[derive(Debug, Clone)]
pub struct VisionConfig {
    /// Candidate models, tried in order.
    pub models: Vec<String>,
    /// Retry policy applied per model.
    pub retry: RetryPolicy,
    pub poll_interval: Duration,
    pub poll_timeout: Duration,
    pub instruction: String,
    /// Delete provider-side files after analysis.
    pub cleanup_remote_files: bool,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            models: vec!["gemini-2.5-flash".to_string(), "gemini-2.5-pro".to_string()],
            retry: RetryPolicy::exponential("vision_generate"),
            poll_interval: Duration::from_secs(1),
            poll_timeout: Duration::from_secs(60),
            instruction: ANALYSIS_INSTRUCTION.to_string(),
            cleanup_remote_files: true,
        }
    }
}

impl VisionConfig {
    /// Create config from environment variables.
    pub fn from_env() -> AiResult<Self> {
        let mut config = Self::default();

        if let Ok(models) = std::env::var("VISION_MODELS") {
            let models: Vec<String> = models
                .split(',')
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .collect();
            if !models.is_empty() {
                config.models = models;
            }
        }

        if let Some(retries) = parse_env::<u32>("VISION_MAX_RETRIES") {
            config.retry = config.retry.with_max_retries(retries);
        }
        if let Some(ms) = parse_env::<u64>("VISION_POLL_INTERVAL_MS") {
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_env::<u64>("VISION_POLL_TIMEOUT_SECS") {
            config.poll_timeout = Duration::from_secs(secs);
        }
        if let Some(cleanup) = parse_env::<bool>("PIPELINE_CLEANUP") {
            config.cleanup_remote_files = cleanup;
        }

        if config.models.is_empty() {
            return Err(AiError::config_error("VISION_MODELS must name at least one model"));
        }
        Ok(config)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Vision Analysis Client.
pub struct VisionAnalyzer {
    model: Arc<dyn VisionModel>,
    files: Option<Arc<dyn FileStore>>,
    config: VisionConfig,
}

impl VisionAnalyzer {
    /// Upload-and-poll over a provider file store.
    pub fn upload_and_poll(
        model: Arc<dyn VisionModel>,
        files: Arc<dyn FileStore>,
        config: VisionConfig,
    ) -> Self {
        Self {
            model,
            files: Some(files),
            config,
        }
    }

    /// Direct reference to the stored object.
    pub fn direct_reference(model: Arc<dyn VisionModel>, config: VisionConfig) -> Self {
        Self {
            model,
            files: None,
            config,
        }
    }

    pub fn strategy(&self) -> VisionStrategy {
        if self.files.is_some() {
            VisionStrategy::UploadAndPoll
        } else {
            VisionStrategy::DirectReference
        }
    }

    pub fn config(&self) -> &VisionConfig {
        &self.config
    }

    /// Describe a video.
    ///
    /// `asset` supplies the bytes for upload-and-poll; `locator` is the
    /// object-store reference used by direct-reference.
    pub async fn analyze(
        &self,
        asset: &VideoAsset,
        locator: &StoredVideoLocator,
    ) -> AiResult<AnalysisResult> {
        let Some(files) = &self.files else {
            let file = FileReference {
                uri: locator.uri(),
                mime_type: locator.mime_type.clone(),
            };
            return self.analyze_with_fallback(&file).await;
        };

        let uploaded = files
            .upload(asset.data.clone(), &asset.mime_type, &asset.filename)
            .await
            .map_err(classify_upload_error)?;
        let remote_name = uploaded.name.clone();

        let result = async {
            let file = self
                .wait_for_active(files.as_ref(), uploaded, &asset.mime_type)
                .await
                .map_err(classify_upload_error)?;
            self.analyze_with_fallback(&file).await
        }
        .await;

        if self.config.cleanup_remote_files {
            self.delete_remote(files.as_ref(), &remote_name).await;
        }
        result
    }

    /// Poll until the file is `ACTIVE`, `FAILED`, or the timeout passes.
    pub async fn wait_for_active(
        &self,
        files: &dyn FileStore,
        uploaded: RemoteFile,
        fallback_mime: &str,
    ) -> AiResult<FileReference> {
        let start = Instant::now();
        let mut file = uploaded;

        loop {
            match file.state {
                FileState::Active => {
                    debug!(file = %file.name, elapsed_ms = start.elapsed().as_millis() as u64, "File active");
                    return Ok(file.reference(fallback_mime));
                }
                FileState::Failed => {
                    let message = file
                        .error
                        .and_then(|e| e.message)
                        .filter(|m| !m.is_empty())
                        .unwrap_or_else(|| "File processing failed".to_string());
                    return Err(AiError::FileProcessing(message));
                }
                _ => {}
            }

            if start.elapsed() > self.config.poll_timeout {
                return Err(AiError::FileProcessing(
                    "The video is taking too long to process. Please try again later.".to_string(),
                ));
            }

            tokio::time::sleep(self.config.poll_interval).await;
            file = files.get(&file.name).await?;
        }
    }

    /// Try each model in order with the per-model retry policy.
    pub async fn analyze_with_fallback(&self, file: &FileReference) -> AiResult<AnalysisResult> {
        let provider = self.model.provider();
        let mut last_error = None;

        for (index, model) in self.config.models.iter().enumerate() {
            info!(model = %model, provider, "Requesting video analysis");

            let mut policy = self.config.retry.clone();
            policy.operation_name = format!("vision_generate:{}", model);

            let outcome = retry_async(&policy, is_transient_vision_error, |attempt| async move {
                debug!(model = %model, attempt, "Vision generate attempt");
                let text = self
                    .model
                    .generate(model, &self.config.instruction, file)
                    .await?;
                AnalysisResult::new(text).ok_or_else(|| {
                    AiError::EmptyResponse(format!(
                        "{} returned an empty response. Please try again.",
                        provider
                    ))
                })
            })
            .await;

            match outcome {
                RetryResult::Success(result) => {
                    info!(model = %model, chars = result.as_str().len(), "Video analysis complete");
                    return Ok(result);
                }
                RetryResult::Failed { error, attempts } => {
                    warn!(model = %model, attempts, "Model failed: {}", error);
                    if index + 1 < self.config.models.len() {
                        record_fallback(model);
                    }
                    last_error = Some(error);
                }
            }
        }

        Err(classify_vision_error(last_error.unwrap_or_else(|| {
            AiError::config_error("no vision models configured")
        })))
    }

    /// Best-effort removal of a provider-side file.
    async fn delete_remote(&self, files: &dyn FileStore, name: &str) {
        match files.delete(name).await {
            Ok(()) => debug!(file = %name, "Deleted remote file"),
            Err(e) => warn!(file = %name, "Failed to delete remote file: {}", e),
        }
    }
}

/// Whether a raw vision error is worth retrying on the same model.
pub fn is_transient_vision_error(error: &AiError) -> bool {
    match error {
        AiError::Provider {
            status: Some(500 | 503),
            ..
        } => true,
        AiError::Provider { message, .. } => {
            let m = message.to_lowercase();
            ["unavailable", "overloaded", "try again", "internal", "timeout", "503", "500"]
                .iter()
                .any(|needle| m.contains(needle))
        }
        _ => false,
    }
}

/// Map a raw vision error to a user-facing classification.
pub fn classify_vision_error(error: AiError) -> AiError {
    let AiError::Provider {
        provider,
        status,
        message,
    } = &error
    else {
        return error;
    };

    let m = message.to_lowercase();
    if m.contains("api key") || matches!(status, Some(401 | 403)) {
        AiError::InvalidCredentials(credentials_remediation(provider))
    } else if m.contains("quota")
        || m.contains("rate limit")
        || m.contains("resource_exhausted")
        || *status == Some(429)
    {
        AiError::QuotaExceeded(
            "API usage limit reached. Please wait a while and try again.".to_string(),
        )
    } else if ["mime", "unsupported format", "invalid format", "video format", "file format"]
        .iter()
        .any(|needle| m.contains(needle))
    {
        AiError::UnsupportedFormat(
            "This video format is not supported. Try MP4, MOV, AVI or another common format."
                .to_string(),
        )
    } else if m.contains("overloaded") || m.contains("unavailable") {
        AiError::ServiceUnavailable(
            "The analysis service is busy. Please try again in a little while.".to_string(),
        )
    } else {
        AiError::Failed(format!("Video analysis failed: {}", message))
    }
}

fn credentials_remediation(provider: &str) -> String {
    if provider == VERTEX_PROVIDER {
        "Vertex AI rejected the request. Check the application-default credentials and that \
         the service account can read the stored video."
            .to_string()
    } else {
        "Invalid Gemini credentials. Check the GEMINI_API_KEY setting.".to_string()
    }
}

/// Map a raw file upload or activation error to a user-facing classification.
pub fn classify_upload_error(error: AiError) -> AiError {
    let AiError::Provider { message, .. } = &error else {
        return error;
    };

    let m = message.to_lowercase();
    if m.contains("quota") || m.contains("limit") {
        AiError::QuotaExceeded(
            "Upload storage limit reached. Please wait a while and try again.".to_string(),
        )
    } else if m.contains("expired") {
        AiError::FileExpired("The uploaded file has expired. Please upload the video again.".to_string())
    } else if m.contains("size") {
        AiError::FileTooLarge("The file is larger than 2GB. Please compress the video.".to_string())
    } else {
        AiError::UploadFailed(format!("File upload failed: {}", message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use bytes::Bytes;

    use crate::vision::FileStatus;

    /// Vision model with a scripted queue of outcomes per model name.
    #[derive(Default)]
    struct StubModel {
        script: Mutex<HashMap<String, VecDeque<AiResult<String>>>>,
        calls: Mutex<Vec<(String, String)>>,
    }

    impl StubModel {
        fn script(self, model: &str, outcomes: Vec<AiResult<String>>) -> Self {
            self.script
                .lock()
                .unwrap()
                .insert(model.to_string(), outcomes.into());
            self
        }

        fn calls_for(&self, model: &str) -> usize {
            self.calls.lock().unwrap().iter().filter(|(m, _)| m == model).count()
        }
    }

    #[async_trait]
    impl VisionModel for StubModel {
        fn provider(&self) -> &'static str {
            "Stub"
        }

        async fn generate(&self, model: &str, _instruction: &str, file: &FileReference) -> AiResult<String> {
            self.calls
                .lock()
                .unwrap()
                .push((model.to_string(), file.uri.clone()));
            self.script
                .lock()
                .unwrap()
                .get_mut(model)
                .and_then(|q| q.pop_front())
                .unwrap_or_else(|| Err(AiError::provider("Stub", Some(400), "unscripted call")))
        }
    }

    /// File store whose file becomes active after `polls_until_active` reads.
    struct StubFiles {
        polls_until_active: Option<usize>,
        gets: Mutex<usize>,
        deleted: Mutex<Vec<String>>,
    }

    impl StubFiles {
        fn new(polls_until_active: Option<usize>) -> Self {
            Self {
                polls_until_active,
                gets: Mutex::new(0),
                deleted: Mutex::new(Vec::new()),
            }
        }

        fn file(state: FileState) -> RemoteFile {
            RemoteFile {
                name: "files/abc".to_string(),
                uri: Some("https://files.example/v1beta/files/abc".to_string()),
                mime_type: Some("video/mp4".to_string()),
                state,
                error: None,
            }
        }
    }

    #[async_trait]
    impl FileStore for StubFiles {
        async fn upload(&self, _data: Bytes, _mime_type: &str, _display_name: &str) -> AiResult<RemoteFile> {
            Ok(Self::file(FileState::Processing))
        }

        async fn get(&self, _name: &str) -> AiResult<RemoteFile> {
            let mut gets = self.gets.lock().unwrap();
            *gets += 1;
            match self.polls_until_active {
                Some(n) if *gets >= n => Ok(Self::file(FileState::Active)),
                Some(_) => Ok(Self::file(FileState::Processing)),
                None => Ok(RemoteFile {
                    error: Some(FileStatus {
                        message: Some("Video codec not supported".to_string()),
                    }),
                    ..Self::file(FileState::Failed)
                }),
            }
        }

        async fn delete(&self, name_or_uri: &str) -> AiResult<()> {
            self.deleted.lock().unwrap().push(name_or_uri.to_string());
            Err(AiError::provider("Stub", Some(500), "delete is flaky"))
        }
    }

    fn fast_config() -> VisionConfig {
        VisionConfig {
            retry: RetryPolicy::exponential("test").with_base_delay(Duration::from_millis(1)),
            poll_interval: Duration::from_millis(2),
            poll_timeout: Duration::from_millis(50),
            ..VisionConfig::default()
        }
    }

    fn file_ref() -> FileReference {
        FileReference {
            uri: "gs://bucket/uploads/clip.mp4".to_string(),
            mime_type: "video/mp4".to_string(),
        }
    }

    fn asset_and_locator() -> (VideoAsset, StoredVideoLocator) {
        let asset = VideoAsset::new(Bytes::from_static(b"video"), "video/mp4", "clip.mp4");
        let locator = StoredVideoLocator::new("gs", "bucket", "uploads/clip.mp4", "video/mp4");
        (asset, locator)
    }

    fn transient() -> AiResult<String> {
        Err(AiError::provider("Stub", Some(503), "UNAVAILABLE: The model is overloaded."))
    }

    #[tokio::test]
    async fn test_retries_transient_errors_on_same_model() {
        let model = Arc::new(StubModel::default().script(
            "gemini-2.5-flash",
            vec![transient(), transient(), Ok("A heron lands SCREEN-RIGHT.".to_string())],
        ));
        let analyzer = VisionAnalyzer::direct_reference(model.clone(), fast_config());

        let result = analyzer.analyze_with_fallback(&file_ref()).await.unwrap();

        assert_eq!(result.as_str(), "A heron lands SCREEN-RIGHT.");
        assert_eq!(model.calls_for("gemini-2.5-flash"), 3);
        assert_eq!(model.calls_for("gemini-2.5-pro"), 0);
    }

    #[tokio::test]
    async fn test_terminal_error_falls_back_immediately() {
        let model = Arc::new(
            StubModel::default()
                .script(
                    "gemini-2.5-flash",
                    vec![Err(AiError::provider("Stub", Some(404), "model not found"))],
                )
                .script("gemini-2.5-pro", vec![Ok("Clouds drift.".to_string())]),
        );
        let analyzer = VisionAnalyzer::direct_reference(model.clone(), fast_config());

        let result = analyzer.analyze_with_fallback(&file_ref()).await.unwrap();

        assert_eq!(result.as_str(), "Clouds drift.");
        assert_eq!(model.calls_for("gemini-2.5-flash"), 1);
        assert_eq!(model.calls_for("gemini-2.5-pro"), 1);
    }

    #[tokio::test]
    async fn test_empty_response_advances_model() {
        let model = Arc::new(
            StubModel::default()
                .script("gemini-2.5-flash", vec![Ok("   ".to_string())])
                .script("gemini-2.5-pro", vec![Ok("Sparks fly.".to_string())]),
        );
        let analyzer = VisionAnalyzer::direct_reference(model.clone(), fast_config());

        let result = analyzer.analyze_with_fallback(&file_ref()).await.unwrap();

        assert_eq!(result.as_str(), "Sparks fly.");
        assert_eq!(model.calls_for("gemini-2.5-flash"), 1);
    }

    #[tokio::test]
    async fn test_exhausted_models_surface_classified_error() {
        let model = Arc::new(
            StubModel::default()
                .script("gemini-2.5-flash", vec![transient(), transient(), transient()])
                .script("gemini-2.5-pro", vec![transient(), transient(), transient()]),
        );
        let analyzer = VisionAnalyzer::direct_reference(model.clone(), fast_config());

        let err = analyzer.analyze_with_fallback(&file_ref()).await.unwrap_err();

        assert!(matches!(err, AiError::ServiceUnavailable(_)));
        assert_eq!(model.calls_for("gemini-2.5-flash"), 3);
        assert_eq!(model.calls_for("gemini-2.5-pro"), 3);
    }

    #[tokio::test]
    async fn test_direct_reference_uses_locator() {
        let model = Arc::new(StubModel::default().script("gemini-2.5-flash", vec![Ok("Trees sway.".to_string())]));
        let analyzer = VisionAnalyzer::direct_reference(model.clone(), fast_config());
        let (asset, locator) = asset_and_locator();

        analyzer.analyze(&asset, &locator).await.unwrap();

        assert_eq!(analyzer.strategy(), VisionStrategy::DirectReference);
        let calls = model.calls.lock().unwrap();
        assert_eq!(calls[0].1, "gs://bucket/uploads/clip.mp4");
    }

    #[tokio::test]
    async fn test_upload_and_poll_then_cleanup() {
        let model = Arc::new(StubModel::default().script("gemini-2.5-flash", vec![Ok("A train passes.".to_string())]));
        let files = Arc::new(StubFiles::new(Some(3)));
        let analyzer = VisionAnalyzer::upload_and_poll(model.clone(), files.clone(), fast_config());
        let (asset, locator) = asset_and_locator();

        let result = analyzer.analyze(&asset, &locator).await.unwrap();

        assert_eq!(result.as_str(), "A train passes.");
        assert_eq!(*files.gets.lock().unwrap(), 3);
        assert_eq!(model.calls.lock().unwrap()[0].1, "https://files.example/v1beta/files/abc");
        // Cleanup failure is swallowed.
        assert_eq!(*files.deleted.lock().unwrap(), vec!["files/abc".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_file_state_reports_message_and_cleans_up() {
        let model = Arc::new(StubModel::default());
        let files = Arc::new(StubFiles::new(None));
        let analyzer = VisionAnalyzer::upload_and_poll(model.clone(), files.clone(), fast_config());
        let (asset, locator) = asset_and_locator();

        let err = analyzer.analyze(&asset, &locator).await.unwrap_err();

        assert_eq!(err, AiError::FileProcessing("Video codec not supported".to_string()));
        assert_eq!(model.calls.lock().unwrap().len(), 0);
        assert_eq!(files.deleted.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_poll_timeout() {
        let model = Arc::new(StubModel::default());
        let files = Arc::new(StubFiles::new(Some(usize::MAX)));
        let analyzer = VisionAnalyzer::upload_and_poll(model, files, fast_config());
        let (asset, locator) = asset_and_locator();

        let err = analyzer.analyze(&asset, &locator).await.unwrap_err();

        assert!(matches!(err, AiError::FileProcessing(ref msg) if msg.contains("too long")));
    }

    #[test]
    fn test_transient_classification() {
        assert!(is_transient_vision_error(&AiError::provider("Gemini", Some(500), "boom")));
        assert!(is_transient_vision_error(&AiError::provider("Gemini", None, "request timeout: deadline")));
        assert!(is_transient_vision_error(&AiError::provider("Gemini", Some(429), "Please try again later")));
        assert!(!is_transient_vision_error(&AiError::provider("Gemini", Some(400), "API key not valid")));
        assert!(!is_transient_vision_error(&AiError::EmptyResponse("empty".to_string())));
    }

    #[test]
    fn test_user_facing_classification() {
        let classify = |msg: &str| classify_vision_error(AiError::provider("Gemini", Some(400), msg));

        assert!(matches!(classify("API key not valid"), AiError::InvalidCredentials(_)));
        assert!(matches!(classify("Resource has been exhausted (e.g. check quota)."), AiError::QuotaExceeded(_)));
        assert!(matches!(classify("Unsupported mime type"), AiError::UnsupportedFormat(_)));
        assert!(matches!(classify("UNAVAILABLE: overloaded"), AiError::ServiceUnavailable(_)));
        assert_eq!(
            classify("something odd"),
            AiError::Failed("Video analysis failed: something odd".to_string())
        );
    }

    #[test]
    fn test_credentials_remediation_names_provider() {
        let gemini = classify_vision_error(AiError::provider("Gemini", Some(401), "unauthenticated"));
        let vertex = classify_vision_error(AiError::provider(
            VERTEX_PROVIDER,
            Some(403),
            "Permission denied on resource gs://bucket/uploads/clip.mp4",
        ));

        let AiError::InvalidCredentials(gemini) = gemini else {
            panic!("expected credentials error, got {:?}", gemini);
        };
        assert!(gemini.contains("GEMINI_API_KEY"));

        let AiError::InvalidCredentials(vertex) = vertex else {
            panic!("expected credentials error, got {:?}", vertex);
        };
        assert!(vertex.contains("application-default credentials"));
        assert!(!vertex.contains("GEMINI_API_KEY"));
    }

    #[test]
    fn test_upload_classification() {
        let classify = |msg: &str| classify_upload_error(AiError::provider("Gemini", Some(400), msg));

        assert!(matches!(classify("storage limit reached"), AiError::QuotaExceeded(_)));
        assert!(matches!(classify("file has expired"), AiError::FileExpired(_)));
        assert!(matches!(classify("request size too big"), AiError::FileTooLarge(_)));
        assert!(matches!(classify("broken pipe"), AiError::UploadFailed(_)));
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("files".parse::<VisionStrategy>().unwrap(), VisionStrategy::UploadAndPoll);
        assert_eq!(" Vertex ".parse::<VisionStrategy>().unwrap(), VisionStrategy::DirectReference);
        assert!("s3".parse::<VisionStrategy>().is_err());
    }
}
