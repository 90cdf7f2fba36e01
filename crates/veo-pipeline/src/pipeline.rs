//! Pipeline orchestrator.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, Instrument};

use veo_ai::{
    parse_veo_prompt, GeminiApi, JsonGenerationClient, OpenRouterApi, PromptTemplate, VertexApi,
    VisionAnalyzer, VisionStrategy, DEFAULT_TEMPLATE,
};
use veo_models::{
    validate_video_file, AnalysisResult, PipelineState, ProcessResponse, RunId,
    StoredVideoLocator, VeoPrompt, VideoAsset,
};
use veo_storage::{MemoryStore, ObjectStore, S3Store, VideoUploader};

use crate::config::{PipelineConfig, StorageSettings};
use crate::error::{PipelineError, PipelineResult};
use crate::logging::RunLogger;
use crate::metrics::{record_cleanup_failure, record_run, record_stage};

/// Per-run context supplied by the caller.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: RunId,
    /// Checked at every stage boundary.
    pub cancel: CancellationToken,
    progress: Option<watch::Sender<PipelineState>>,
}

impl RunContext {
    pub fn new() -> Self {
        Self {
            run_id: RunId::new(),
            cancel: CancellationToken::new(),
            progress: None,
        }
    }

    pub fn with_run_id(mut self, run_id: RunId) -> Self {
        self.run_id = run_id;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Subscribe to state changes for this run.
    pub fn subscribe(&mut self) -> watch::Receiver<PipelineState> {
        match &self.progress {
            Some(tx) => tx.subscribe(),
            None => {
                let (tx, rx) = watch::channel(PipelineState::Idle);
                self.progress = Some(tx);
                rx
            }
        }
    }

    fn publish(&self, state: PipelineState) {
        if let Some(tx) = &self.progress {
            tx.send_replace(state);
        }
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub prompt: VeoPrompt,
    pub analysis: AnalysisResult,
    pub locator: StoredVideoLocator,
}

impl PipelineOutput {
    pub fn into_response(self) -> ProcessResponse {
        ProcessResponse {
            final_prompt: self.prompt,
            gemini_text: self.analysis.into_inner(),
        }
    }
}

/// Something that can turn an uploaded video into a Veo prompt.
#[async_trait]
pub trait VideoProcessor: Send + Sync {
    async fn process(&self, asset: VideoAsset, ctx: RunContext) -> PipelineResult<PipelineOutput>;

    /// Readiness of downstream dependencies.
    async fn check_ready(&self) -> PipelineResult<()>;
}

/// Pipeline Orchestrator.
pub struct Pipeline {
    uploader: VideoUploader,
    analyzer: VisionAnalyzer,
    generator: JsonGenerationClient,
    template: PromptTemplate,
    cleanup: bool,
}

impl Pipeline {
    pub fn new(
        uploader: VideoUploader,
        analyzer: VisionAnalyzer,
        generator: JsonGenerationClient,
    ) -> Self {
        Self {
            uploader,
            analyzer,
            generator,
            template: DEFAULT_TEMPLATE,
            cleanup: true,
        }
    }

    pub fn with_cleanup(mut self, cleanup: bool) -> Self {
        self.cleanup = cleanup;
        self
    }

    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    /// Build the production pipeline from configuration.
    pub async fn from_config(config: PipelineConfig) -> PipelineResult<Self> {
        let store: Arc<dyn ObjectStore> = match config.storage {
            StorageSettings::S3(storage) => Arc::new(S3Store::new(storage)),
            StorageSettings::Memory { bucket } => Arc::new(MemoryStore::new(bucket)),
        };

        let analyzer = match config.vision_strategy {
            VisionStrategy::UploadAndPoll => {
                let gemini_config = config
                    .gemini
                    .ok_or_else(|| PipelineError::config_error("GEMINI_API_KEY not set"))?;
                let gemini = Arc::new(GeminiApi::new(gemini_config).map_err(PipelineError::setup)?);
                VisionAnalyzer::upload_and_poll(gemini.clone(), gemini, config.vision)
            }
            VisionStrategy::DirectReference => {
                let vertex_config = config
                    .vertex
                    .ok_or_else(|| PipelineError::config_error("GOOGLE_CLOUD_PROJECT not set"))?;
                let vertex = VertexApi::new(vertex_config).await.map_err(PipelineError::setup)?;
                VisionAnalyzer::direct_reference(Arc::new(vertex), config.vision)
            }
        };

        let openrouter = OpenRouterApi::new(config.openrouter).map_err(PipelineError::setup)?;
        let generator = JsonGenerationClient::new(Arc::new(openrouter), config.generation);

        Ok(Self::new(VideoUploader::new(store), analyzer, generator).with_cleanup(config.cleanup))
    }

    pub fn vision_strategy(&self) -> VisionStrategy {
        self.analyzer.strategy()
    }

    /// Run the pipeline for one video.
    pub async fn run(&self, asset: VideoAsset, ctx: &RunContext) -> PipelineResult<PipelineOutput> {
        let logger = RunLogger::new(&ctx.run_id);
        let span = logger.create_span();

        async {
            let started = Instant::now();
            logger.log_start(&asset.filename, &asset.mime_type, asset.size);

            let mut state = PipelineState::Idle;
            let mut stored = None;
            let result = self
                .execute(&asset, ctx, &logger, &mut state, &mut stored)
                .await;

            if self.cleanup {
                if let Some(locator) = &stored {
                    self.cleanup_stored(locator, &logger).await;
                }
            }

            match &result {
                Ok(_) => {
                    logger.log_completion(started.elapsed().as_millis() as u64);
                    record_run("success", started.elapsed());
                }
                Err(e) => {
                    let failed_in = state;
                    if state.transition(PipelineState::Error).is_ok() {
                        ctx.publish(state);
                    }
                    logger.log_error(failed_in, e.kind(), &e.to_string());
                    record_run(e.kind(), started.elapsed());
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &self,
        asset: &VideoAsset,
        ctx: &RunContext,
        logger: &RunLogger,
        state: &mut PipelineState,
        stored: &mut Option<StoredVideoLocator>,
    ) -> PipelineResult<PipelineOutput> {
        self.advance(state, PipelineState::Uploading, ctx, logger)?;
        let stage = Instant::now();
        validate_video_file(asset.size, &asset.mime_type, &asset.filename)
            .into_result()
            .map_err(PipelineError::InputValidation)?;
        let locator = self.uploader.upload(asset).await?;
        *stored = Some(locator.clone());
        record_stage("uploading", stage.elapsed());

        self.advance(state, PipelineState::Analyzing, ctx, logger)?;
        let stage = Instant::now();
        let analysis = self
            .analyzer
            .analyze(asset, &locator)
            .await
            .map_err(PipelineError::Analysis)?;
        record_stage("analyzing", stage.elapsed());

        self.advance(state, PipelineState::Generating, ctx, logger)?;
        let stage = Instant::now();
        let prompt_text = self.template.render(analysis.as_str());
        let raw = self
            .generator
            .generate(&prompt_text, None)
            .await
            .map_err(PipelineError::Generation)?;
        let prompt = parse_veo_prompt(&raw).map_err(|e| PipelineError::SchemaValidation {
            message: e.message,
            raw: e.raw,
        })?;
        record_stage("generating", stage.elapsed());

        self.advance(state, PipelineState::Completed, ctx, logger)?;
        Ok(PipelineOutput {
            prompt,
            analysis,
            locator,
        })
    }

    /// Move to the next stage, unless the run was cancelled.
    fn advance(
        &self,
        state: &mut PipelineState,
        next: PipelineState,
        ctx: &RunContext,
        logger: &RunLogger,
    ) -> PipelineResult<()> {
        if ctx.cancel.is_cancelled() && !next.is_terminal() {
            return Err(PipelineError::Cancelled);
        }
        state
            .transition(next)
            .map_err(|e| PipelineError::unexpected(e.to_string()))?;
        ctx.publish(next);
        logger.log_stage(next);
        Ok(())
    }

    async fn cleanup_stored(&self, locator: &StoredVideoLocator, logger: &RunLogger) {
        match self.uploader.delete(locator).await {
            Ok(()) => debug!(locator = %locator, "Deleted stored video"),
            Err(e) => {
                record_cleanup_failure();
                logger.log_warning(&format!("Failed to delete {}: {}", locator, e));
            }
        }
    }
}

#[async_trait]
impl VideoProcessor for Pipeline {
    async fn process(&self, asset: VideoAsset, ctx: RunContext) -> PipelineResult<PipelineOutput> {
        self.run(asset, &ctx).await
    }

    async fn check_ready(&self) -> PipelineResult<()> {
        self.uploader.store().check_connectivity().await?;
        Ok(())
    }
}
