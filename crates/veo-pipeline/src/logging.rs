//! Structured run logging.

use tracing::{error, info, warn, Span};
use veo_models::{PipelineState, RunId};

/// Logger bound to one pipeline run.
#[derive(Debug, Clone)]
pub struct RunLogger {
    run_id: String,
}

impl RunLogger {
    pub fn new(run_id: &RunId) -> Self {
        Self {
            run_id: run_id.to_string(),
        }
    }

    pub fn log_start(&self, filename: &str, mime_type: &str, size: u64) {
        info!(
            run_id = %self.run_id,
            filename,
            mime_type,
            size,
            "Pipeline run started"
        );
    }

    /// Log entry into a new stage.
    pub fn log_stage(&self, stage: PipelineState) {
        info!(run_id = %self.run_id, stage = %stage, "Pipeline stage: {}", stage);
    }

    pub fn log_warning(&self, message: &str) {
        warn!(run_id = %self.run_id, "Pipeline warning: {}", message);
    }

    pub fn log_error(&self, stage: PipelineState, kind: &str, message: &str) {
        error!(
            run_id = %self.run_id,
            stage = %stage,
            kind,
            "Pipeline failed: {}", message
        );
    }

    pub fn log_completion(&self, elapsed_ms: u64) {
        info!(run_id = %self.run_id, elapsed_ms, "Pipeline run completed");
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn create_span(&self) -> Span {
        tracing::info_span!("pipeline_run", run_id = %self.run_id)
    }
}
