//! Video processing handlers.

use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use veo_models::{ProcessResponse, RunId, VideoAsset, MAX_FILE_SIZE};
use veo_pipeline::{PipelineError, RunContext};

use crate::error::{ApiError, ApiResult};
use crate::middleware::RequestId;
use crate::state::AppState;

/// Multipart field that carries the video.
pub const FILE_FIELD: &str = "file";

const MISSING_FILE: &str = "No file found. Upload a video in the \"file\" field.";

/// POST /api/process
///
/// Runs the pipeline on a spawned task so that it reaches a stage boundary
/// and cleans up even if the client goes away. Dropping this future cancels
/// the run.
pub async fn process_video(
    State(state): State<AppState>,
    request_id: Option<Extension<RequestId>>,
    multipart: Multipart,
) -> Response {
    match run_upload(&state, request_id, multipart).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => e.into_response_for(&state.config),
    }
}

async fn run_upload(
    state: &AppState,
    request_id: Option<Extension<RequestId>>,
    mut multipart: Multipart,
) -> ApiResult<ProcessResponse> {
    let asset = read_video_field(&mut multipart).await?;

    let run_id = request_id
        .map(|Extension(RequestId(id))| RunId::from_string(id))
        .unwrap_or_else(RunId::new);
    info!(
        run_id = %run_id,
        filename = %asset.filename,
        mime_type = %asset.mime_type,
        size = asset.size,
        "Received video"
    );

    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();
    let ctx = RunContext::new().with_run_id(run_id).with_cancel(cancel);

    let processor = Arc::clone(&state.processor);
    let handle = tokio::spawn(async move { processor.process(asset, ctx).await });

    match handle.await {
        Ok(result) => Ok(result?.into_response()),
        Err(e) => {
            warn!("Pipeline task failed: {}", e);
            Err(PipelineError::unexpected(e.to_string()).into())
        }
    }
}

/// GET /api/process
pub async fn describe_process() -> Json<Value> {
    Json(json!({
        "endpoint": "/api/process",
        "method": "POST",
        "description": "Veo 3 video prompt generation API",
        "parameters": {
            "file": format!("video/* (max {} GB)", MAX_FILE_SIZE / (1024 * 1024 * 1024)),
        },
        "response": {
            "final": "Generated Veo 3 JSON prompt",
            "gemini_text": "Video analysis from the vision model",
        },
    }))
}

/// Read the first `file` field into a video asset.
///
/// A `file` field without a filename is a plain form value, not an upload.
async fn read_video_field(multipart: &mut Multipart) -> ApiResult<VideoAsset> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let Some(filename) = field.file_name().map(str::to_string) else {
            return Err(ApiError::bad_request(MISSING_FILE));
        };
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await?;

        return Ok(VideoAsset::from_upload(
            data,
            content_type.as_deref(),
            Some(&filename),
        ));
    }

    Err(ApiError::bad_request(MISSING_FILE))
}
