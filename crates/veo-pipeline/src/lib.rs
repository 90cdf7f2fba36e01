//! Pipeline orchestration for the Veo prompt generator.
//!
//! A run takes one uploaded video through
//! `uploading -> analyzing -> generating -> completed`, stopping in `error`
//! on the first failure. Each failure carries a user-facing message and an
//! HTTP-style status.

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;

pub use config::{PipelineConfig, StorageSettings};
pub use error::{PipelineError, PipelineResult};
pub use logging::RunLogger;
pub use pipeline::{Pipeline, PipelineOutput, RunContext, VideoProcessor};
