//! Pipeline metrics.

use std::time::Duration;

use metrics::{counter, histogram};

pub mod names {
    /// Finished runs by outcome (`success` or the error kind).
    pub const RUNS_TOTAL: &str = "veo_pipeline_runs_total";

    /// Stage duration in seconds by stage.
    pub const STAGE_DURATION_SECONDS: &str = "veo_pipeline_stage_duration_seconds";

    /// Whole-run duration in seconds.
    pub const RUN_DURATION_SECONDS: &str = "veo_pipeline_run_duration_seconds";

    /// Cleanup failures (never fatal).
    pub const CLEANUP_FAILURES_TOTAL: &str = "veo_pipeline_cleanup_failures_total";
}

pub fn record_stage(stage: &'static str, elapsed: Duration) {
    histogram!(names::STAGE_DURATION_SECONDS, "stage" => stage).record(elapsed.as_secs_f64());
}

pub fn record_run(outcome: &'static str, elapsed: Duration) {
    counter!(names::RUNS_TOTAL, "outcome" => outcome).increment(1);
    histogram!(names::RUN_DURATION_SECONDS).record(elapsed.as_secs_f64());
}

pub fn record_cleanup_failure() {
    counter!(names::CLEANUP_FAILURES_TOTAL).increment(1);
}
