//! Provider call metrics.

use metrics::{counter, histogram};

pub mod names {
    /// Provider calls by provider, operation and outcome.
    pub const PROVIDER_REQUESTS_TOTAL: &str = "veo_provider_requests_total";

    /// Retry attempts by operation.
    pub const PROVIDER_RETRIES_TOTAL: &str = "veo_provider_retries_total";

    /// Model fallbacks by the model that was abandoned.
    pub const MODEL_FALLBACKS_TOTAL: &str = "veo_model_fallbacks_total";

    /// Provider call latency in seconds.
    pub const PROVIDER_LATENCY_SECONDS: &str = "veo_provider_latency_seconds";
}

/// Record a completed provider call.
pub fn record_request(provider: &str, operation: &str, success: bool, latency_ms: f64) {
    counter!(
        names::PROVIDER_REQUESTS_TOTAL,
        "provider" => provider.to_string(),
        "operation" => operation.to_string(),
        "outcome" => if success { "ok" } else { "error" }
    )
    .increment(1);

    histogram!(
        names::PROVIDER_LATENCY_SECONDS,
        "provider" => provider.to_string(),
        "operation" => operation.to_string()
    )
    .record(latency_ms / 1000.0);
}

pub fn record_retry(operation: &str) {
    counter!(
        names::PROVIDER_RETRIES_TOTAL,
        "operation" => operation.to_string()
    )
    .increment(1);
}

pub fn record_fallback(model: &str) {
    counter!(
        names::MODEL_FALLBACKS_TOTAL,
        "model" => model.to_string()
    )
    .increment(1);
}
