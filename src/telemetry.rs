//! Telemetry metric name constants.
//!
//! Centralised metric names for abridge operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `abridge_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `outcome`: "generative", "fallback", "cached", "rejected" or "invalid"
//! - `provider`: generative provider name (e.g. "openai")
//! - `component`: store consumer: "cache" or "limiter"
//! - `direction`: token direction: "prompt" or "completion"

/// Total requests that reached the orchestrator.
///
/// Labels: `outcome`.
pub const REQUESTS_TOTAL: &str = "abridge_requests_total";

/// End-to-end orchestration duration in seconds.
///
/// Labels: `outcome`.
pub const REQUEST_DURATION_SECONDS: &str = "abridge_request_duration_seconds";

/// Total retry attempts (not counting the initial request).
///
/// Labels: `provider`.
pub const RETRIES_TOTAL: &str = "abridge_retries_total";

/// Total requests served by the extractive fallback.
///
/// Labels: `reason` (error kind that triggered the fallback).
pub const FALLBACKS_TOTAL: &str = "abridge_fallbacks_total";

/// Total tokens reported by the generative provider.
///
/// Labels: `provider`, `direction` ("prompt" | "completion").
pub const TOKENS_TOTAL: &str = "abridge_tokens_total";

/// Total result cache hits.
pub const CACHE_HITS_TOTAL: &str = "abridge_cache_hits_total";

/// Total result cache misses (including misses caused by store failures).
pub const CACHE_MISSES_TOTAL: &str = "abridge_cache_misses_total";

/// Total requests denied by the admission limiter.
pub const ADMISSION_DENIED_TOTAL: &str = "abridge_admission_denied_total";

/// Total key-value store failures absorbed by graceful degradation.
///
/// Labels: `component` ("cache" | "limiter").
pub const STORE_ERRORS_TOTAL: &str = "abridge_store_errors_total";
