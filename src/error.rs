//! Abridge error types

use std::time::Duration;

/// Abridge error types.
///
/// Only [`Validation`](SummaryError::Validation) and
/// [`RateLimited`](SummaryError::RateLimited) are ever returned from
/// [`Orchestrator::summarize`](crate::Orchestrator::summarize). Everything
/// else is absorbed internally by retries, the extractive fallback, or
/// cache/limiter degradation.
#[derive(Debug, thiserror::Error)]
pub enum SummaryError {
    // Caller-visible
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("rate limit exceeded ({limit} requests per {window:?})")]
    RateLimited { limit: u64, window: Duration },

    // Provider errors (absorbed by the retry policy or the fallback)
    #[error("provider timed out after {0:?}")]
    ProviderTimeout(Duration),

    #[error("provider rate limited, retry after {retry_after:?}")]
    ProviderRateLimited { retry_after: Option<Duration> },

    #[error("provider server error ({status}): {message}")]
    ProviderServerError { status: u16, message: String },

    #[error("provider rejected request ({status}): {message}")]
    ProviderClientError { status: u16, message: String },

    #[error("provider unavailable after {attempts} attempt(s)")]
    ProviderUnavailable { attempts: u32 },

    #[error("empty response from provider")]
    EmptyResponse,

    // Store errors (logged, never propagated past cache/limiter)
    #[error("cache store unavailable: {0}")]
    CacheUnavailable(String),

    #[error("rate limiter store unavailable: {0}")]
    LimiterStoreUnavailable(String),

    // Configuration/data errors
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SummaryError {
    /// Whether the retry policy should try the operation again.
    ///
    /// Timeouts, upstream 429s, upstream 5xx (including transport failures)
    /// and empty completions are transient. Upstream 4xx other than 429 is
    /// fatal and aborts the retry loop immediately.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SummaryError::ProviderTimeout(_)
                | SummaryError::ProviderRateLimited { .. }
                | SummaryError::ProviderServerError { .. }
                | SummaryError::EmptyResponse
        )
    }

    /// Upstream `retry-after` hint, if the error carries one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            SummaryError::ProviderRateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Whether this error may be shown to the caller of `summarize`.
    pub fn is_caller_visible(&self) -> bool {
        matches!(
            self,
            SummaryError::Validation(_) | SummaryError::RateLimited { .. }
        )
    }

    /// Short, stable label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            SummaryError::Validation(_) => "validation",
            SummaryError::RateLimited { .. } => "rate_limited",
            SummaryError::ProviderTimeout(_) => "provider_timeout",
            SummaryError::ProviderRateLimited { .. } => "provider_rate_limited",
            SummaryError::ProviderServerError { .. } => "provider_server_error",
            SummaryError::ProviderClientError { .. } => "provider_client_error",
            SummaryError::ProviderUnavailable { .. } => "provider_unavailable",
            SummaryError::EmptyResponse => "empty_response",
            SummaryError::CacheUnavailable(_) => "cache_unavailable",
            SummaryError::LimiterStoreUnavailable(_) => "limiter_store_unavailable",
            SummaryError::Configuration(_) => "configuration",
            SummaryError::Json(_) => "json",
        }
    }
}

/// Result type alias for Abridge operations
pub type Result<T> = std::result::Result<T, SummaryError>;
