//! Provider capability trait.
//!
//! The orchestrator only needs two things from an upstream text generator:
//! produce a summary for a request and report whether it is reachable.
//! Anything that can do both (a hosted API, a local model, a test double)
//! implements [`GenerativeProvider`].

use std::time::Duration;

use async_trait::async_trait;

use crate::Result;
use crate::types::{SummaryRequest, TokenUsage};

/// Output of a successful generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub summary: String,
    /// Zero when the upstream did not report usage.
    pub usage: TokenUsage,
    /// Model that actually served the request.
    pub model: String,
}

/// Upstream text-generation capability.
///
/// Implementations map their failures onto the provider variants of
/// [`SummaryError`](crate::SummaryError) so the retry policy can classify
/// them: `ProviderTimeout`, `ProviderRateLimited` and `ProviderServerError`
/// are retried, `ProviderClientError` is not.
#[async_trait]
pub trait GenerativeProvider: Send + Sync {
    /// Provider name for logging and metrics.
    fn name(&self) -> &str;

    /// Configured model identifier.
    fn model(&self) -> &str;

    /// Summarize `request`, giving up after `timeout`.
    async fn generate(&self, request: &SummaryRequest, timeout: Duration) -> Result<Generation>;

    /// Cheap reachability check used by health reporting.
    async fn probe(&self, timeout: Duration) -> Result<()>;
}
