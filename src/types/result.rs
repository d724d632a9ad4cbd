//! Summary result envelope.

use serde::{Deserialize, Serialize};

/// Which path produced a summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderUsed {
    /// The upstream text-generation provider.
    Generative,
    /// The local extractive summarizer.
    Fallback,
}

impl ProviderUsed {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderUsed::Generative => "generative",
            ProviderUsed::Fallback => "fallback",
        }
    }
}

/// Token usage statistics.
///
/// Zero whenever the fallback produced the summary or the upstream did not
/// report usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt: u32,
    pub completion: u32,
}

impl TokenUsage {
    pub fn new(prompt: u32, completion: u32) -> Self {
        Self { prompt, completion }
    }

    pub fn total(&self) -> u32 {
        self.prompt.saturating_add(self.completion)
    }

    pub fn is_zero(&self) -> bool {
        self.prompt == 0 && self.completion == 0
    }
}

/// Uniform result envelope returned for every admitted request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryResult {
    pub summary: String,
    pub provider_used: ProviderUsed,
    #[serde(default)]
    pub token_usage: TokenUsage,
    /// Upstream model name, or the extractive method name.
    pub model: String,
    /// End-to-end latency measured inside the orchestrator.
    pub latency_ms: u64,
    #[serde(default)]
    pub served_from_cache: bool,
}

impl SummaryResult {
    /// Whether the extractive fallback produced this summary.
    pub fn is_fallback(&self) -> bool {
        self.provider_used == ProviderUsed::Fallback
    }

    /// Copy of this result with a different latency.
    pub fn with_latency(&self, latency_ms: u64) -> Self {
        Self {
            latency_ms,
            ..self.clone()
        }
    }

    /// Copy of this result with `served_from_cache` set.
    pub fn with_served_from_cache(&self, served_from_cache: bool) -> Self {
        Self {
            served_from_cache,
            ..self.clone()
        }
    }
}
