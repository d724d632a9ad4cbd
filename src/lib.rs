//! Abridge - resilient text summarization with bounded latency
//!
//! Every admitted request gets a summary. The orchestrator tries an
//! upstream text-generation provider under a retry policy and falls back
//! to a local TextRank summarizer when the provider times out, fails or is
//! missing. Results are cached by request fingerprint, and callers are
//! admitted through a per-identity fixed-window limiter. Cache and limiter
//! share a pluggable key-value store and degrade silently when it fails.
//!
//! # Example
//!
//! ```rust,no_run
//! use abridge::{Abridge, SummaryRequest, Tone};
//!
//! #[tokio::main]
//! async fn main() -> abridge::Result<()> {
//!     let orchestrator = Abridge::builder()
//!         .openai("sk-your-key")
//!         .memory_store()
//!         .build()?;
//!
//!     let request = SummaryRequest::new("Long text to summarize. It has sentences.")
//!         .max_output_tokens(80)
//!         .tone(Tone::Concise);
//!
//!     let result = orchestrator.summarize("client-42", request).await?;
//!     println!("{} (via {})", result.summary, result.provider_used.as_str());
//!     Ok(())
//! }
//! ```
//!
//! # Extractive only
//!
//! ```rust
//! use abridge::ExtractiveSummarizer;
//!
//! let summary = ExtractiveSummarizer::default().summarize("A. B. C. D.", 10);
//! assert_eq!(summary, "A. B.");
//! ```

pub mod cache;
pub mod error;
pub mod extractive;
pub mod fingerprint;
pub mod gateway;
pub mod limiter;
pub mod providers;
#[cfg(feature = "server")]
pub mod server;
pub mod store;
pub mod telemetry;
pub mod types;

// Re-export main types at crate root
pub use error::{Result, SummaryError};
pub use gateway::{Abridge, AbridgeBuilder, Orchestrator, Stage};

pub use cache::{CacheConfig, CacheEntry, ResponseCache};
pub use extractive::{ExtractiveConfig, ExtractiveSummarizer};
pub use fingerprint::Fingerprint;
pub use limiter::{Admission, AdmissionLimiter, RateLimitConfig};
pub use providers::{Generation, GenerativeProvider, OpenAiProvider, RetryConfig, RetryPolicy};
#[cfg(feature = "redis")]
pub use store::RedisStore;
pub use store::{KeyValueStore, MemoryStore, StoreError};

pub use types::{
    ComponentStatus, DEFAULT_MAX_OUTPUT_TOKENS, HealthChecks, HealthReport, HealthStatus,
    Language, ProviderUsed, RequestLimits, SummaryRequest, SummaryResult, TokenUsage, Tone,
};
