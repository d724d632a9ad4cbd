//! Public types for the Abridge API.

mod health;
mod request;
mod result;

pub use health::{ComponentStatus, HealthChecks, HealthReport, HealthStatus};
pub use request::{DEFAULT_MAX_OUTPUT_TOKENS, Language, RequestLimits, SummaryRequest, Tone};
pub use result::{ProviderUsed, SummaryResult, TokenUsage};
