//! Generative providers and the retry policy that drives them.

pub mod openai;
pub mod retry;
pub mod traits;

pub use openai::OpenAiProvider;
pub use retry::{RetryConfig, RetryPolicy};
pub use traits::{Generation, GenerativeProvider};
