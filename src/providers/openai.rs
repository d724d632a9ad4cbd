//! OpenAI-compatible chat completions client.
//!
//! Talks to any endpoint implementing `POST /chat/completions` and
//! `GET /models` (OpenAI, Azure-style proxies, vLLM, llama.cpp server).
//! See: <https://platform.openai.com/docs/api-reference/chat>

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::traits::{Generation, GenerativeProvider};
use crate::types::{SummaryRequest, TokenUsage, Tone};
use crate::{Result, SummaryError};

/// Default base URL for the OpenAI API.
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Summaries shorter than this (after trimming) count as empty.
const MIN_SUMMARY_CHARS: usize = 10;

/// Upper bound on upstream error text carried into errors and logs.
const MAX_ERROR_BODY: usize = 200;

/// Client for OpenAI-compatible chat completion APIs.
#[derive(Clone)]
pub struct OpenAiProvider {
    api_key: String,
    http: Client,
    base_url: String,
    model: String,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl OpenAiProvider {
    /// Create a client for the public OpenAI API.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Create a client with a custom base URL (self-hosted endpoints, wiremock).
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            api_key: api_key.into(),
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Use a different model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    async fn complete(&self, request: &SummaryRequest, timeout: Duration) -> Result<Generation> {
        let url = format!("{}/chat/completions", self.base_url);
        let prompt = system_prompt(request);
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &request.text,
                },
            ],
            max_tokens: request.max_output_tokens,
            temperature: 0.3,
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(e, timeout))?;

        let response = check_status(response).await?;

        let completion: ChatResponse = response
            .json()
            .await
            .map_err(|e| transport_error(e, timeout))?;

        let summary = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .unwrap_or_default();

        if summary.chars().count() < MIN_SUMMARY_CHARS {
            return Err(SummaryError::EmptyResponse);
        }

        let usage = completion
            .usage
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        Ok(Generation {
            summary,
            usage,
            model: completion.model.unwrap_or_else(|| self.model.clone()),
        })
    }
}

#[async_trait]
impl GenerativeProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &SummaryRequest, timeout: Duration) -> Result<Generation> {
        debug!(
            model = %self.model,
            text_chars = request.text.chars().count(),
            max_tokens = request.max_output_tokens,
            language = %request.language,
            tone = %request.tone,
            "calling chat completions"
        );

        // The reqwest timeout covers the request; this one also bounds body
        // decoding and drops the in-flight request when it elapses.
        tokio::time::timeout(timeout, self.complete(request, timeout))
            .await
            .map_err(|_| SummaryError::ProviderTimeout(timeout))?
    }

    async fn probe(&self, timeout: Duration) -> Result<()> {
        let url = format!("{}/models", self.base_url);
        let send = self
            .http
            .get(&url)
            .bearer_auth(&self.api_key)
            .timeout(timeout)
            .send();

        let response = tokio::time::timeout(timeout, send)
            .await
            .map_err(|_| SummaryError::ProviderTimeout(timeout))?
            .map_err(|e| transport_error(e, timeout))?;

        check_status(response).await.map(|_| ())
    }
}

/// Build the system prompt from the request's language and tone.
fn system_prompt(request: &SummaryRequest) -> String {
    let language = request.language.display_name();
    let tone = match request.tone {
        Tone::Neutral => "a neutral, objective tone",
        Tone::Concise => "a concise, direct tone",
        Tone::Bullet => "a bullet-point format, one point per line starting with \"- \"",
    };

    format!(
        "You are an assistant that writes summaries in {language}.\n\n\
         Instructions:\n\
         - Write a clear and accurate summary of the provided text\n\
         - Use {tone}\n\
         - Keep the most important and relevant information\n\
         - Keep the summary coherent and well structured\n\
         - Stay within {max_tokens} tokens\n\n\
         Respond only with the summary, without additional explanations.",
        max_tokens = request.max_output_tokens,
    )
}

/// Map a non-success status onto a provider error.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let code = status.as_u16();
    if code == 429 {
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        return Err(SummaryError::ProviderRateLimited { retry_after });
    }

    let mut message = response.text().await.unwrap_or_default();
    if message.chars().count() > MAX_ERROR_BODY {
        message = message.chars().take(MAX_ERROR_BODY).collect();
    }
    if message.is_empty() {
        message = status.to_string();
    }

    if status.is_server_error() {
        Err(SummaryError::ProviderServerError {
            status: code,
            message,
        })
    } else {
        Err(SummaryError::ProviderClientError {
            status: code,
            message,
        })
    }
}

/// Transport and decoding failures are reported as a 502 from the upstream.
fn transport_error(e: reqwest::Error, timeout: Duration) -> SummaryError {
    if e.is_timeout() {
        SummaryError::ProviderTimeout(timeout)
    } else {
        SummaryError::ProviderServerError {
            status: 502,
            message: e.to_string(),
        }
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}
