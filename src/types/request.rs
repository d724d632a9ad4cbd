//! Summary request types and validation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Result, SummaryError};

/// Default `max_output_tokens` when a request omits it.
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 100;

/// Language of the input text.
///
/// Parsed case-insensitively; `auto` lets the provider detect it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Language {
    #[default]
    Auto,
    Spanish,
    English,
    French,
    German,
    Italian,
    Portuguese,
}

impl Language {
    pub const ALL: [Language; 7] = [
        Language::Auto,
        Language::Spanish,
        Language::English,
        Language::French,
        Language::German,
        Language::Italian,
        Language::Portuguese,
    ];

    /// Canonical lowercase code (`auto` or ISO 639-1).
    pub fn as_str(self) -> &'static str {
        match self {
            Language::Auto => "auto",
            Language::Spanish => "es",
            Language::English => "en",
            Language::French => "fr",
            Language::German => "de",
            Language::Italian => "it",
            Language::Portuguese => "pt",
        }
    }

    /// English display name, used in provider prompts.
    pub fn display_name(self) -> &'static str {
        match self {
            Language::Auto => "the language of the input text",
            Language::Spanish => "Spanish",
            Language::English => "English",
            Language::French => "French",
            Language::German => "German",
            Language::Italian => "Italian",
            Language::Portuguese => "Portuguese",
        }
    }
}

impl FromStr for Language {
    type Err = SummaryError;

    fn from_str(s: &str) -> Result<Self> {
        let code = s.trim().to_ascii_lowercase();
        Language::ALL
            .into_iter()
            .find(|lang| lang.as_str() == code)
            .ok_or_else(|| {
                SummaryError::Validation(format!(
                    "unsupported language '{s}', expected one of auto|es|en|fr|de|it|pt"
                ))
            })
    }
}

impl TryFrom<String> for Language {
    type Error = SummaryError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Language> for String {
    fn from(lang: Language) -> Self {
        lang.as_str().to_string()
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested tone of the summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Tone {
    #[default]
    Neutral,
    Concise,
    Bullet,
}

impl Tone {
    pub fn as_str(self) -> &'static str {
        match self {
            Tone::Neutral => "neutral",
            Tone::Concise => "concise",
            Tone::Bullet => "bullet",
        }
    }
}

impl FromStr for Tone {
    type Err = SummaryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "neutral" => Ok(Tone::Neutral),
            "concise" => Ok(Tone::Concise),
            "bullet" => Ok(Tone::Bullet),
            _ => Err(SummaryError::Validation(format!(
                "unsupported tone '{s}', expected one of neutral|concise|bullet"
            ))),
        }
    }
}

impl TryFrom<String> for Tone {
    type Error = SummaryError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Tone> for String {
    fn from(tone: Tone) -> Self {
        tone.as_str().to_string()
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request to summarize free text.
///
/// ```rust
/// # use abridge::{SummaryRequest, Tone};
/// let request = SummaryRequest::new("Some long text. With sentences.")
///     .max_output_tokens(150)
///     .tone(Tone::Concise);
/// assert_eq!(request.max_output_tokens, 150);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRequest {
    /// Text to summarize.
    pub text: String,

    /// Language of the text.
    #[serde(default, alias = "lang")]
    pub language: Language,

    /// Upper bound on the summary length, in tokens.
    #[serde(default = "default_max_output_tokens", alias = "max_tokens")]
    pub max_output_tokens: u32,

    /// Summary tone.
    #[serde(default)]
    pub tone: Tone,
}

fn default_max_output_tokens() -> u32 {
    DEFAULT_MAX_OUTPUT_TOKENS
}

impl SummaryRequest {
    /// Create a request with default language, tone and token budget.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            language: Language::default(),
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            tone: Tone::default(),
        }
    }

    /// Set the language.
    pub fn language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    /// Set the output token budget.
    pub fn max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = tokens;
        self
    }

    /// Set the tone.
    pub fn tone(mut self, tone: Tone) -> Self {
        self.tone = tone;
        self
    }

    /// Check the request against the configured limits.
    ///
    /// Text must be non-empty after trimming and at most
    /// `limits.max_text_length` characters; `max_output_tokens` must lie
    /// within `limits.min_output_tokens..=limits.max_output_tokens`.
    pub fn validate(&self, limits: &RequestLimits) -> Result<()> {
        let text = self.text.trim();
        if text.is_empty() {
            return Err(SummaryError::Validation("text must not be empty".into()));
        }

        let chars = text.chars().count();
        if chars > limits.max_text_length {
            return Err(SummaryError::Validation(format!(
                "text is {chars} characters, maximum is {}",
                limits.max_text_length
            )));
        }

        if !(limits.min_output_tokens..=limits.max_output_tokens)
            .contains(&self.max_output_tokens)
        {
            return Err(SummaryError::Validation(format!(
                "max_output_tokens must be between {} and {}, got {}",
                limits.min_output_tokens, limits.max_output_tokens, self.max_output_tokens
            )));
        }

        Ok(())
    }
}

/// Bounds applied to incoming requests before orchestration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestLimits {
    /// Maximum input length in characters. Default: 50,000.
    pub max_text_length: usize,
    /// Smallest accepted `max_output_tokens`. Default: 10.
    pub min_output_tokens: u32,
    /// Ceiling for `max_output_tokens`. Default: 1,000.
    pub max_output_tokens: u32,
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self {
            max_text_length: 50_000,
            min_output_tokens: 10,
            max_output_tokens: 1_000,
        }
    }
}
