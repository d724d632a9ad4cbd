//! Local extractive summarizer.
//!
//! A TextRank implementation that picks the most central sentences of the
//! input and emits them in source order. It has no I/O and cannot fail,
//! which makes it the last-resort path of the orchestrator.
//!
//! ```rust
//! use abridge::ExtractiveSummarizer;
//!
//! let summarizer = ExtractiveSummarizer::default();
//! assert_eq!(summarizer.summarize("A. B. C. D.", 10), "A. B.");
//! ```

mod rank;
mod stopwords;
mod text;

use crate::types::{Language, SummaryRequest, Tone};
use rank::RankParams;

/// Model name reported for fallback results.
pub const MODEL_NAME: &str = "textrank-extractive";

/// Tuning knobs for the extractive summarizer.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractiveConfig {
    /// PageRank damping factor. Default: 0.85.
    pub damping: f64,
    /// Upper bound on PageRank rounds. Default: 100.
    pub max_iterations: usize,
    /// L1 delta below which ranking stops early. Default: 1e-6.
    pub convergence: f64,
    /// Characters per output token when converting the budget. Default: 4.
    pub chars_per_token: usize,
}

impl Default for ExtractiveConfig {
    fn default() -> Self {
        Self {
            damping: 0.85,
            max_iterations: 100,
            convergence: 1e-6,
            chars_per_token: 4,
        }
    }
}

/// TextRank summarizer. Pure and deterministic.
#[derive(Debug, Clone, Default)]
pub struct ExtractiveSummarizer {
    config: ExtractiveConfig,
}

impl ExtractiveSummarizer {
    pub fn new(config: ExtractiveConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractiveConfig {
        &self.config
    }

    /// Summarize `text` within `max_output_tokens`, neutral tone, stopwords
    /// of every supported language.
    pub fn summarize(&self, text: &str, max_output_tokens: u32) -> String {
        self.summarize_with(text, max_output_tokens, Language::Auto, Tone::Neutral)
    }

    /// Summarize a request using its language, tone and token budget.
    pub fn summarize_request(&self, request: &SummaryRequest) -> String {
        self.summarize_with(
            &request.text,
            request.max_output_tokens,
            request.language,
            request.tone,
        )
    }

    /// Summarize with explicit language and tone.
    pub fn summarize_with(
        &self,
        input: &str,
        max_output_tokens: u32,
        language: Language,
        tone: Tone,
    ) -> String {
        let budget = (max_output_tokens as usize).saturating_mul(self.config.chars_per_token);

        let sentences = text::split_sentences(input);
        match sentences.len() {
            0 => return text::truncate_chars(input.trim(), budget),
            1 => return sentences[0].clone(),
            _ => {}
        }

        let terms: Vec<_> = sentences
            .iter()
            .map(|sentence| text::terms(sentence, language))
            .collect();
        let scores = rank::rank(
            &terms,
            RankParams {
                damping: self.config.damping,
                max_iterations: self.config.max_iterations,
                tolerance: self.config.convergence,
            },
        );

        let mut order: Vec<usize> = (0..sentences.len()).collect();
        order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)));

        let cap = sentence_cap(sentences.len());
        let mut selected = Vec::with_capacity(cap);
        let mut used = 0usize;
        for &idx in &order {
            if selected.len() == cap {
                break;
            }
            let cost = rendered_len(&sentences[idx], tone, selected.is_empty());
            if used + cost <= budget {
                used += cost;
                selected.push(idx);
            }
        }

        if selected.is_empty() {
            let top = &sentences[order[0]];
            return match tone {
                Tone::Bullet => format!(
                    "- {}",
                    text::truncate_chars(top, budget.saturating_sub(BULLET.len()))
                ),
                _ => text::truncate_chars(top, budget),
            };
        }

        selected.sort_unstable();
        render(selected.iter().map(|&idx| sentences[idx].as_str()), tone)
    }
}

const BULLET: &str = "- ";

/// Maximum number of sentences to extract from `n` candidates.
pub fn sentence_cap(n: usize) -> usize {
    match n {
        0..=5 => (n / 2).max(1),
        6..=20 => (n / 3).max(2),
        _ => (n / 4).max(3),
    }
}

/// Characters a sentence adds to the rendered summary.
fn rendered_len(sentence: &str, tone: Tone, first: bool) -> usize {
    let len = sentence.chars().count();
    let separator = usize::from(!first);
    match tone {
        Tone::Bullet => len + BULLET.len() + separator,
        _ => len + separator,
    }
}

fn render<'a>(sentences: impl Iterator<Item = &'a str>, tone: Tone) -> String {
    match tone {
        Tone::Bullet => sentences
            .map(|s| format!("{BULLET}{s}"))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => sentences.collect::<Vec<_>>().join(" "),
    }
}
