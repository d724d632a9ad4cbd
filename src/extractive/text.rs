//! Sentence splitting and term extraction.

use std::collections::BTreeSet;

use super::stopwords;
use crate::fingerprint::normalize_text;
use crate::types::Language;

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '…' | '。')
}

/// Closing punctuation that may trail a terminator (`end."`, `(see above.)`).
fn is_closer(c: char) -> bool {
    matches!(c, '"' | '\'' | ')' | ']' | '»' | '”' | '’')
}

/// Split text into paragraphs at blank lines.
fn paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join(" "));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join(" "));
    }
    paragraphs
}

fn push_sentence(sentences: &mut Vec<String>, candidate: &str) {
    let candidate = candidate.trim();
    if candidate.chars().any(char::is_alphanumeric) {
        sentences.push(candidate.to_string());
    }
}

/// Split text into sentences, in source order.
///
/// A sentence ends at a run of terminators (optionally followed by closing
/// quotes or brackets) that is followed by whitespace or the end of its
/// paragraph. Blank lines always end a sentence. Fragments without any
/// alphanumeric character are dropped.
pub(crate) fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();

    for paragraph in paragraphs(text) {
        let normalized = normalize_text(&paragraph);
        let mut start = 0;
        let mut chars = normalized.char_indices().peekable();

        while let Some((i, c)) = chars.next() {
            if !is_terminator(c) {
                continue;
            }
            let mut end = i + c.len_utf8();
            while let Some(&(j, next)) = chars.peek() {
                if is_terminator(next) || is_closer(next) {
                    end = j + next.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            if let Some(&(_, next)) = chars.peek()
                && next.is_whitespace()
            {
                push_sentence(&mut sentences, &normalized[start..end]);
                start = end;
            }
        }
        push_sentence(&mut sentences, &normalized[start..]);
    }

    sentences
}

/// Lowercased content terms of a sentence, stopwords removed.
pub(crate) fn terms(sentence: &str, language: Language) -> BTreeSet<String> {
    sentence
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .filter(|word| !stopwords::is_stopword(word, language))
        .collect()
}

/// Truncate to at most `max_chars` characters, preferring a word boundary.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let cut = text
        .char_indices()
        .nth(max_chars)
        .map_or(text.len(), |(idx, _)| idx);
    let head = &text[..cut];

    match head.rfind(char::is_whitespace) {
        Some(space) if head[..space].chars().count() * 2 >= max_chars => {
            head[..space].trim_end().to_string()
        }
        _ => head.trim_end().to_string(),
    }
}
