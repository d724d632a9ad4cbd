//! Per-language stopword lists.
//!
//! Short, high-frequency function words only. `Language::Auto` checks the
//! union of all lists.

use crate::types::Language;

const ENGLISH: &[&str] = &[
    "a", "about", "after", "all", "also", "an", "and", "any", "are", "as", "at", "be", "been",
    "before", "but", "by", "can", "could", "did", "do", "does", "for", "from", "had", "has",
    "have", "he", "her", "his", "how", "i", "if", "in", "into", "is", "it", "its", "more", "most",
    "no", "not", "of", "on", "only", "or", "other", "our", "she", "so", "some", "such", "than",
    "that", "the", "their", "them", "then", "there", "these", "they", "this", "those", "to", "too",
    "very", "was", "we", "were", "what", "when", "where", "which", "while", "who", "will", "with",
    "would", "you", "your",
];

const SPANISH: &[&str] = &[
    "a", "al", "algo", "ante", "como", "con", "cual", "de", "del", "desde", "donde", "el", "ella",
    "ellos", "en", "entre", "era", "es", "esa", "ese", "eso", "esta", "este", "esto", "fue", "ha",
    "hay", "la", "las", "le", "les", "lo", "los", "mas", "más", "me", "muy", "ni", "no", "nos",
    "o", "para", "pero", "por", "que", "qué", "se", "sin", "sobre", "son", "su", "sus", "también",
    "tiene", "un", "una", "uno", "y", "ya",
];

const FRENCH: &[&str] = &[
    "au", "aux", "avec", "ce", "ces", "cette", "dans", "de", "des", "du", "elle", "en", "est",
    "et", "il", "ils", "je", "la", "le", "les", "leur", "lui", "mais", "me", "même", "ne", "nous",
    "on", "ou", "par", "pas", "pour", "qu", "que", "qui", "sa", "se", "ses", "son", "sont", "sur",
    "ta", "te", "tu", "un", "une", "vous", "y", "été", "être",
];

const GERMAN: &[&str] = &[
    "als", "am", "an", "auch", "auf", "aus", "bei", "bis", "das", "dass", "dem", "den", "der",
    "des", "die", "doch", "ein", "eine", "einem", "einen", "einer", "es", "für", "hat", "ich",
    "ihr", "im", "in", "ist", "mit", "nach", "nicht", "noch", "nur", "oder", "sich", "sie",
    "sind", "so", "um", "und", "von", "vor", "war", "wie", "wir", "wird", "zu", "zum", "zur",
];

const ITALIAN: &[&str] = &[
    "a", "al", "alla", "anche", "che", "chi", "ci", "come", "con", "da", "dal", "dei", "del",
    "della", "di", "e", "è", "gli", "ha", "i", "il", "in", "la", "le", "lo", "ma", "mi", "ne",
    "nel", "nella", "non", "o", "per", "più", "quella", "questo", "se", "si", "sono", "su", "sul",
    "tra", "un", "una", "uno",
];

const PORTUGUESE: &[&str] = &[
    "a", "ao", "aos", "as", "com", "como", "da", "das", "de", "do", "dos", "e", "é", "ela",
    "ele", "em", "entre", "era", "essa", "esse", "esta", "este", "eu", "foi", "há", "isso", "já",
    "mais", "mas", "me", "na", "nas", "no", "nos", "não", "o", "os", "ou", "para", "pela", "pelo",
    "por", "que", "se", "sem", "seu", "sua", "também", "um", "uma",
];

fn list(language: Language) -> &'static [&'static str] {
    match language {
        Language::English => ENGLISH,
        Language::Spanish => SPANISH,
        Language::French => FRENCH,
        Language::German => GERMAN,
        Language::Italian => ITALIAN,
        Language::Portuguese => PORTUGUESE,
        Language::Auto => &[],
    }
}

/// Whether `word` (already lowercased) is a stopword for `language`.
pub(crate) fn is_stopword(word: &str, language: Language) -> bool {
    match language {
        Language::Auto => Language::ALL
            .iter()
            .filter(|lang| **lang != Language::Auto)
            .any(|lang| list(*lang).contains(&word)),
        lang => list(lang).contains(&word),
    }
}
