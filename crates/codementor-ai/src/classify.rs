//! Keyword-based sentiment classification of short texts.

use serde::Serialize;

const POSITIVE_WORDS: [&str; 7] = [
    "good",
    "excellent",
    "happy",
    "fantastic",
    "positive",
    "great",
    "wonderful",
];

const NEGATIVE_WORDS: [&str; 7] = [
    "bad",
    "terrible",
    "sad",
    "horrible",
    "negative",
    "awful",
    "fatal",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub fn as_str(self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }
}

/// Classify a text. Positive keywords take precedence over negative ones;
/// matching is by lowercase substring.
pub fn classify(text: &str) -> Sentiment {
    let text = text.to_lowercase();
    if POSITIVE_WORDS.iter().any(|w| text.contains(w)) {
        Sentiment::Positive
    } else if NEGATIVE_WORDS.iter().any(|w| text.contains(w)) {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}
