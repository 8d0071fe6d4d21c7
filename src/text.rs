//! Article text normalization.
//!
//! Turns body text into the token sequence the topic model sees:
//!
//! 1. Split on word boundaries, so `Biden's` yields `Biden` and `s`, and
//!    `talks—held` yields `talks` and `held`. Dotted acronyms (`U.S.`) and numbers
//!    with separators (`5.00`, `10,000`) stay whole.
//! 2. Lowercase
//! 3. Keep only tokens made entirely of alphanumeric characters, which drops the
//!    acronyms and separated numbers above
//! 4. Drop stopwords for the configured [`Language`]
//!
//! Every step is a pure function of the input, so documents can be processed in
//! any order or in parallel.

use once_cell::sync::Lazy;
use rayon::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, instrument};

/// Normalized tokens of one document, in text order.
pub type TokenSequence = Vec<String>;

/// Language whose stopword list is applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    English,
}

impl Language {
    pub fn stopwords(self) -> &'static HashSet<&'static str> {
        match self {
            Language::English => Lazy::force(&ENGLISH_STOPWORDS),
        }
    }

    /// ISO 639-1 code.
    pub fn code(self) -> &'static str {
        match self {
            Language::English => "en",
        }
    }
}

static ENGLISH_STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "your", "yours",
        "yourself", "yourselves", "he", "him", "his", "himself", "she", "her", "hers", "herself",
        "it", "its", "itself", "they", "them", "their", "theirs", "themselves", "what", "which",
        "who", "whom", "this", "that", "these", "those", "am", "is", "are", "was", "were", "be",
        "been", "being", "have", "has", "had", "having", "do", "does", "did", "doing", "a", "an",
        "the", "and", "but", "if", "or", "because", "as", "until", "while", "of", "at", "by",
        "for", "with", "about", "against", "between", "into", "through", "during", "before",
        "after", "above", "below", "to", "from", "up", "down", "in", "out", "on", "off", "over",
        "under", "again", "further", "then", "once", "here", "there", "when", "where", "why",
        "how", "all", "any", "both", "each", "few", "more", "most", "other", "some", "such", "no",
        "nor", "not", "only", "own", "same", "so", "than", "too", "very", "s", "t", "can", "will",
        "just", "don", "should", "now", "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren",
        "couldn", "didn", "doesn", "hadn", "hasn", "haven", "isn", "ma", "mightn", "mustn",
        "needn", "shan", "shouldn", "wasn", "weren", "won", "wouldn", "said", "says", "also",
        "would", "could",
    ]
    .into_iter()
    .collect()
});

static WORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\p{L}\.){2,}|\d+(?:[.,:]\d+)+|\w+").expect("word pattern is valid")
});

/// Normalizes raw text into [`TokenSequence`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextPreprocessor {
    language: Language,
}

impl TextPreprocessor {
    pub fn new(language: Language) -> Self {
        Self { language }
    }

    /// Tokenize one document. Empty input yields an empty sequence.
    pub fn preprocess(&self, text: &str) -> TokenSequence {
        let stopwords = self.language.stopwords();
        WORD.find_iter(text)
            .map(|word| word.as_str().to_lowercase())
            .filter(|token| token.chars().all(char::is_alphanumeric))
            .filter(|token| !stopwords.contains(token.as_str()))
            .collect()
    }

    /// Tokenize many documents in parallel, keeping input order.
    #[instrument(level = "info", skip_all, fields(documents = texts.len()))]
    pub fn preprocess_all<S>(&self, texts: &[S]) -> Vec<TokenSequence>
    where
        S: AsRef<str> + Sync,
    {
        let sequences: Vec<TokenSequence> = texts
            .par_iter()
            .map(|text| self.preprocess(text.as_ref()))
            .collect();
        debug!(
            tokens = sequences.iter().map(Vec::len).sum::<usize>(),
            "Preprocessed documents"
        );
        sequences
    }
}
