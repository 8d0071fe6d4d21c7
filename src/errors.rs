//! Error types shared across the ingestion, modeling, and output stages.
//!
//! Failures fall into three groups:
//!
//! - [`FetchError`]: per-article failures. They are recorded in an
//!   [`IngestionResult`](crate::models::IngestionResult) and never abort a batch.
//! - [`InvalidConfiguration`]: fatal to a single training call. Variants are split
//!   between "no data" and "bad parameters" so callers can tell them apart.
//! - [`AnalysisError`], [`RenderError`], [`AudioError`], [`ConfigError`]: run-level
//!   failures surfaced to the caller.
//!
//! Malformed `href` values are not errors at all; the link extractor drops them.

use std::fmt;
use thiserror::Error;

/// Classification of a failed article fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// Connection failure, DNS failure, or timeout.
    Network,
    /// The server answered with a non-success status.
    HttpStatus(u16),
    /// The response could not be turned into an article (including an empty body).
    ParseFailure,
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => write!(f, "network"),
            Self::HttpStatus(code) => write!(f, "http status {code}"),
            Self::ParseFailure => write!(f, "parse failure"),
        }
    }
}

/// A single article could not be fetched or parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {detail}")]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub detail: String,
}

impl FetchError {
    pub fn network(detail: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::Network,
            detail: detail.into(),
        }
    }

    pub fn http_status(code: u16, detail: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::HttpStatus(code),
            detail: detail.into(),
        }
    }

    pub fn parse_failure(detail: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::ParseFailure,
            detail: detail.into(),
        }
    }

    /// Whether another attempt could plausibly succeed.
    ///
    /// Network failures, rate limiting (429), and server errors (5xx) are retryable.
    /// Client errors and parse failures are not.
    pub fn is_retryable(&self) -> bool {
        match self.kind {
            FetchErrorKind::Network => true,
            FetchErrorKind::HttpStatus(code) => code == 429 || code >= 500,
            FetchErrorKind::ParseFailure => false,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => FetchError::http_status(status.as_u16(), e.to_string()),
            None if e.is_decode() => FetchError::parse_failure(e.to_string()),
            None => FetchError::network(e.to_string()),
        }
    }
}

/// The topic model refused to train.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidConfiguration {
    #[error("no data: the corpus contains no documents")]
    EmptyCorpus,
    #[error("no data: the corpus contains no terms")]
    EmptyVocabulary,
    #[error("bad parameters: the number of topics must be at least 1")]
    ZeroTopics,
    #[error("bad parameters: {topics} topics requested but only {vocabulary} distinct terms exist")]
    TooManyTopics { topics: usize, vocabulary: usize },
    #[error("bad parameters: the iteration budget must be at least 1")]
    ZeroIterations,
    #[error("bad parameters: prior `{name}` must be finite and positive, got {value}")]
    InvalidPrior { name: &'static str, value: f64 },
    #[error("bad parameters: tolerance must be finite and non-negative, got {0}")]
    InvalidTolerance(f64),
    #[error("bad parameters: document {document} references term {term} outside a vocabulary of {vocabulary}")]
    TermOutOfRange {
        document: usize,
        term: u32,
        vocabulary: usize,
    },
}

impl InvalidConfiguration {
    /// True when training failed because there was nothing to learn from,
    /// as opposed to a bad parameter.
    pub fn is_missing_data(&self) -> bool {
        matches!(self, Self::EmptyCorpus | Self::EmptyVocabulary)
    }
}

/// Failures of the preprocessing → corpus → model → summary → render chain.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("no documents were ingested; skipping topic modeling")]
    NoDocumentsIngested,
    #[error(transparent)]
    Model(#[from] InvalidConfiguration),
    #[error(transparent)]
    Render(#[from] RenderError),
}

impl AnalysisError {
    /// True when there was nothing to model, as opposed to a bad parameter or a
    /// failed write.
    pub fn is_missing_data(&self) -> bool {
        match self {
            Self::NoDocumentsIngested => true,
            Self::Model(e) => e.is_missing_data(),
            Self::Render(_) => false,
        }
    }
}

/// A visualization renderer could not consume a model summary.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to serialize model summary: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Audio synthesis for one document failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AudioError {
    #[error("nothing to synthesize: document body is empty")]
    EmptyText,
    #[error("synthesis failed: {0}")]
    Synthesis(String),
    #[error("failed to write {path}: {detail}")]
    Write { path: String, detail: String },
}

/// The YAML configuration file could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}
