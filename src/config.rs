//! Runtime configuration.
//!
//! Every section has defaults suited to a front page's worth of articles, so an
//! empty or partial `config.yaml` is valid:
//!
//! ```yaml
//! ingestion:
//!   seed_url: https://www.cnn.com
//!   recency:
//!     kind: path_segment
//!     token: "2024"
//!   concurrency: 8
//! model:
//!   num_topics: 5
//!   max_iterations: 100
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, instrument};

use crate::errors::ConfigError;
use crate::scrapers::links::RecencyFilter;
use crate::text::Language;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub ingestion: IngestionConfig,
    pub text: TextConfig,
    pub model: ModelConfig,
    pub summary: SummaryConfig,
    pub narration: NarrationConfig,
}

impl AppConfig {
    /// Load configuration from a YAML file.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;
        let config = Self::from_yaml(&raw).map_err(|source| ConfigError::Parse {
            path: display,
            source,
        })?;
        info!("Loaded configuration");
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
    }
}

/// Link discovery and article fetching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Front page whose links are ingested.
    pub seed_url: String,
    pub recency: RecencyFilter,
    /// Fetches in flight at once.
    pub concurrency: usize,
    /// Per-article deadline in seconds.
    pub item_timeout_secs: u64,
    /// Extra attempts for retryable failures. Zero means one attempt per link.
    pub max_retries: usize,
    pub retry_base_delay_ms: u64,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            seed_url: "https://www.cnn.com".to_string(),
            recency: RecencyFilter::default(),
            concurrency: 8,
            item_timeout_secs: 30,
            max_retries: 0,
            retry_base_delay_ms: 1_000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    pub language: Language,
}

/// Topic model hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Number of topics K.
    pub num_topics: usize,
    /// Upper bound on EM passes.
    pub max_iterations: usize,
    /// Stop once the log-likelihood gain of a pass falls below this. `None` runs
    /// the full iteration budget.
    pub tolerance: Option<f64>,
    /// Dirichlet smoothing on document-topic counts.
    pub alpha: f64,
    /// Dirichlet smoothing on topic-word counts.
    pub beta: f64,
    /// Seed for the random topic-word initialization.
    pub seed: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            num_topics: 5,
            max_iterations: 100,
            tolerance: Some(1e-4),
            alpha: 0.1,
            beta: 0.01,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    /// Terms listed per topic.
    pub top_terms: usize,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self { top_terms: 10 }
    }
}

/// Optional spoken narration of ingested articles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrationConfig {
    /// Speech endpoint; narration is skipped when unset.
    pub endpoint: Option<String>,
    pub concurrency: usize,
    /// Longest text sent to the endpoint in one request.
    pub max_chunk_chars: usize,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            concurrency: 4,
            max_chunk_chars: 200,
        }
    }
}
