//! Command-line interface definitions for Awful News Topics.
//!
//! Flags override the matching `config.yaml` values; every flag can also be
//! supplied through an environment variable.

use clap::Parser;

use crate::config::AppConfig;
use crate::scrapers::links::RecencyFilter;

/// Command-line arguments for the Awful News Topics application.
///
/// # Examples
///
/// ```sh
/// # Model today's CNN front page with the defaults
/// awful_news_topics -j ./json
///
/// # Eight topics over 2025 articles, narrated through a speech endpoint
/// awful_news_topics -j ./json --recency-token 2025 --topics 8 \
///     --audio-output-dir ./audio --tts-endpoint http://localhost:5002/tts
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Output directory for the topic summary JSON
    #[arg(short, long, env = "JSON_OUTPUT_DIR")]
    pub json_output_dir: String,

    /// Optional path to config.yaml file
    #[arg(short, long, env = "AWFUL_NEWS_TOPICS_CONFIG")]
    pub config: Option<String>,

    /// Front page to discover articles from
    #[arg(short, long, env = "SEED_URL")]
    pub seed_url: Option<String>,

    /// Keep only links with this exact path segment (e.g. a year)
    #[arg(long, env = "RECENCY_TOKEN")]
    pub recency_token: Option<String>,

    /// Number of topics to fit
    #[arg(short = 'k', long, env = "NUM_TOPICS")]
    pub topics: Option<usize>,

    /// Maximum number of training passes
    #[arg(long, env = "MAX_ITERATIONS")]
    pub iterations: Option<usize>,

    /// Articles fetched concurrently
    #[arg(long, env = "FETCH_CONCURRENCY")]
    pub concurrency: Option<usize>,

    /// Directory for per-article MP3 narration (requires a speech endpoint)
    #[arg(long, env = "AUDIO_OUTPUT_DIR")]
    pub audio_output_dir: Option<String>,

    /// Speech endpoint used for narration
    #[arg(long, env = "TTS_ENDPOINT")]
    pub tts_endpoint: Option<String>,
}

impl Cli {
    /// Apply flags on top of a loaded configuration.
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(seed_url) = &self.seed_url {
            config.ingestion.seed_url = seed_url.clone();
        }
        if let Some(token) = &self.recency_token {
            config.ingestion.recency = RecencyFilter::PathSegment {
                token: token.clone(),
            };
        }
        if let Some(topics) = self.topics {
            config.model.num_topics = topics;
        }
        if let Some(iterations) = self.iterations {
            config.model.max_iterations = iterations;
        }
        if let Some(concurrency) = self.concurrency {
            config.ingestion.concurrency = concurrency;
        }
        if let Some(endpoint) = &self.tts_endpoint {
            config.narration.endpoint = Some(endpoint.clone());
        }
    }
}
