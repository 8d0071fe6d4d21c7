//! # Awful News Topics
//!
//! Discovers today's articles on a news front page, ingests each one with
//! per-article failure isolation, and fits a topic model to the corpus. The
//! model summary is written as JSON for visualization front ends, and articles
//! can optionally be narrated to MP3.
//!
//! ## Usage
//!
//! ```sh
//! awful_news_topics -j ./json
//! ```
//!
//! ## Architecture
//!
//! 1. **Discovery**: Fetch the seed page and extract same-origin, recent article links
//! 2. **Ingestion**: Fetch and parse every link concurrently; failures are recorded, not fatal
//! 3. **Narration** (optional): Synthesize each article body into `article_{n}.mp3`
//! 4. **Analysis**: Preprocess, build the corpus, train the topic model, export a summary
//! 5. **Output**: Write the summary to `{json_output_dir}/{date}/{edition}.json`

use clap::Parser;
use std::error::Error;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod analysis;
mod cli;
mod config;
mod corpus;
mod errors;
mod ingest;
mod models;
mod outputs;
mod scrapers;
mod text;
mod topics;
mod utils;

use analysis::analyze_and_render;
use cli::Cli;
use config::AppConfig;
use ingest::IngestionPipeline;
use outputs::audio::{HttpSpeechSynthesizer, narrate_documents};
use outputs::json::JsonFileRenderer;
use scrapers::fetcher::{HttpDocumentFetcher, RetryFetcher, fetch_seed_page};
use scrapers::links::LinkExtractor;
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("awful_news_topics starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(?args.json_output_dir, ?args.config, "Parsed CLI arguments");

    let mut config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    args.apply_overrides(&mut config);
    debug!(?config, "Effective configuration");

    // Early check: ensure JSON output dir is writable
    if let Err(e) = ensure_writable_dir(&args.json_output_dir).await {
        error!(
            path = %args.json_output_dir,
            error = %e,
            "JSON output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    // ---- Discover links ----
    let http = HttpDocumentFetcher::new(Duration::from_secs(config.ingestion.item_timeout_secs))?;
    let seed_page = fetch_seed_page(http.client(), &config.ingestion.seed_url).await?;
    let extractor = LinkExtractor::new(&seed_page.source_url, config.ingestion.recency.clone())?;
    let links = extractor.extract_page(&seed_page);
    info!(count = links.len(), seed_url = %seed_page.source_url, "Discovered candidate links");

    // ---- Ingest articles ----
    let client = http.client().clone();
    let fetcher = RetryFetcher::new(
        http,
        config.ingestion.max_retries,
        Duration::from_millis(config.ingestion.retry_base_delay_ms),
    );
    let result = IngestionPipeline::new(fetcher)
        .with_concurrency(config.ingestion.concurrency)
        .with_item_timeout(Duration::from_secs(config.ingestion.item_timeout_secs))
        .ingest(&links)
        .await;
    for failed in &result.failed {
        debug!(url = %failed.url, kind = %failed.reason.kind, "Failed link");
    }
    info!(
        total = result.total(),
        succeeded = result.succeeded.len(),
        failed = result.failed.len(),
        "Ingestion finished"
    );
    let documents = result.into_documents();

    // ---- Optional narration ----
    match (&args.audio_output_dir, &config.narration.endpoint) {
        (Some(dir), Some(endpoint)) => {
            let synthesizer = HttpSpeechSynthesizer::new(client, endpoint, config.text.language)?
                .with_max_chunk_chars(config.narration.max_chunk_chars);
            let report = narrate_documents(
                &documents,
                &synthesizer,
                Path::new(dir),
                config.narration.concurrency,
            )
            .await;
            info!(
                written = report.written.len(),
                failed = report.failed.len(),
                "Narration finished"
            );
        }
        (Some(dir), None) => {
            warn!(audio_output_dir = %dir, "No speech endpoint configured; skipping narration");
        }
        _ => {}
    }

    // ---- Topic model ----
    let renderer = JsonFileRenderer::new(&args.json_output_dir);
    if let Some(analysis) = analyze_and_render(&documents, &config, &renderer).await? {
        info!(
            documents = analysis.model.num_documents(),
            encoded = analysis.corpus.len(),
            vocabulary = analysis.vocabulary.len(),
            path = %renderer.output_path().display(),
            "Wrote topic summary"
        );
        if !analysis.report.converged {
            warn!(
                iterations = analysis.report.iterations,
                "Topic model used its whole iteration budget without converging"
            );
        }
        for topic in &analysis.summary.topics {
            let terms: Vec<&str> = topic.top_terms.iter().map(|t| t.term.as_str()).collect();
            info!(topic = topic.id, prevalence = topic.prevalence, terms = %terms.join(", "), "Topic");
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
