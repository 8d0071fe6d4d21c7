//! Failure-isolated article ingestion.
//!
//! Every candidate link is fetched independently on a bounded pool of
//! concurrent requests. A failure is classified, logged, and recorded against its
//! URL; it never stops the rest of the batch. Results are collected out of order
//! and then restored to input order, so the succeeded/failed partition depends
//! only on the fetch outcomes.

use futures::stream::{self, StreamExt};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use crate::config::IngestionConfig;
use crate::errors::FetchError;
use crate::models::{Document, FailedLink, IngestionResult};
use crate::scrapers::fetcher::DocumentFetcher;

/// Drives fetch + parse for a batch of candidate links.
#[derive(Debug)]
pub struct IngestionPipeline<F> {
    fetcher: F,
    concurrency: usize,
    item_timeout: Duration,
}

impl<F> IngestionPipeline<F>
where
    F: DocumentFetcher,
{
    /// Pipeline with the default concurrency and per-article deadline.
    pub fn new(fetcher: F) -> Self {
        let defaults = IngestionConfig::default();
        Self {
            fetcher,
            concurrency: defaults.concurrency,
            item_timeout: Duration::from_secs(defaults.item_timeout_secs),
        }
    }

    /// Maximum number of fetches in flight at once (at least 1).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Per-article deadline; a fetch exceeding it is recorded as a network failure.
    pub fn with_item_timeout(mut self, item_timeout: Duration) -> Self {
        self.item_timeout = item_timeout;
        self
    }

    /// Ingest every link, partitioning them into succeeded and failed.
    #[instrument(level = "info", skip_all, fields(links = links.len(), concurrency = self.concurrency))]
    pub async fn ingest(&self, links: &[String]) -> IngestionResult {
        let mut outcomes: Vec<(usize, &String, Result<Document, FetchError>)> =
            stream::iter(links.iter().enumerate())
                .map(|(i, url)| async move { (i, url, self.ingest_one(url).await) })
                .buffer_unordered(self.concurrency)
                .collect()
                .await;
        outcomes.sort_by_key(|(i, _, _)| *i);

        let mut result = IngestionResult::default();
        for (_, url, outcome) in outcomes {
            match outcome {
                Ok(document) => result.succeeded.push(document),
                Err(reason) => result.failed.push(FailedLink {
                    url: url.clone(),
                    reason,
                }),
            }
        }

        info!(
            total = links.len(),
            succeeded = result.succeeded.len(),
            failed = result.failed.len(),
            "Completed article ingestion"
        );
        result
    }

    async fn ingest_one(&self, url: &str) -> Result<Document, FetchError> {
        let outcome = match timeout(self.item_timeout, self.fetcher.fetch(url)).await {
            Ok(Ok(fields)) if fields.body_text.trim().is_empty() => {
                Err(FetchError::parse_failure("article body is empty"))
            }
            Ok(Ok(fields)) => Ok(Document::new(url, fields)),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(FetchError::network(format!(
                "timed out after {:?}",
                self.item_timeout
            ))),
        };

        match &outcome {
            Ok(document) => debug!(%url, title = %document.title(), "Ingested article"),
            Err(e) => warn!(%url, kind = %e.kind, error = %e, "Article failed; continuing with batch"),
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FetchErrorKind;
    use crate::models::ArticleFields;
    use std::collections::{HashMap, HashSet};

    /// Serves canned outcomes per URL after a per-URL delay.
    #[derive(Default)]
    struct FakeFetcher {
        outcomes: HashMap<String, (u64, Result<ArticleFields, FetchError>)>,
    }

    impl FakeFetcher {
        fn ok(mut self, url: &str, delay_ms: u64, body: &str) -> Self {
            let fields = ArticleFields {
                title: format!("Title of {url}"),
                body_text: body.to_string(),
                ..ArticleFields::default()
            };
            self.outcomes.insert(url.to_string(), (delay_ms, Ok(fields)));
            self
        }

        fn err(mut self, url: &str, delay_ms: u64, error: FetchError) -> Self {
            self.outcomes.insert(url.to_string(), (delay_ms, Err(error)));
            self
        }
    }

    impl DocumentFetcher for FakeFetcher {
        async fn fetch(&self, url: &str) -> Result<ArticleFields, FetchError> {
            let (delay, outcome) = self
                .outcomes
                .get(url)
                .cloned()
                .unwrap_or((0, Err(FetchError::network("unknown host"))));
            tokio::time::sleep(Duration::from_millis(delay)).await;
            outcome
        }
    }

    fn urls(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("https://www.cnn.com/2024/{i}")).collect()
    }

    #[tokio::test]
    async fn test_partition_covers_every_input_exactly_once() {
        let links = urls(6);
        let mut fetcher = FakeFetcher::default();
        for (i, url) in links.iter().enumerate() {
            fetcher = if i % 3 == 0 {
                fetcher.err(url, 5, FetchError::http_status(500, "boom"))
            } else {
                fetcher.ok(url, 5, "some body text")
            };
        }

        let result = IngestionPipeline::new(fetcher).ingest(&links).await;
        assert_eq!(result.succeeded.len() + result.failed.len(), links.len());

        let mut seen = HashSet::new();
        for url in result
            .succeeded
            .iter()
            .map(|d| d.url().to_string())
            .chain(result.failed.iter().map(|f| f.url.clone()))
        {
            assert!(seen.insert(url));
        }
        assert_eq!(seen, links.iter().cloned().collect());
        assert_eq!(result.failed.len(), 2);
    }

    #[tokio::test]
    async fn test_preserves_input_order_despite_completion_order() {
        let links = urls(4);
        let fetcher = FakeFetcher::default()
            .ok(&links[0], 60, "first")
            .ok(&links[1], 1, "second")
            .err(&links[2], 40, FetchError::network("reset"))
            .ok(&links[3], 10, "fourth");

        let result = IngestionPipeline::new(fetcher)
            .with_concurrency(4)
            .ingest(&links)
            .await;

        let bodies: Vec<&str> = result.succeeded.iter().map(|d| d.body_text()).collect();
        assert_eq!(bodies, vec!["first", "second", "fourth"]);
        assert_eq!(result.failed[0].url, links[2]);
    }

    #[tokio::test]
    async fn test_empty_body_is_classified_as_parse_failure() {
        let links = urls(1);
        let fetcher = FakeFetcher::default().ok(&links[0], 0, "   \n ");
        let result = IngestionPipeline::new(fetcher).ingest(&links).await;
        assert!(result.succeeded.is_empty());
        assert_eq!(result.failed[0].reason.kind, FetchErrorKind::ParseFailure);
    }

    #[tokio::test]
    async fn test_slow_fetch_times_out_without_blocking_others() {
        let links = urls(2);
        let fetcher = FakeFetcher::default()
            .ok(&links[0], 5_000, "slow")
            .ok(&links[1], 0, "fast");

        let result = IngestionPipeline::new(fetcher)
            .with_item_timeout(Duration::from_millis(50))
            .ingest(&links)
            .await;

        assert_eq!(result.succeeded.len(), 1);
        assert_eq!(result.succeeded[0].body_text(), "fast");
        assert_eq!(result.failed[0].url, links[0]);
        assert_eq!(result.failed[0].reason.kind, FetchErrorKind::Network);
    }

    #[tokio::test]
    async fn test_all_failures_still_complete() {
        let links = urls(3);
        let result = IngestionPipeline::new(FakeFetcher::default())
            .with_concurrency(1)
            .ingest(&links)
            .await;
        assert!(result.succeeded.is_empty());
        assert_eq!(result.failed.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let result = IngestionPipeline::new(FakeFetcher::default()).ingest(&[]).await;
        assert_eq!(result.total(), 0);
    }
}
