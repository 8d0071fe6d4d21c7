//! Preprocess → corpus → model → summary over a batch of ingested documents.

use tracing::{error, info, instrument, warn};

use crate::config::AppConfig;
use crate::corpus::{CorpusBuilder, EncodedDocument, Vocabulary};
use crate::errors::AnalysisError;
use crate::models::Document;
use crate::outputs::json::VisualizationRenderer;
use crate::outputs::summary::{ModelSummary, ModelSummaryExporter};
use crate::text::TextPreprocessor;
use crate::topics::{TopicModel, TrainingReport};

/// Every intermediate of one analysis run. `corpus[i]` and the model's document
/// rows correspond to the `i`-th input document.
#[derive(Debug, Clone)]
pub struct TopicAnalysis {
    pub vocabulary: Vocabulary,
    pub corpus: Vec<EncodedDocument>,
    pub model: TopicModel,
    pub report: TrainingReport,
    pub summary: ModelSummary,
}

/// Fit a topic model to `documents` and summarize it.
///
/// Returns [`AnalysisError::NoDocumentsIngested`] without touching the model when
/// there is nothing to analyze.
#[instrument(level = "info", skip_all, fields(documents = documents.len(), topics = config.model.num_topics))]
pub fn analyze(documents: &[Document], config: &AppConfig) -> Result<TopicAnalysis, AnalysisError> {
    if documents.is_empty() {
        warn!("No documents ingested; skipping topic modeling");
        return Err(AnalysisError::NoDocumentsIngested);
    }

    let preprocessor = TextPreprocessor::new(config.text.language);
    let bodies: Vec<&str> = documents.iter().map(Document::body_text).collect();
    let sequences = preprocessor.preprocess_all(&bodies);

    let (vocabulary, corpus) = CorpusBuilder::build(&sequences);
    let (model, report) = TopicModel::train(&corpus, vocabulary.len(), &config.model)?;
    let summary = ModelSummaryExporter::new(config.summary.top_terms).export(
        &vocabulary,
        &corpus,
        &model,
        documents,
    );

    info!(
        vocabulary = vocabulary.len(),
        iterations = report.iterations,
        converged = report.converged,
        perplexity = report.perplexity,
        "Topic analysis complete"
    );

    Ok(TopicAnalysis {
        vocabulary,
        corpus,
        model,
        report,
        summary,
    })
}

/// Analyze `documents` and hand the summary to `renderer`.
///
/// Missing data (no documents, or no terms left after preprocessing) is logged and
/// yields `Ok(None)` without rendering. Bad parameters and render failures are
/// returned as errors.
pub async fn analyze_and_render<R>(
    documents: &[Document],
    config: &AppConfig,
    renderer: &R,
) -> Result<Option<TopicAnalysis>, AnalysisError>
where
    R: VisualizationRenderer,
{
    let analysis = match analyze(documents, config) {
        Ok(analysis) => analysis,
        Err(e) if e.is_missing_data() => {
            warn!(error = %e, "Nothing to model; skipping summary output");
            return Ok(None);
        }
        Err(e) => {
            error!(error = %e, "Topic modeling failed");
            return Err(e);
        }
    };

    if let Err(e) = renderer.render(&analysis.summary).await {
        error!(error = %e, "Failed to render topic summary");
        return Err(e.into());
    }
    Ok(Some(analysis))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{FetchError, FetchErrorKind, InvalidConfiguration, RenderError};
    use crate::ingest::IngestionPipeline;
    use crate::models::{ArticleFields, RawPage};
    use crate::scrapers::fetcher::DocumentFetcher;
    use crate::scrapers::links::{LinkExtractor, RecencyFilter};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn doc(url: &str, body: &str) -> Document {
        Document::new(
            url,
            ArticleFields {
                title: url.to_string(),
                body_text: body.to_string(),
                ..ArticleFields::default()
            },
        )
    }

    fn config(topics: usize) -> AppConfig {
        let mut config = AppConfig::default();
        config.model.num_topics = topics;
        config
    }

    #[test]
    fn test_no_documents_skips_modeling() {
        let err = analyze(&[], &AppConfig::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::NoDocumentsIngested));
    }

    #[test]
    fn test_stopword_only_corpus_is_missing_data() {
        let docs = vec![doc("https://www.cnn.com/2024/a", "The and of it was")];
        match analyze(&docs, &config(2)).unwrap_err() {
            AnalysisError::Model(e) => assert!(e.is_missing_data()),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_too_many_topics_is_bad_parameters() {
        let docs = vec![doc("https://www.cnn.com/2024/a", "storm rain")];
        match analyze(&docs, &config(5)).unwrap_err() {
            AnalysisError::Model(e) => {
                assert_eq!(
                    e,
                    InvalidConfiguration::TooManyTopics {
                        topics: 5,
                        vocabulary: 2
                    }
                );
                assert!(!e.is_missing_data());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_analysis_aligns_with_input() {
        let docs = vec![
            doc("https://www.cnn.com/2024/a", "Senate budget vote passes senate"),
            doc("https://www.cnn.com/2024/b", "Storm floods coastal towns, storm surge"),
            doc("https://www.cnn.com/2024/c", "Senate storm"),
        ];
        let analysis = analyze(&docs, &config(2)).unwrap();

        assert_eq!(analysis.corpus.len(), 3);
        assert_eq!(analysis.model.num_documents(), 3);
        assert_eq!(analysis.summary.documents.len(), 3);
        assert_eq!(
            analysis.summary.documents[1].url.as_deref(),
            Some("https://www.cnn.com/2024/b")
        );
        assert_eq!(analysis.vocabulary.id("senate"), Some(0));
        assert!(analysis.report.iterations >= 1);
    }

    /// Counts renders, failing each one when `fail` is set.
    #[derive(Default)]
    struct CountingRenderer {
        renders: AtomicUsize,
        fail: bool,
    }

    impl VisualizationRenderer for CountingRenderer {
        async fn render(&self, _summary: &ModelSummary) -> Result<(), RenderError> {
            self.renders.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(RenderError::Io {
                    path: "/read-only/topics.json".to_string(),
                    source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
                });
            }
            Ok(())
        }
    }

    impl CountingRenderer {
        fn renders(&self) -> usize {
            self.renders.load(Ordering::SeqCst)
        }
    }

    #[tokio::test]
    async fn test_render_receives_summary() {
        let docs = vec![doc("https://www.cnn.com/2024/a", "Senate budget vote passes")];
        let renderer = CountingRenderer::default();
        let analysis = analyze_and_render(&docs, &config(2), &renderer)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(analysis.summary.documents.len(), 1);
        assert_eq!(renderer.renders(), 1);
    }

    #[tokio::test]
    async fn test_missing_data_skips_render_without_error() {
        let renderer = CountingRenderer::default();
        assert!(analyze_and_render(&[], &config(2), &renderer).await.unwrap().is_none());

        let docs = vec![doc("https://www.cnn.com/2024/a", "The and of it was")];
        assert!(analyze_and_render(&docs, &config(2), &renderer).await.unwrap().is_none());
        assert_eq!(renderer.renders(), 0);
    }

    #[tokio::test]
    async fn test_bad_parameters_are_errors() {
        let docs = vec![doc("https://www.cnn.com/2024/a", "storm rain")];
        let renderer = CountingRenderer::default();
        let err = analyze_and_render(&docs, &config(5), &renderer)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Model(_)));
        assert!(!err.is_missing_data());
        assert_eq!(renderer.renders(), 0);
    }

    #[tokio::test]
    async fn test_render_failure_is_propagated() {
        let docs = vec![doc("https://www.cnn.com/2024/a", "Senate budget vote passes")];
        let renderer = CountingRenderer {
            fail: true,
            ..CountingRenderer::default()
        };
        let err = analyze_and_render(&docs, &config(2), &renderer)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Render(RenderError::Io { .. })));
        assert!(!err.is_missing_data());
        assert_eq!(renderer.renders(), 1);
    }

    struct FailingOn(&'static str);

    impl DocumentFetcher for FailingOn {
        async fn fetch(&self, url: &str) -> Result<ArticleFields, FetchError> {
            if url.ends_with(self.0) {
                return Err(FetchError::http_status(500, "Internal Server Error"));
            }
            Ok(ArticleFields {
                title: "Senate passes budget".to_string(),
                body_text: "The Senate passed the budget after an overnight vote on Tuesday."
                    .to_string(),
                ..ArticleFields::default()
            })
        }
    }

    #[tokio::test]
    async fn test_front_page_to_topics() {
        let page = RawPage {
            source_url: "https://www.cnn.com".to_string(),
            html_content: r#"<html><body>
                <a href="/2024/a">A</a>
                <a href="/2024/b">B</a>
                <a href="https://other.com/2024/c">C</a>
                <a href="/2023/d">D</a>
            </body></html>"#
                .to_string(),
        };
        let extractor = LinkExtractor::new("https://www.cnn.com", RecencyFilter::default()).unwrap();
        let links = extractor.extract_page(&page);
        assert_eq!(
            links,
            vec!["https://www.cnn.com/2024/a", "https://www.cnn.com/2024/b"]
        );

        let result = IngestionPipeline::new(FailingOn("/2024/b"))
            .ingest(&links)
            .await;
        assert_eq!(result.succeeded.len(), 1);
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.failed[0].url, "https://www.cnn.com/2024/b");
        assert_eq!(result.failed[0].reason.kind, FetchErrorKind::HttpStatus(500));

        let documents = result.into_documents();
        let analysis = analyze(&documents, &config(2)).unwrap();
        let rows = analysis.model.document_topic_distribution();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), 2);
        assert!((rows[0].iter().sum::<f64>() - 1.0).abs() < 1e-6);
    }
}
