//! Spoken narration of ingested articles.
//!
//! Narration is a side output: each document's body is synthesized into
//! `article_{n}.mp3` (1-based, in ingestion order) and failures are recorded per
//! document without affecting the rest of the batch or the topic model.

use futures::stream::{self, StreamExt};
use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::errors::AudioError;
use crate::models::Document;
use crate::text::Language;

/// Text-to-speech capability.
pub trait AudioSynthesizer {
    /// Synthesize `text` into audio bytes destined for `target`.
    async fn synthesize(&self, text: &str, target: &str) -> Result<Vec<u8>, AudioError>;
}

/// Speech endpoint answering `GET {endpoint}?tl={lang}&q={text}` with MP3 bytes.
///
/// Long texts are split on whitespace into chunks of at most `max_chunk_chars`
/// characters; the returned MP3 frames are concatenated in order.
#[derive(Debug, Clone)]
pub struct HttpSpeechSynthesizer {
    client: Client,
    endpoint: Url,
    language: Language,
    max_chunk_chars: usize,
}

impl HttpSpeechSynthesizer {
    pub fn new(client: Client, endpoint: &str, language: Language) -> Result<Self, url::ParseError> {
        Ok(Self {
            client,
            endpoint: Url::parse(endpoint)?,
            language,
            max_chunk_chars: 200,
        })
    }

    pub fn with_max_chunk_chars(mut self, max_chunk_chars: usize) -> Self {
        self.max_chunk_chars = max_chunk_chars.max(1);
        self
    }

    async fn synthesize_chunk(&self, chunk: &str) -> Result<Vec<u8>, AudioError> {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("tl", self.language.code())
            .append_pair("q", chunk);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AudioError::Synthesis(e.to_string()))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| AudioError::Synthesis(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

impl AudioSynthesizer for HttpSpeechSynthesizer {
    #[instrument(level = "debug", skip(self, text), fields(chars = text.chars().count()))]
    async fn synthesize(&self, text: &str, target: &str) -> Result<Vec<u8>, AudioError> {
        let chunks = chunk_text(text, self.max_chunk_chars);
        if chunks.is_empty() {
            return Err(AudioError::EmptyText);
        }
        let mut audio = Vec::new();
        for chunk in &chunks {
            audio.extend(self.synthesize_chunk(chunk).await?);
        }
        debug!(chunks = chunks.len(), bytes = audio.len(), "Synthesized speech");
        Ok(audio)
    }
}

/// Greedily pack whitespace-separated words into chunks of at most `max_chars`.
///
/// A single word longer than `max_chars` becomes its own chunk.
fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0;
    for word in text.split_whitespace() {
        let word_chars = word.chars().count();
        if current_chars > 0 && current_chars + 1 + word_chars > max_chars {
            chunks.push(std::mem::take(&mut current));
            current_chars = 0;
        }
        if current_chars > 0 {
            current.push(' ');
            current_chars += 1;
        }
        current.push_str(word);
        current_chars += word_chars;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NarratedDocument {
    /// Index into the narrated document slice.
    pub index: usize,
    pub url: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedNarration {
    pub index: usize,
    pub url: String,
    pub reason: AudioError,
}

/// Outcome of a narration batch. Every document lands in exactly one list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NarrationReport {
    pub written: Vec<NarratedDocument>,
    pub failed: Vec<FailedNarration>,
}

/// File name for the document at `index`.
pub fn narration_target(index: usize) -> String {
    format!("article_{}.mp3", index + 1)
}

/// Narrate every document into `output_dir`, at most `concurrency` at a time.
#[instrument(level = "info", skip_all, fields(documents = documents.len(), output_dir = %output_dir.display()))]
pub async fn narrate_documents<S>(
    documents: &[Document],
    synthesizer: &S,
    output_dir: &Path,
    concurrency: usize,
) -> NarrationReport
where
    S: AudioSynthesizer,
{
    let mut report = NarrationReport::default();

    if let Err(e) = fs::create_dir_all(output_dir).await {
        warn!(error = %e, "Failed to create narration directory");
        let reason = AudioError::Write {
            path: output_dir.display().to_string(),
            detail: e.to_string(),
        };
        report.failed = documents
            .iter()
            .enumerate()
            .map(|(index, doc)| FailedNarration {
                index,
                url: doc.url().to_string(),
                reason: reason.clone(),
            })
            .collect();
        return report;
    }

    let mut outcomes: Vec<(usize, Result<PathBuf, AudioError>)> =
        stream::iter(documents.iter().enumerate())
            .map(|(index, doc)| async move {
                (index, narrate_one(doc, index, synthesizer, output_dir).await)
            })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;
    outcomes.sort_by_key(|(index, _)| *index);

    for (index, outcome) in outcomes {
        let url = documents[index].url().to_string();
        match outcome {
            Ok(path) => report.written.push(NarratedDocument { index, url, path }),
            Err(reason) => {
                warn!(index, %url, error = %reason, "Narration failed; continuing with batch");
                report.failed.push(FailedNarration { index, url, reason });
            }
        }
    }

    info!(
        written = report.written.len(),
        failed = report.failed.len(),
        "Completed narration"
    );
    report
}

async fn narrate_one<S>(
    doc: &Document,
    index: usize,
    synthesizer: &S,
    output_dir: &Path,
) -> Result<PathBuf, AudioError>
where
    S: AudioSynthesizer,
{
    if doc.body_text().trim().is_empty() {
        return Err(AudioError::EmptyText);
    }
    let target = narration_target(index);
    let audio = synthesizer.synthesize(doc.body_text(), &target).await?;

    let path = output_dir.join(&target);
    fs::write(&path, audio)
        .await
        .map_err(|e| AudioError::Write {
            path: path.display().to_string(),
            detail: e.to_string(),
        })?;
    debug!(path = %path.display(), "Wrote narration");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ArticleFields;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Echoes the target name as audio, failing for texts containing "fail".
    struct FakeSynthesizer;

    impl AudioSynthesizer for FakeSynthesizer {
        async fn synthesize(&self, text: &str, target: &str) -> Result<Vec<u8>, AudioError> {
            if text.contains("fail") {
                return Err(AudioError::Synthesis("engine refused".to_string()));
            }
            Ok(target.as_bytes().to_vec())
        }
    }

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

    #[test]
    fn test_narration_target_is_one_based() {
        assert_eq!(narration_target(0), "article_1.mp3");
        assert_eq!(narration_target(9), "article_10.mp3");
    }

    #[test]
    fn test_chunk_text() {
        assert_eq!(chunk_text("one two three four", 9), vec!["one two", "three", "four"]);
        assert_eq!(chunk_text("  ", 10), Vec::<String>::new());
        assert_eq!(chunk_text("extraordinarily long", 5), vec!["extraordinarily", "long"]);
    }

    #[tokio::test]
    async fn test_narrate_isolates_failures() {
        let dir = tempfile::tempdir().unwrap();
        let docs = vec![
            doc("https://a", "storm warning"),
            doc("https://b", "this will fail"),
            doc("https://c", "budget vote"),
        ];

        let report = narrate_documents(&docs, &FakeSynthesizer, dir.path(), 2).await;

        assert_eq!(report.written.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].index, 1);
        assert_eq!(report.failed[0].url, "https://b");
        assert_eq!(report.written[0].index, 0);
        assert_eq!(report.written[1].index, 2);

        let third = std::fs::read(dir.path().join("article_3.mp3")).unwrap();
        assert_eq!(third, b"article_3.mp3");
        assert!(!dir.path().join("article_2.mp3").exists());
    }

    #[tokio::test]
    async fn test_narrate_empty_body_fails_without_calling_engine() {
        let dir = tempfile::tempdir().unwrap();
        let docs = vec![doc("https://a", "   ")];
        let report = narrate_documents(&docs, &FakeSynthesizer, dir.path(), 1).await;
        assert!(report.written.is_empty());
        assert_eq!(report.failed[0].reason, AudioError::EmptyText);
    }

    #[tokio::test]
    async fn test_narrate_unwritable_dir_fails_every_document() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a dir").unwrap();

        let docs = vec![doc("https://a", "one"), doc("https://b", "two")];
        let report = narrate_documents(&docs, &FakeSynthesizer, &blocker, 2).await;
        assert!(report.written.is_empty());
        assert_eq!(report.failed.len(), 2);
        assert!(matches!(report.failed[0].reason, AudioError::Write { .. }));
    }

    #[tokio::test]
    async fn test_http_synthesizer_concatenates_chunks() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tts"))
            .and(query_param("tl", "en"))
            .and(query_param("q", "storm warning"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"AAA".to_vec()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/tts"))
            .and(query_param("q", "tonight"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"BB".to_vec()))
            .mount(&server)
            .await;

        let synth =
            HttpSpeechSynthesizer::new(Client::new(), &format!("{}/tts", server.uri()), Language::English)
                .unwrap()
                .with_max_chunk_chars(13);
        let audio = synth
            .synthesize("storm warning tonight", "article_1.mp3")
            .await
            .unwrap();
        assert_eq!(audio, b"AAABB");
    }

    #[tokio::test]
    async fn test_http_synthesizer_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tts"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let synth =
            HttpSpeechSynthesizer::new(Client::new(), &format!("{}/tts", server.uri()), Language::English)
                .unwrap();
        let err = synth.synthesize("hello", "article_1.mp3").await.unwrap_err();
        assert!(matches!(err, AudioError::Synthesis(_)));
        assert_eq!(
            synth.synthesize("", "article_1.mp3").await.unwrap_err(),
            AudioError::EmptyText
        );
    }
}
