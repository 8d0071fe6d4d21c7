//! Model summary export.
//!
//! Flattens a trained [`TopicModel`] and its corpus into a [`ModelSummary`] that a
//! visualization front end can render on its own: top terms per topic, the
//! dominant topic of each article, topic prevalence, corpus term frequencies, and
//! both raw distributions. Export only reads the model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::corpus::{EncodedDocument, Vocabulary, term_frequencies};
use crate::models::Document;
use crate::topics::TopicModel;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedTerm {
    pub term: String,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicSummary {
    pub id: usize,
    /// Share of all corpus tokens attributed to this topic.
    pub prevalence: f64,
    pub top_terms: Vec<WeightedTerm>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub index: usize,
    pub url: Option<String>,
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub publish_date: Option<DateTime<Utc>>,
    /// Token count after preprocessing.
    pub length: u64,
    /// `None` for documents without tokens, whose topic row is uniform.
    pub dominant_topic: Option<usize>,
    pub dominant_weight: f64,
}

/// Everything a renderer needs, in a transport-neutral shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub num_topics: usize,
    /// Terms indexed by id; the column order of `topic_word_distribution`.
    pub vocabulary: Vec<String>,
    /// Corpus-wide count per term id.
    pub term_frequency: Vec<u64>,
    pub topics: Vec<TopicSummary>,
    pub documents: Vec<DocumentSummary>,
    pub topic_word_distribution: Vec<Vec<f64>>,
    pub document_topic_distribution: Vec<Vec<f64>>,
}

/// Builds [`ModelSummary`] values.
#[derive(Debug, Clone, Copy)]
pub struct ModelSummaryExporter {
    top_n: usize,
}

impl Default for ModelSummaryExporter {
    fn default() -> Self {
        Self { top_n: 10 }
    }
}

impl ModelSummaryExporter {
    /// List `top_n` terms per topic.
    pub fn new(top_n: usize) -> Self {
        Self { top_n }
    }

    /// Summarize `model` trained on `corpus`.
    ///
    /// `documents` supplies article metadata by index and may be empty (or shorter
    /// than the corpus) when that metadata is not available.
    #[instrument(level = "info", skip_all, fields(topics = model.num_topics(), top_n = self.top_n))]
    pub fn export(
        &self,
        vocabulary: &Vocabulary,
        corpus: &[EncodedDocument],
        model: &TopicModel,
        documents: &[Document],
    ) -> ModelSummary {
        let lengths: Vec<u64> = corpus.iter().map(EncodedDocument::total).collect();
        let prevalence = topic_prevalence(model, &lengths);

        let topics: Vec<TopicSummary> = (0..model.num_topics())
            .map(|id| TopicSummary {
                id,
                prevalence: prevalence[id],
                top_terms: model
                    .top_terms(id, self.top_n)
                    .into_iter()
                    .map(|(term_id, weight)| WeightedTerm {
                        term: vocabulary.term(term_id).unwrap_or_default().to_string(),
                        weight,
                    })
                    .collect(),
            })
            .collect();

        let documents: Vec<DocumentSummary> = lengths
            .iter()
            .enumerate()
            .map(|(index, &length)| {
                let dominant = model.dominant_topic(index).filter(|_| length > 0);
                let meta = documents.get(index);
                DocumentSummary {
                    index,
                    url: meta.map(|d| d.url().to_string()),
                    title: meta.map(|d| d.title().to_string()),
                    authors: meta.map(|d| d.authors().to_vec()).unwrap_or_default(),
                    publish_date: meta.and_then(Document::publish_date),
                    length,
                    dominant_topic: dominant.map(|(topic, _)| topic),
                    dominant_weight: dominant.map(|(_, weight)| weight).unwrap_or(0.0),
                }
            })
            .collect();

        info!(
            topics = topics.len(),
            documents = documents.len(),
            "Exported model summary"
        );

        ModelSummary {
            num_topics: model.num_topics(),
            vocabulary: vocabulary.terms().to_vec(),
            term_frequency: term_frequencies(model.vocabulary_size(), corpus),
            topics,
            documents,
            topic_word_distribution: model.topic_word_distribution().to_vec(),
            document_topic_distribution: model.document_topic_distribution().to_vec(),
        }
    }
}

/// Token-weighted average of the document-topic rows.
fn topic_prevalence(model: &TopicModel, lengths: &[u64]) -> Vec<f64> {
    let k = model.num_topics();
    let total: u64 = lengths.iter().sum();
    if total == 0 {
        return vec![1.0 / k as f64; k];
    }
    let mut prevalence = vec![0.0; k];
    for (row, &length) in model.document_topic_distribution().iter().zip(lengths) {
        for (p, w) in prevalence.iter_mut().zip(row) {
            *p += w * length as f64;
        }
    }
    for p in &mut prevalence {
        *p /= total as f64;
    }
    prevalence
}
