//! Vocabulary construction and bag-of-words encoding.
//!
//! Term ids are assigned in first-occurrence order, scanning documents in input
//! order and tokens in text order. The same token sequences therefore always
//! produce the same [`Vocabulary`] and the same encodings.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{info, instrument};

use crate::text::TokenSequence;

/// Bijective term ↔ id mapping. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Vocabulary {
    #[serde(skip)]
    ids: HashMap<String, u32>,
    terms: Vec<String>,
}

impl Vocabulary {
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn id(&self, term: &str) -> Option<u32> {
        self.ids.get(term).copied()
    }

    pub fn term(&self, id: u32) -> Option<&str> {
        self.terms.get(id as usize).map(String::as_str)
    }

    /// Terms indexed by id.
    pub fn terms(&self) -> &[String] {
        &self.terms
    }
}

/// Growing vocabulary used while the corpus is being scanned.
#[derive(Debug, Default)]
pub struct VocabularyBuilder {
    vocabulary: Vocabulary,
}

impl VocabularyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id for `term`, assigning the next free id on first sight.
    pub fn intern(&mut self, term: &str) -> u32 {
        if let Some(id) = self.vocabulary.id(term) {
            return id;
        }
        let id = self.vocabulary.terms.len() as u32;
        self.vocabulary.terms.push(term.to_string());
        self.vocabulary.ids.insert(term.to_string(), id);
        id
    }

    /// Stop growing and hand out the finished vocabulary.
    pub fn freeze(self) -> Vocabulary {
        self.vocabulary
    }
}

/// Sparse term counts for one document. Zero counts are never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EncodedDocument {
    counts: BTreeMap<u32, u32>,
}

impl EncodedDocument {
    #[cfg(test)]
    pub fn from_counts(counts: impl IntoIterator<Item = (u32, u32)>) -> Self {
        let mut doc = Self::default();
        for (id, count) in counts {
            doc.add(id, count);
        }
        doc
    }

    fn add(&mut self, id: u32, count: u32) {
        if count > 0 {
            *self.counts.entry(id).or_insert(0) += count;
        }
    }

    /// `(term id, count)` pairs in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.counts.iter().map(|(&id, &count)| (id, count))
    }

    pub fn count(&self, id: u32) -> u32 {
        self.counts.get(&id).copied().unwrap_or(0)
    }

    /// Number of distinct terms.
    pub fn distinct_terms(&self) -> usize {
        self.counts.len()
    }

    /// Total number of tokens.
    pub fn total(&self) -> u64 {
        self.counts.values().map(|&c| u64::from(c)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// Builds a vocabulary and encodes every document against it.
#[derive(Debug, Default, Clone, Copy)]
pub struct CorpusBuilder;

impl CorpusBuilder {
    /// Encode `sequences`, one [`EncodedDocument`] per input at the same index.
    ///
    /// Documents without tokens keep their slot with an empty encoding.
    #[instrument(level = "info", skip_all, fields(documents = sequences.len()))]
    pub fn build(sequences: &[TokenSequence]) -> (Vocabulary, Vec<EncodedDocument>) {
        let mut builder = VocabularyBuilder::new();
        let documents: Vec<EncodedDocument> = sequences
            .iter()
            .map(|tokens| {
                let mut doc = EncodedDocument::default();
                for token in tokens {
                    doc.add(builder.intern(token), 1);
                }
                doc
            })
            .collect();

        let vocabulary = builder.freeze();
        info!(
            documents = documents.len(),
            vocabulary = vocabulary.len(),
            empty_documents = documents.iter().filter(|d| d.is_empty()).count(),
            "Built corpus"
        );
        (vocabulary, documents)
    }
}

/// Corpus-wide count of each term, indexed by term id.
pub fn term_frequencies(vocabulary_size: usize, documents: &[EncodedDocument]) -> Vec<u64> {
    let mut freqs = vec![0u64; vocabulary_size];
    for (id, count) in documents.iter().flat_map(EncodedDocument::iter) {
        if let Some(slot) = freqs.get_mut(id as usize) {
            *slot += u64::from(count);
        }
    }
    freqs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seqs(docs: &[&[&str]]) -> Vec<TokenSequence> {
        docs.iter()
            .map(|d| d.iter().map(|t| t.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_first_occurrence_ids() {
        let input = seqs(&[&["storm", "rain", "storm"], &["vote", "rain"]]);
        let (vocab, docs) = CorpusBuilder::build(&input);

        assert_eq!(vocab.terms(), ["storm", "rain", "vote"]);
        assert_eq!(vocab.id("rain"), Some(1));
        assert_eq!(vocab.term(2), Some("vote"));
        assert_eq!(vocab.id("absent"), None);

        assert_eq!(docs[0].count(0), 2);
        assert_eq!(docs[0].count(1), 1);
        assert_eq!(docs[0].count(2), 0);
        assert_eq!(docs[0].total(), 3);
        assert_eq!(docs[1].iter().collect::<Vec<_>>(), vec![(1, 1), (2, 1)]);
    }

    #[test]
    fn test_deterministic_across_runs() {
        let input = seqs(&[&["b", "a", "c"], &[], &["c", "d", "a", "a"]]);
        let first = CorpusBuilder::build(&input);
        let second = CorpusBuilder::build(&input);
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_documents_keep_their_index() {
        let input = seqs(&[&[], &["x"], &[]]);
        let (vocab, docs) = CorpusBuilder::build(&input);
        assert_eq!(docs.len(), 3);
        assert!(docs[0].is_empty());
        assert_eq!(docs[1].count(0), 1);
        assert!(docs[2].is_empty());
        assert_eq!(vocab.len(), 1);
    }

    #[test]
    fn test_empty_corpus() {
        let (vocab, docs) = CorpusBuilder::build(&[]);
        assert_eq!(vocab.len(), 0);
        assert!(docs.is_empty());
    }

    #[test]
    fn test_from_counts_drops_zeroes() {
        let doc = EncodedDocument::from_counts([(3, 0), (1, 2), (1, 1)]);
        assert_eq!(doc.distinct_terms(), 1);
        assert_eq!(doc.count(1), 3);
    }

    #[test]
    fn test_term_frequencies() {
        let input = seqs(&[&["a", "b", "a"], &["b", "c"]]);
        let (vocab, docs) = CorpusBuilder::build(&input);
        assert_eq!(term_frequencies(vocab.len(), &docs), vec![2, 2, 1]);
    }
}
