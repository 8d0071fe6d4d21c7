//! Topic inference over a bag-of-words corpus.
//!
//! The model is a probabilistic latent semantic model with Dirichlet smoothing:
//! each document is a mixture over `K` topics (`θ`, one row per document) and each
//! topic is a distribution over the vocabulary (`φ`, one row per topic). Training
//! runs expectation–maximization:
//!
//! - **E-step**: for every `(document, term)` pair, split the term's count across
//!   topics in proportion to `θ[d][k] · φ[k][w]`. Documents are independent, so this
//!   runs in parallel; the per-document expected counts are then summed in document
//!   order, which keeps results identical regardless of thread scheduling.
//! - **M-step**: `θ[d] ∝ n[d] + α` and `φ[k] ∝ n[k] + β`.
//!
//! Training stops when the iteration budget runs out or when the relative
//! log-likelihood change of a pass drops below the configured tolerance.
//!
//! # Initialization
//!
//! `θ` starts uniform. Each `φ` row starts as uniform noise drawn from a seeded
//! [`StdRng`], plus the normalized term counts of a "seed document". Seed
//! documents are picked farthest-first: the first at random among non-empty
//! documents, each next one as the document least similar (cosine) to the seeds
//! already chosen. Topics beyond the number of non-empty documents keep pure
//! noise. Topic numbering carries no meaning across seeds.
//!
//! A document without tokens keeps a uniform `θ` row: with no counts the update
//! reduces to `α / Kα`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::config::ModelConfig;
use crate::corpus::EncodedDocument;
use crate::errors::InvalidConfiguration;
use crate::utils::normalize_or_uniform;

/// How a training run went.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingReport {
    /// EM passes actually run.
    pub iterations: usize,
    /// True if training stopped on the tolerance rather than the budget.
    pub converged: bool,
    /// Log-likelihood of the corpus under the final parameters.
    pub log_likelihood: f64,
    /// `exp(-log_likelihood / tokens)`.
    pub perplexity: f64,
    /// Log-likelihood entering each pass.
    pub log_likelihood_trace: Vec<f64>,
    /// Distribution rows that had to be reset to uniform.
    pub unstable_rows: usize,
}

/// A trained topic model. Read-only once [`TopicModel::train`] returns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicModel {
    num_topics: usize,
    vocabulary_size: usize,
    /// `K × V`, each row sums to 1.
    topic_word: Vec<Vec<f64>>,
    /// `D × K`, each row sums to 1.
    document_topic: Vec<Vec<f64>>,
}

/// Expected counts contributed by one document during an E-step.
struct DocumentExpectation {
    topic_counts: Vec<f64>,
    term_counts: Vec<(u32, Vec<f64>)>,
    log_likelihood: f64,
    unstable: usize,
}

impl TopicModel {
    /// Fit a model to `documents` over a vocabulary of `vocabulary_size` terms.
    ///
    /// # Errors
    ///
    /// [`InvalidConfiguration`] when the parameters are unusable (zero topics, zero
    /// iterations, non-positive priors, more topics than terms) or when there is
    /// nothing to learn from (no documents, no terms).
    #[instrument(
        level = "info",
        skip_all,
        fields(documents = documents.len(), vocabulary_size = vocabulary_size, topics = config.num_topics)
    )]
    pub fn train(
        documents: &[EncodedDocument],
        vocabulary_size: usize,
        config: &ModelConfig,
    ) -> Result<(Self, TrainingReport), InvalidConfiguration> {
        validate(documents, vocabulary_size, config)?;

        let mut model = Self::initialize(documents, vocabulary_size, config);
        let mut trace = Vec::with_capacity(config.max_iterations);
        let mut unstable_rows = 0usize;
        let mut converged = false;

        for iteration in 1..=config.max_iterations {
            let expectations: Vec<DocumentExpectation> = documents
                .par_iter()
                .zip(model.document_topic.par_iter())
                .map(|(doc, theta)| expect_document(doc, theta, &model.topic_word))
                .collect();

            let log_likelihood: f64 = expectations.iter().map(|e| e.log_likelihood).sum();
            unstable_rows += expectations.iter().map(|e| e.unstable).sum::<usize>();
            unstable_rows += model.maximize(expectations, config.alpha, config.beta);

            let previous = trace.last().copied();
            trace.push(log_likelihood);
            debug!(iteration, log_likelihood, "Completed EM pass");

            if let (Some(tolerance), Some(previous)) = (config.tolerance, previous) {
                let change = (log_likelihood - previous).abs() / previous.abs().max(f64::EPSILON);
                if change < tolerance {
                    converged = true;
                    break;
                }
            }
        }

        if unstable_rows > 0 {
            warn!(
                unstable_rows,
                "Distribution rows failed to normalize and fell back to uniform"
            );
        }

        let log_likelihood = model.log_likelihood(documents);
        let tokens: u64 = documents.iter().map(EncodedDocument::total).sum();
        let perplexity = (-log_likelihood / tokens as f64).exp();
        let report = TrainingReport {
            iterations: trace.len(),
            converged,
            log_likelihood,
            perplexity,
            log_likelihood_trace: trace,
            unstable_rows,
        };

        info!(
            iterations = report.iterations,
            converged = report.converged,
            log_likelihood = report.log_likelihood,
            perplexity = report.perplexity,
            "Trained topic model"
        );
        Ok((model, report))
    }

    fn initialize(
        documents: &[EncodedDocument],
        vocabulary_size: usize,
        config: &ModelConfig,
    ) -> Self {
        let k = config.num_topics;
        let mut rng = StdRng::seed_from_u64(config.seed);
        let seeds = pick_seed_documents(documents, k, &mut rng);

        let mut topic_word: Vec<Vec<f64>> = (0..k)
            .map(|_| {
                (0..vocabulary_size)
                    .map(|_| rng.random::<f64>() / vocabulary_size as f64)
                    .collect()
            })
            .collect();

        for (row, &seed) in topic_word.iter_mut().zip(&seeds) {
            let doc = &documents[seed];
            let total = doc.total() as f64;
            for (id, count) in doc.iter() {
                row[id as usize] += f64::from(count) / total;
            }
        }
        for row in &mut topic_word {
            normalize_or_uniform(row);
        }

        debug!(?seeds, "Initialized topic-word rows");
        Self {
            num_topics: k,
            vocabulary_size,
            topic_word,
            document_topic: vec![vec![1.0 / k as f64; k]; documents.len()],
        }
    }

    /// M-step. Returns the number of rows that fell back to uniform.
    fn maximize(&mut self, expectations: Vec<DocumentExpectation>, alpha: f64, beta: f64) -> usize {
        let mut unstable = 0;
        let mut topic_word_counts = vec![vec![0.0; self.vocabulary_size]; self.num_topics];

        for (theta, expectation) in self.document_topic.iter_mut().zip(expectations) {
            for (row, count) in theta.iter_mut().zip(&expectation.topic_counts) {
                *row = count + alpha;
            }
            if !normalize_or_uniform(theta) {
                unstable += 1;
            }
            for (id, per_topic) in expectation.term_counts {
                for (topic, weight) in per_topic.into_iter().enumerate() {
                    topic_word_counts[topic][id as usize] += weight;
                }
            }
        }

        for (phi, counts) in self.topic_word.iter_mut().zip(topic_word_counts) {
            for (p, count) in phi.iter_mut().zip(counts) {
                *p = count + beta;
            }
            if !normalize_or_uniform(phi) {
                unstable += 1;
            }
        }
        unstable
    }

    /// Log-likelihood of `documents` under the current parameters.
    ///
    /// `documents` must be the corpus the model was trained on.
    pub fn log_likelihood(&self, documents: &[EncodedDocument]) -> f64 {
        documents
            .iter()
            .zip(&self.document_topic)
            .map(|(doc, theta)| {
                doc.iter()
                    .map(|(id, count)| {
                        let p: f64 = theta
                            .iter()
                            .zip(&self.topic_word)
                            .map(|(t, phi)| t * phi[id as usize])
                            .sum();
                        if p > 0.0 { f64::from(count) * p.ln() } else { 0.0 }
                    })
                    .sum::<f64>()
            })
            .sum()
    }

    pub fn num_topics(&self) -> usize {
        self.num_topics
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary_size
    }

    pub fn num_documents(&self) -> usize {
        self.document_topic.len()
    }

    /// `K × V` topic-word matrix.
    pub fn topic_word_distribution(&self) -> &[Vec<f64>] {
        &self.topic_word
    }

    /// `D × K` document-topic matrix, aligned with the training corpus.
    pub fn document_topic_distribution(&self) -> &[Vec<f64>] {
        &self.document_topic
    }

    /// Highest-weighted topic of a document and its weight. Ties go to the lower id.
    pub fn dominant_topic(&self, document: usize) -> Option<(usize, f64)> {
        let row = self.document_topic.get(document)?;
        row.iter()
            .copied()
            .enumerate()
            .fold(None, |best, (k, w)| match best {
                Some((_, bw)) if bw >= w => best,
                _ => Some((k, w)),
            })
    }

    /// The `n` heaviest terms of a topic as `(term id, weight)`, heaviest first.
    /// Ties go to the lower term id.
    pub fn top_terms(&self, topic: usize, n: usize) -> Vec<(u32, f64)> {
        let Some(row) = self.topic_word.get(topic) else {
            return Vec::new();
        };
        let mut ranked: Vec<(u32, f64)> = row
            .iter()
            .enumerate()
            .map(|(id, &w)| (id as u32, w))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(n);
        ranked
    }
}

fn validate(
    documents: &[EncodedDocument],
    vocabulary_size: usize,
    config: &ModelConfig,
) -> Result<(), InvalidConfiguration> {
    if config.num_topics == 0 {
        return Err(InvalidConfiguration::ZeroTopics);
    }
    if config.max_iterations == 0 {
        return Err(InvalidConfiguration::ZeroIterations);
    }
    for (name, value) in [("alpha", config.alpha), ("beta", config.beta)] {
        if !(value.is_finite() && value > 0.0) {
            return Err(InvalidConfiguration::InvalidPrior { name, value });
        }
    }
    if let Some(tolerance) = config.tolerance {
        if !(tolerance.is_finite() && tolerance >= 0.0) {
            return Err(InvalidConfiguration::InvalidTolerance(tolerance));
        }
    }
    if documents.is_empty() {
        return Err(InvalidConfiguration::EmptyCorpus);
    }
    if vocabulary_size == 0 || documents.iter().all(EncodedDocument::is_empty) {
        return Err(InvalidConfiguration::EmptyVocabulary);
    }
    for (document, doc) in documents.iter().enumerate() {
        if let Some((term, _)) = doc.iter().find(|(id, _)| *id as usize >= vocabulary_size) {
            return Err(InvalidConfiguration::TermOutOfRange {
                document,
                term,
                vocabulary: vocabulary_size,
            });
        }
    }
    if config.num_topics > vocabulary_size {
        return Err(InvalidConfiguration::TooManyTopics {
            topics: config.num_topics,
            vocabulary: vocabulary_size,
        });
    }
    Ok(())
}

/// E-step for one document.
fn expect_document(
    doc: &EncodedDocument,
    theta: &[f64],
    topic_word: &[Vec<f64>],
) -> DocumentExpectation {
    let k = theta.len();
    let mut topic_counts = vec![0.0; k];
    let mut term_counts = Vec::with_capacity(doc.distinct_terms());
    let mut log_likelihood = 0.0;
    let mut unstable = 0;

    for (id, count) in doc.iter() {
        let count = f64::from(count);
        let mut responsibility: Vec<f64> = theta
            .iter()
            .zip(topic_word)
            .map(|(t, phi)| t * phi[id as usize])
            .collect();

        let total: f64 = responsibility.iter().sum();
        if total.is_finite() && total > 0.0 {
            log_likelihood += count * total.ln();
        }
        if !normalize_or_uniform(&mut responsibility) {
            unstable += 1;
        }

        for (acc, r) in topic_counts.iter_mut().zip(responsibility.iter_mut()) {
            *r *= count;
            *acc += *r;
        }
        term_counts.push((id, responsibility));
    }

    DocumentExpectation {
        topic_counts,
        term_counts,
        log_likelihood,
        unstable,
    }
}

/// Farthest-first choice of up to `k` distinct non-empty seed documents.
fn pick_seed_documents(documents: &[EncodedDocument], k: usize, rng: &mut StdRng) -> Vec<usize> {
    let candidates: Vec<usize> = (0..documents.len())
        .filter(|&i| !documents[i].is_empty())
        .collect();
    if candidates.is_empty() || k == 0 {
        return Vec::new();
    }

    let mut seeds = vec![candidates[rng.random_range(0..candidates.len())]];
    while seeds.len() < k.min(candidates.len()) {
        let next = candidates
            .iter()
            .copied()
            .filter(|i| !seeds.contains(i))
            .map(|i| {
                let closest = seeds
                    .iter()
                    .map(|&s| cosine_similarity(&documents[i], &documents[s]))
                    .fold(f64::NEG_INFINITY, f64::max);
                (i, closest)
            })
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        match next {
            Some((i, _)) => seeds.push(i),
            None => break,
        }
    }
    seeds
}

fn cosine_similarity(a: &EncodedDocument, b: &EncodedDocument) -> f64 {
    let dot: f64 = a
        .iter()
        .map(|(id, count)| f64::from(count) * f64::from(b.count(id)))
        .sum();
    let norm = |d: &EncodedDocument| {
        d.iter()
            .map(|(_, c)| f64::from(c) * f64::from(c))
            .sum::<f64>()
            .sqrt()
    };
    let denom = norm(a) * norm(b);
    if denom > 0.0 { dot / denom } else { 0.0 }
}
