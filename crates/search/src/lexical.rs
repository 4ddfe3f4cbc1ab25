//! Lexical BM25 index
//!
//! This module provides:
//! - Scorer trait for pluggable term-based scoring
//! - CorpusStats for corpus-level statistics (N, df, avgdl)
//! - DocTerms per-document term counts
//! - Bm25Scorer default implementation
//! - LexicalIndex: the BM25 retriever

use crate::retriever::{rank_scores, Retriever, SnapshotCell};
use crate::tokenizer::{term_counts, tokenize};
use fusionrank_core::config::Bm25Config;
use fusionrank_core::error::Result;
use fusionrank_core::search_types::{SearchMethod, SearchResult};
use fusionrank_core::types::Corpus;
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

// ============================================================================
// DocTerms
// ============================================================================

/// Tokenized view of one document
#[derive(Debug, Clone, Default)]
pub struct DocTerms {
    /// Term -> occurrences in the document
    pub counts: HashMap<String, u32>,
    /// Total token count (duplicates included)
    pub len: u32,
}

impl DocTerms {
    /// Tokenize `text` and count its terms
    pub fn from_text(text: &str) -> Self {
        let tokens = tokenize(text);
        DocTerms {
            len: tokens.len() as u32,
            counts: term_counts(&tokens),
        }
    }

    /// Occurrences of `term`
    pub fn tf(&self, term: &str) -> u32 {
        self.counts.get(term).copied().unwrap_or(0)
    }
}

// ============================================================================
// CorpusStats
// ============================================================================

/// Corpus-level statistics needed by BM25
#[derive(Debug, Clone, Default)]
pub struct CorpusStats {
    /// Total documents in corpus (for IDF calculation)
    pub total_docs: usize,
    /// Document frequency per term (for IDF calculation)
    pub doc_freqs: HashMap<String, usize>,
    /// Average document length in tokens (for length normalization)
    pub avg_doc_len: f32,
}

impl CorpusStats {
    /// Collect statistics over tokenized documents
    pub fn from_docs(docs: &[DocTerms]) -> Self {
        let mut doc_freqs: HashMap<String, usize> = HashMap::new();
        let mut total_len: u64 = 0;
        for doc in docs {
            total_len += u64::from(doc.len);
            for term in doc.counts.keys() {
                *doc_freqs.entry(term.clone()).or_insert(0) += 1;
            }
        }
        let avg_doc_len = if docs.is_empty() {
            0.0
        } else {
            total_len as f32 / docs.len() as f32
        };
        CorpusStats {
            total_docs: docs.len(),
            doc_freqs,
            avg_doc_len,
        }
    }

    /// Number of documents containing `term`
    pub fn doc_freq(&self, term: &str) -> usize {
        self.doc_freqs.get(term).copied().unwrap_or(0)
    }

    /// Compute IDF for a term
    ///
    /// IDF(t) = ln((N - df + 0.5) / (df + 0.5) + 1)
    pub fn idf(&self, term: &str) -> f32 {
        let df = self.doc_freq(term) as f32;
        let n = self.total_docs as f32;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    /// Document length relative to the average; 1.0 when the average is 0
    pub fn length_ratio(&self, doc_len: u32) -> f32 {
        if self.avg_doc_len > 0.0 {
            doc_len as f32 / self.avg_doc_len
        } else {
            1.0
        }
    }
}

// ============================================================================
// Scorer Trait
// ============================================================================

/// Pluggable term-based scoring interface
///
/// Higher scores indicate more relevant documents. Scores are not
/// normalized; fusion handles cross-method comparisons.
pub trait Scorer: Send + Sync {
    /// Score one document against already-tokenized query terms
    fn score(&self, doc: &DocTerms, query_terms: &[String], stats: &CorpusStats) -> f32;

    /// Name for debugging and logging
    fn name(&self) -> &str;
}

// ============================================================================
// Bm25Scorer
// ============================================================================

/// Okapi BM25
///
/// For each query term t:
/// score += IDF(t) * (tf * (k1 + 1)) / (tf + k1 * (1 - b + b * dl/avgdl))
///
/// Query terms are not deduplicated: a term repeated in the query
/// contributes once per occurrence.
#[derive(Debug, Clone, Copy)]
pub struct Bm25Scorer {
    k1: f32,
    b: f32,
}

impl Default for Bm25Scorer {
    fn default() -> Self {
        Bm25Scorer::from_config(&Bm25Config::default())
    }
}

impl Bm25Scorer {
    /// Create a scorer with custom parameters
    pub fn new(k1: f32, b: f32) -> Self {
        Bm25Scorer { k1, b }
    }

    /// Create a scorer from configuration
    pub fn from_config(config: &Bm25Config) -> Self {
        Self::new(config.k1, config.b)
    }

    /// Term-frequency saturation parameter
    pub fn k1(&self) -> f32 {
        self.k1
    }

    /// Length-normalization parameter
    pub fn b(&self) -> f32 {
        self.b
    }
}

impl Scorer for Bm25Scorer {
    fn score(&self, doc: &DocTerms, query_terms: &[String], stats: &CorpusStats) -> f32 {
        if query_terms.is_empty() || doc.len == 0 {
            return 0.0;
        }

        let norm = 1.0 - self.b + self.b * stats.length_ratio(doc.len);
        let mut score = 0.0;
        for term in query_terms {
            let tf = doc.tf(term) as f32;
            if tf == 0.0 {
                continue;
            }
            let tf_component = (tf * (self.k1 + 1.0)) / (tf + self.k1 * norm);
            score += stats.idf(term) * tf_component;
        }
        score
    }

    fn name(&self) -> &str {
        "bm25"
    }
}

// ============================================================================
// LexicalIndex
// ============================================================================

/// Published state of a lexical index
#[derive(Debug)]
pub struct LexicalSnapshot {
    corpus: Corpus,
    docs: Vec<DocTerms>,
    stats: CorpusStats,
}

impl LexicalSnapshot {
    /// Corpus-level statistics
    pub fn stats(&self) -> &CorpusStats {
        &self.stats
    }
}

/// BM25 retriever over a corpus snapshot
pub struct LexicalIndex {
    scorer: Arc<dyn Scorer>,
    snapshot: SnapshotCell<LexicalSnapshot>,
}

impl Default for LexicalIndex {
    fn default() -> Self {
        Self::new(Bm25Config::default())
    }
}

impl std::fmt::Debug for LexicalIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LexicalIndex")
            .field("scorer", &self.scorer.name())
            .field("docs", &self.len())
            .finish()
    }
}

impl LexicalIndex {
    /// Create an unbuilt index using BM25 with the given parameters
    pub fn new(config: Bm25Config) -> Self {
        LexicalIndex {
            scorer: Arc::new(Bm25Scorer::from_config(&config)),
            snapshot: SnapshotCell::new(),
        }
    }

    /// Builder: replace the scorer
    pub fn with_scorer(mut self, scorer: Arc<dyn Scorer>) -> Self {
        self.scorer = scorer;
        self
    }

    /// IDF of `term` in the published snapshot (0 when unbuilt)
    pub fn idf(&self, term: &str) -> f32 {
        self.snapshot
            .load()
            .map(|s| s.stats.idf(term))
            .unwrap_or(0.0)
    }

    /// Document frequency of `term` in the published snapshot
    pub fn doc_freq(&self, term: &str) -> usize {
        self.snapshot
            .load()
            .map(|s| s.stats.doc_freq(term))
            .unwrap_or(0)
    }

    /// Average document length of the published snapshot
    pub fn avg_doc_len(&self) -> f32 {
        self.snapshot
            .load()
            .map(|s| s.stats.avg_doc_len)
            .unwrap_or(0.0)
    }
}

impl Retriever for LexicalIndex {
    type Snapshot = LexicalSnapshot;

    fn method(&self) -> SearchMethod {
        SearchMethod::Bm25
    }

    fn prepare(&self, corpus: &Corpus) -> Result<LexicalSnapshot> {
        let start = Instant::now();
        let docs: Vec<DocTerms> = corpus
            .par_iter()
            .map(|doc| DocTerms::from_text(&doc.content))
            .collect();
        let stats = CorpusStats::from_docs(&docs);

        info!(
            target: "fusionrank::lexical",
            docs = stats.total_docs,
            terms = stats.doc_freqs.len(),
            avg_doc_len = stats.avg_doc_len,
            elapsed_us = start.elapsed().as_micros() as u64,
            "BM25 index built"
        );

        Ok(LexicalSnapshot {
            corpus: Arc::clone(corpus),
            docs,
            stats,
        })
    }

    fn publish(&self, snapshot: LexicalSnapshot) {
        self.snapshot.store(snapshot);
    }

    fn search(&self, query: &str, top_k: usize) -> Vec<SearchResult> {
        let Some(snapshot) = self.snapshot.load() else {
            return Vec::new();
        };
        if top_k == 0 {
            return Vec::new();
        }

        let query_terms = tokenize(query);
        let scores: Vec<f32> = snapshot
            .docs
            .par_iter()
            .map(|doc| self.scorer.score(doc, &query_terms, &snapshot.stats))
            .collect();

        debug!(
            target: "fusionrank::lexical",
            query_terms = query_terms.len(),
            top_k,
            "BM25 search"
        );
        rank_scores(&snapshot.corpus, scores, top_k, SearchMethod::Bm25)
    }

    fn len(&self) -> usize {
        self.snapshot.load().map(|s| s.corpus.len()).unwrap_or(0)
    }
}

// ============================================================================
// Tests
// ============================================================================
