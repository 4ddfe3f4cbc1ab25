//! Learned-sparse (SPLADE-like) retrieval
//!
//! This module provides:
//! - Vocabulary: term -> id mapping, ids assigned in sorted term order
//! - SparseEncoder trait with the LogTfEncoder default
//! - sparse_dot: merge-join dot product over term ids
//! - SparseLearnedIndex: sparse dot-product retriever
//!
//! `LogTfEncoder` weights in-vocabulary terms by `ln(1 + count)` and drops
//! everything else. A term-expansion model can replace it through
//! [`SparseLearnedIndex::with_encoder`].

use crate::retriever::{rank_scores, Retriever, SnapshotCell};
use crate::tokenizer::{term_counts, tokenize};
use fusionrank_core::error::{Error, Result};
use fusionrank_core::search_types::{SearchMethod, SearchResult};
use fusionrank_core::types::{Corpus, Document, SparseVector};
use rayon::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

// ============================================================================
// Vocabulary
// ============================================================================

/// Term vocabulary of a corpus
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vocabulary {
    ids: HashMap<String, u32>,
}

impl Vocabulary {
    /// Collect every token of `documents`; ids follow sorted term order
    pub fn build(documents: &[Document]) -> Self {
        let terms: BTreeSet<String> = documents
            .iter()
            .flat_map(|doc| tokenize(&doc.content))
            .collect();
        let ids = terms
            .into_iter()
            .enumerate()
            .map(|(id, term)| (term, id as u32))
            .collect();
        Vocabulary { ids }
    }

    /// Id of `term`, if it is in the vocabulary
    pub fn id(&self, term: &str) -> Option<u32> {
        self.ids.get(term).copied()
    }

    /// Number of distinct terms
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the vocabulary has no terms
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

// ============================================================================
// SparseEncoder
// ============================================================================

/// Text -> sparse vector encoding against a vocabulary
pub trait SparseEncoder: Send + Sync {
    /// Encode `text`; ids must be valid in `vocab` and weights non-negative
    fn encode(&self, text: &str, vocab: &Vocabulary) -> SparseVector;

    /// Name for debugging and logging
    fn name(&self) -> &str;
}

/// Log-scaled term frequency: weight = ln(1 + count)
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTfEncoder;

impl SparseEncoder for LogTfEncoder {
    fn encode(&self, text: &str, vocab: &Vocabulary) -> SparseVector {
        term_counts(&tokenize(text))
            .into_iter()
            .filter_map(|(term, count)| {
                vocab
                    .id(&term)
                    .map(|id| (id, (1.0 + count as f32).ln()))
            })
            .collect()
    }

    fn name(&self) -> &str {
        "log-tf"
    }
}

/// Dot product over shared term ids
pub fn sparse_dot(a: &SparseVector, b: &SparseVector) -> f32 {
    let mut left = a.iter();
    let mut right = b.iter();
    let (mut l, mut r) = (left.next(), right.next());
    let mut sum = 0.0;
    while let (Some((ia, wa)), Some((ib, wb))) = (l, r) {
        match ia.cmp(ib) {
            std::cmp::Ordering::Less => l = left.next(),
            std::cmp::Ordering::Greater => r = right.next(),
            std::cmp::Ordering::Equal => {
                sum += wa * wb;
                l = left.next();
                r = right.next();
            }
        }
    }
    sum
}

/// Check a document-supplied sparse vector against the vocabulary
///
/// # Errors
///
/// Returns `MalformedVector` for negative or non-finite weights, or ids
/// outside the vocabulary.
pub fn validate_sparse_vector(
    doc_id: &str,
    vector: &SparseVector,
    vocab_size: usize,
) -> Result<()> {
    for (&id, &weight) in vector {
        if !weight.is_finite() || weight < 0.0 {
            return Err(Error::malformed_vector(
                doc_id,
                format!("term {} has invalid weight {}", id, weight),
            ));
        }
        if id as usize >= vocab_size {
            return Err(Error::malformed_vector(
                doc_id,
                format!("term id {} outside vocabulary of {}", id, vocab_size),
            ));
        }
    }
    Ok(())
}

// ============================================================================
// SparseLearnedIndex
// ============================================================================

/// Published state of a sparse index
#[derive(Debug)]
pub struct SparseSnapshot {
    corpus: Corpus,
    vocab: Vocabulary,
    vectors: Vec<Option<SparseVector>>,
    malformed: usize,
}

impl SparseSnapshot {
    /// Vocabulary of the snapshot
    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }
}

/// Sparse dot-product retriever
pub struct SparseLearnedIndex {
    encoder: Arc<dyn SparseEncoder>,
    snapshot: SnapshotCell<SparseSnapshot>,
}

impl std::fmt::Debug for SparseLearnedIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SparseLearnedIndex")
            .field("encoder", &self.encoder.name())
            .field("vocab_size", &self.vocab_size())
            .finish()
    }
}

impl Default for SparseLearnedIndex {
    fn default() -> Self {
        SparseLearnedIndex {
            encoder: Arc::new(LogTfEncoder),
            snapshot: SnapshotCell::new(),
        }
    }
}

impl SparseLearnedIndex {
    /// Create an unbuilt index using `LogTfEncoder`
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: replace the encoder
    pub fn with_encoder(mut self, encoder: Arc<dyn SparseEncoder>) -> Self {
        self.encoder = encoder;
        self
    }

    /// Build a vocabulary from `documents` without publishing anything
    pub fn build_vocab(documents: &[Document]) -> Vocabulary {
        Vocabulary::build(documents)
    }

    /// Vocabulary size of the published snapshot
    pub fn vocab_size(&self) -> usize {
        self.snapshot.load().map(|s| s.vocab.len()).unwrap_or(0)
    }

    /// Encode `text` against the published vocabulary
    ///
    /// Returns an empty vector when nothing has been built.
    pub fn encode_to_sparse_vector(&self, text: &str) -> SparseVector {
        match self.snapshot.load() {
            Some(snapshot) => self.encoder.encode(text, &snapshot.vocab),
            None => SparseVector::new(),
        }
    }

    /// Documents whose supplied vector was rejected in the published snapshot
    pub fn malformed_count(&self) -> usize {
        self.snapshot.load().map(|s| s.malformed).unwrap_or(0)
    }
}

impl Retriever for SparseLearnedIndex {
    type Snapshot = SparseSnapshot;

    fn method(&self) -> SearchMethod {
        SearchMethod::Splade
    }

    fn prepare(&self, corpus: &Corpus) -> Result<SparseSnapshot> {
        let start = Instant::now();
        let vocab = Vocabulary::build(corpus);

        let encoded: Vec<Result<SparseVector>> = corpus
            .par_iter()
            .map(|doc| match &doc.sparse_vector {
                Some(own) => {
                    validate_sparse_vector(&doc.doc_id, own, vocab.len()).map(|_| own.clone())
                }
                None => Ok(self.encoder.encode(&doc.content, &vocab)),
            })
            .collect();

        let mut malformed = 0;
        let vectors = encoded
            .into_iter()
            .map(|r| match r {
                Ok(v) => Some(v),
                Err(e) => {
                    malformed += 1;
                    debug!(target: "fusionrank::sparse", error = %e, "Skipping document vector");
                    None
                }
            })
            .collect();

        info!(
            target: "fusionrank::sparse",
            docs = corpus.len(),
            vocab_size = vocab.len(),
            malformed,
            encoder = self.encoder.name(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "Sparse index built"
        );

        Ok(SparseSnapshot {
            corpus: Arc::clone(corpus),
            vocab,
            vectors,
            malformed,
        })
    }

    fn publish(&self, snapshot: SparseSnapshot) {
        self.snapshot.store(snapshot);
    }

    fn search(&self, query: &str, top_k: usize) -> Vec<SearchResult> {
        let Some(snapshot) = self.snapshot.load() else {
            return Vec::new();
        };
        if top_k == 0 {
            return Vec::new();
        }

        let query_vec = self.encoder.encode(query, &snapshot.vocab);
        let scores: Vec<f32> = snapshot
            .vectors
            .par_iter()
            .map(|doc_vec| match doc_vec {
                Some(v) if !query_vec.is_empty() => sparse_dot(&query_vec, v),
                _ => 0.0,
            })
            .collect();

        debug!(target: "fusionrank::sparse", query_terms = query_vec.len(), top_k, "Sparse search");
        rank_scores(&snapshot.corpus, scores, top_k, SearchMethod::Splade)
    }

    fn len(&self) -> usize {
        self.snapshot.load().map(|s| s.corpus.len()).unwrap_or(0)
    }
}
