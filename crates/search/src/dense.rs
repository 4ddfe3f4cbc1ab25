//! Dense-vector retrieval
//!
//! This module provides:
//! - Embedder trait for the injected embedding capability
//! - HashEmbedder: deterministic FNV-1a feature-hashing embedder
//! - cosine_similarity / dot_product / l2_norm helpers
//! - DenseIndex: cosine-similarity retriever over precomputed embeddings
//!
//! Documents are expected to carry their own embeddings; the index only
//! embeds the query. A document whose vector is missing, non-finite or of
//! the wrong dimension scores 0 and is reported at debug level.

use crate::retriever::{rank_scores, Retriever, SnapshotCell};
use crate::tokenizer::tokenize;
use fusionrank_core::error::{Error, Result};
use fusionrank_core::search_types::{SearchMethod, SearchResult};
use fusionrank_core::types::{Corpus, Document};
use rayon::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

// ============================================================================
// Embedder
// ============================================================================

/// Text embedding capability
///
/// Must be deterministic for a given model: the same text always maps to
/// the same vector.
pub trait Embedder: Send + Sync {
    /// Embed `text` into a dense vector
    fn embed(&self, text: &str) -> Vec<f32>;
}

impl<F> Embedder for F
where
    F: Fn(&str) -> Vec<f32> + Send + Sync,
{
    fn embed(&self, text: &str) -> Vec<f32> {
        self(text)
    }
}

/// FNV-1a offset basis (64-bit)
const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;

/// FNV-1a prime (64-bit)
const FNV_PRIME: u64 = 0x0100_0000_01b3;

/// Default embedding dimension
pub const DEFAULT_DIMENSION: usize = 384;

/// Deterministic, non-semantic embedder based on feature hashing
///
/// Each token hashes to one dimension with a sign taken from the hash's
/// high bit; the result is L2-normalized. Captures lexical overlap only,
/// which makes it a stand-in for tests and demos rather than a model.
#[derive(Debug, Clone, Copy)]
pub struct HashEmbedder {
    dimension: usize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        HashEmbedder {
            dimension: DEFAULT_DIMENSION,
        }
    }
}

impl HashEmbedder {
    /// Create an embedder producing `dimension`-sized vectors
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if `dimension` is zero.
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(Error::invalid_input("embedding dimension must be > 0"));
        }
        Ok(HashEmbedder { dimension })
    }

    /// Output dimension
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Attach embeddings to documents that do not have one yet
    pub fn embed_documents(&self, documents: Vec<Document>) -> Vec<Document> {
        documents
            .into_iter()
            .map(|doc| {
                if doc.embedding.is_some() {
                    doc
                } else {
                    let embedding = self.embed(&doc.content);
                    doc.with_embedding(embedding)
                }
            })
            .collect()
    }
}

impl Embedder for HashEmbedder {
    fn embed(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0_f32; self.dimension];
        for token in tokenize(text) {
            let hash = fnv1a_hash(token.as_bytes());
            let index = (hash % self.dimension as u64) as usize;
            let sign = if (hash >> 63) == 1 { 1.0 } else { -1.0 };
            embedding[index] += sign;
        }
        l2_normalize(&mut embedding);
        embedding
    }
}

fn fnv1a_hash(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET;
    for &byte in bytes {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

fn l2_normalize(v: &mut [f32]) {
    let norm = l2_norm(v);
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

// ============================================================================
// Similarity
// ============================================================================

/// Dot product (inner product)
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// L2 norm (Euclidean length)
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Cosine similarity: dot(a,b) / (||a|| * ||b||)
///
/// Range: [-1, 1], higher = more similar.
/// Returns 0.0 if either vector has zero norm or the dimensions differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product(a, b) / (norm_a * norm_b)
    }
}

// ============================================================================
// DenseIndex
// ============================================================================

/// A validated document vector with its cached norm
#[derive(Debug, Clone)]
struct StoredVector {
    values: Vec<f32>,
    norm: f32,
}

/// Published state of a dense index
#[derive(Debug)]
pub struct DenseSnapshot {
    corpus: Corpus,
    vectors: Vec<Option<StoredVector>>,
    malformed: usize,
}

impl DenseSnapshot {
    /// Documents whose vector was unusable at build time
    pub fn malformed(&self) -> usize {
        self.malformed
    }
}

/// Check that a document carries a usable embedding
///
/// # Errors
///
/// Returns `MalformedVector` when the embedding is missing, empty or
/// contains non-finite values.
pub fn validate_embedding(doc: &Document) -> Result<&[f32]> {
    let Some(embedding) = doc.embedding.as_deref() else {
        return Err(Error::malformed_vector(&doc.doc_id, "missing embedding"));
    };
    if embedding.is_empty() {
        return Err(Error::malformed_vector(&doc.doc_id, "empty embedding"));
    }
    if embedding.iter().any(|x| !x.is_finite()) {
        return Err(Error::malformed_vector(
            &doc.doc_id,
            "embedding contains non-finite values",
        ));
    }
    Ok(embedding)
}

/// Cosine-similarity retriever
pub struct DenseIndex {
    embedder: Arc<dyn Embedder>,
    snapshot: SnapshotCell<DenseSnapshot>,
}

impl std::fmt::Debug for DenseIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DenseIndex")
            .field("docs", &self.len())
            .finish()
    }
}

impl Default for DenseIndex {
    fn default() -> Self {
        Self::new(Arc::new(HashEmbedder::default()))
    }
}

impl DenseIndex {
    /// Create an unbuilt index that embeds queries with `embedder`
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        DenseIndex {
            embedder,
            snapshot: SnapshotCell::new(),
        }
    }

    /// Documents whose vector was unusable in the published snapshot
    pub fn malformed_count(&self) -> usize {
        self.snapshot.load().map(|s| s.malformed).unwrap_or(0)
    }
}

impl Retriever for DenseIndex {
    type Snapshot = DenseSnapshot;

    fn method(&self) -> SearchMethod {
        SearchMethod::Dense
    }

    fn prepare(&self, corpus: &Corpus) -> Result<DenseSnapshot> {
        let start = Instant::now();
        let mut malformed = 0;
        let vectors: Vec<Option<StoredVector>> = corpus
            .iter()
            .map(|doc| match validate_embedding(doc) {
                Ok(values) => Some(StoredVector {
                    norm: l2_norm(values),
                    values: values.to_vec(),
                }),
                Err(e) => {
                    malformed += 1;
                    debug!(target: "fusionrank::dense", error = %e, "Skipping document vector");
                    None
                }
            })
            .collect();

        info!(
            target: "fusionrank::dense",
            docs = corpus.len(),
            malformed,
            elapsed_us = start.elapsed().as_micros() as u64,
            "Dense index built"
        );

        Ok(DenseSnapshot {
            corpus: Arc::clone(corpus),
            vectors,
            malformed,
        })
    }

    fn publish(&self, snapshot: DenseSnapshot) {
        self.snapshot.store(snapshot);
    }

    fn search(&self, query: &str, top_k: usize) -> Vec<SearchResult> {
        let Some(snapshot) = self.snapshot.load() else {
            return Vec::new();
        };
        if top_k == 0 {
            return Vec::new();
        }

        let query_vec = self.embedder.embed(query);
        let query_norm = l2_norm(&query_vec);

        let scores: Vec<f32> = snapshot
            .vectors
            .par_iter()
            .zip(snapshot.corpus.par_iter())
            .map(|(stored, doc)| {
                let Some(stored) = stored else {
                    return 0.0;
                };
                if stored.values.len() != query_vec.len() {
                    debug!(
                        target: "fusionrank::dense",
                        error = %Error::malformed_vector(
                            &doc.doc_id,
                            format!("dimension {} != query dimension {}", stored.values.len(), query_vec.len()),
                        ),
                        "Scoring document as 0"
                    );
                    return 0.0;
                }
                if query_norm == 0.0 || stored.norm == 0.0 {
                    return 0.0;
                }
                dot_product(&query_vec, &stored.values) / (query_norm * stored.norm)
            })
            .collect();

        debug!(target: "fusionrank::dense", dimension = query_vec.len(), top_k, "Dense search");
        rank_scores(&snapshot.corpus, scores, top_k, SearchMethod::Dense)
    }

    fn len(&self) -> usize {
        self.snapshot.load().map(|s| s.corpus.len()).unwrap_or(0)
    }
}
