//! Retriever abstraction shared by the three indexes
//!
//! This module provides:
//! - Retriever trait: build / search contract every index implements
//! - SnapshotCell: atomically replaceable `Arc` snapshot
//! - rank_scores: stable descending sort + top-k into SearchResults
//!
//! # Snapshot Semantics
//!
//! Indexes build into a fresh snapshot without holding any lock, then swap
//! it in under a short write lock. Searches clone the current `Arc` and
//! score without holding the lock, so a search never observes a partially
//! built index and a failed build leaves the previous snapshot published.

use fusionrank_core::error::Result;
use fusionrank_core::search_types::{SearchMethod, SearchResult};
use fusionrank_core::types::{into_corpus, Corpus, Document};
use parking_lot::RwLock;
use std::sync::Arc;

// ============================================================================
// Retriever Trait
// ============================================================================

/// A single retrieval method over an immutable corpus snapshot
///
/// Building is split into `prepare` (fallible, lock-free) and `publish`
/// (infallible swap) so a coordinator can prepare several indexes and
/// publish them together only if every preparation succeeded.
///
/// # Thread Safety
///
/// Retrievers must be Send + Sync: searches run concurrently with each
/// other and with builds.
pub trait Retriever: Send + Sync {
    /// Immutable state produced by a build
    type Snapshot: Send + Sync;

    /// Method tag carried by this retriever's results
    fn method(&self) -> SearchMethod;

    /// Build a new snapshot from a validated corpus without publishing it
    fn prepare(&self, corpus: &Corpus) -> Result<Self::Snapshot>;

    /// Replace the published snapshot
    fn publish(&self, snapshot: Self::Snapshot);

    /// Rank documents of the published snapshot against `query`
    ///
    /// Returns an empty list when nothing has been built yet.
    fn search(&self, query: &str, top_k: usize) -> Vec<SearchResult>;

    /// Number of documents in the published snapshot
    fn len(&self) -> usize;

    /// Whether no snapshot (or an empty one) is published
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Validate `documents`, prepare and publish in one step
    ///
    /// # Errors
    ///
    /// - `EmptyCorpus` for zero documents
    /// - `IndexBuild` for duplicate doc ids or a failed preparation
    ///
    /// On error the previous snapshot stays published.
    fn build_index(&self, documents: Vec<Document>) -> Result<()> {
        let corpus = into_corpus(documents)?;
        let snapshot = self.prepare(&corpus)?;
        self.publish(snapshot);
        Ok(())
    }
}

// ============================================================================
// SnapshotCell
// ============================================================================

/// Atomically replaceable snapshot
///
/// Readers hold an `Arc` clone and are never blocked by a concurrent
/// publish for longer than the pointer swap.
#[derive(Debug)]
pub struct SnapshotCell<T> {
    inner: RwLock<Option<Arc<T>>>,
}

impl<T> Default for SnapshotCell<T> {
    fn default() -> Self {
        SnapshotCell {
            inner: RwLock::new(None),
        }
    }
}

impl<T> SnapshotCell<T> {
    /// Create an empty cell
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot, if one has been published
    pub fn load(&self) -> Option<Arc<T>> {
        self.inner.read().clone()
    }

    /// Publish a new snapshot; the old one is dropped with its last reader
    pub fn store(&self, snapshot: T) {
        let snapshot = Arc::new(snapshot);
        *self.inner.write() = Some(snapshot);
    }
}

// ============================================================================
// Ranking helper
// ============================================================================

/// Map NaN and infinite scores to 0.0
///
/// `-0.0` folds to `0.0` so `total_cmp` sees both zeros as a tie.
pub(crate) fn finite_or_zero(score: f32) -> f32 {
    if score.is_finite() {
        score + 0.0
    } else {
        0.0
    }
}

/// Turn per-document scores into a ranked, truncated result list
///
/// `scores[i]` belongs to `corpus[i]`. Non-finite scores rank as 0.0. The
/// sort is stable, so equal scores keep corpus order. Ranks are 1-based.
pub fn rank_scores(
    corpus: &Corpus,
    scores: Vec<f32>,
    top_k: usize,
    method: SearchMethod,
) -> Vec<SearchResult> {
    debug_assert_eq!(corpus.len(), scores.len());

    let mut order: Vec<(usize, f32)> =
        scores.into_iter().map(finite_or_zero).enumerate().collect();
    order.sort_by(|a, b| b.1.total_cmp(&a.1));

    order
        .into_iter()
        .take(top_k)
        .enumerate()
        .map(|(i, (doc_idx, score))| {
            let doc = &corpus[doc_idx];
            SearchResult {
                doc_id: doc.doc_id.clone(),
                score,
                rank: (i + 1) as u32,
                content: doc.content.clone(),
                metadata: doc.metadata.clone(),
                method,
            }
        })
        .collect()
}
