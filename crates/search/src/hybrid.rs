//! Hybrid search coordinator
//!
//! This module provides:
//! - HybridSearch: owns one lexical, one dense and one sparse index
//! - dynamic_alpha_adjustment: query-shape heuristics for fusion weights
//! - Parallel per-method search, fusion and truncation
//! - Exact-match metadata filtering over fused results
//!
//! # Architecture
//!
//! ```text
//! query
//!   │
//!   ▼
//! ┌──────────────────────────────────────────┐
//! │              HybridSearch                │
//! │  dynamic_alpha_adjustment ─► weights     │
//! │                                          │
//! │  ┌──────────┐ ┌──────────┐ ┌──────────┐  │
//! │  │ Lexical  │ │  Dense   │ │  Sparse  │  │  top_k × overfetch each,
//! │  │  (BM25)  │ │ (cosine) │ │  (dot)   │  │  run in parallel
//! │  └────┬─────┘ └────┬─────┘ └────┬─────┘  │
//! │       └────────────┼────────────┘        │
//! │              ┌─────┴─────┐               │
//! │              │   Fuser   │ RRF/weighted  │
//! │              └─────┬─────┘               │
//! └────────────────────┼─────────────────────┘
//!                      ▼
//!             top_k SearchResults
//! ```
//!
//! # Snapshot Consistency
//!
//! A build prepares all three snapshots first and publishes them together
//! under the generation lock; a search reads all three under the same
//! lock, so it never mixes two corpus generations.

use crate::dense::{DenseIndex, Embedder, HashEmbedder};
use crate::fuser::{FusedResult, Fuser, RrfFuser, WeightedFuser};
use crate::lexical::LexicalIndex;
use crate::retriever::Retriever;
use crate::sparse::{SparseEncoder, SparseLearnedIndex};
use fusionrank_core::config::{AlphaConfig, SearchConfig};
use fusionrank_core::error::Result;
use fusionrank_core::search_types::{
    FusionMethod, FusionWeights, HybridResponse, SearchMethod, SearchResult, SearchStats,
};
use fusionrank_core::types::{into_corpus, metadata_matches, Document, Metadata};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

// ============================================================================
// Dynamic alpha
// ============================================================================

/// Choose fusion weights from the shape of `query`
///
/// Words are whitespace-separated. Short queries favour lexical and sparse
/// matching, long queries favour dense matching. When at least
/// `proper_noun_ratio` of the words start with an uppercase letter, weight
/// moves from dense to bm25 (neither weight drops below 0). An empty query
/// has no words, so it gets the short-query weights plus the shift.
pub fn dynamic_alpha_adjustment(query: &str, alpha: &AlphaConfig) -> FusionWeights {
    let words: Vec<&str> = query.split_whitespace().collect();
    let word_count = words.len();

    let mut weights = if word_count <= alpha.short_max_words {
        alpha.short
    } else if word_count >= alpha.long_min_words {
        alpha.long
    } else {
        alpha.default
    };

    let capitalized = words
        .iter()
        .filter(|w| w.chars().next().is_some_and(char::is_uppercase))
        .count();
    if capitalized as f32 >= word_count as f32 * alpha.proper_noun_ratio {
        weights.bm25 = (weights.bm25 + alpha.proper_noun_shift).max(0.0);
        weights.dense = (weights.dense - alpha.proper_noun_shift).max(0.0);
    }

    weights
}

// ============================================================================
// HybridSearch
// ============================================================================

/// Coordinator over the three retrieval methods
///
/// All methods take `&self`; a `HybridSearch` can be shared behind an
/// `Arc` and searched from many threads while a rebuild is in progress.
pub struct HybridSearch {
    lexical: LexicalIndex,
    dense: DenseIndex,
    sparse: SparseLearnedIndex,
    rrf: RrfFuser,
    weighted: WeightedFuser,
    config: SearchConfig,
    /// Weights chosen by the most recent search
    weights: RwLock<FusionWeights>,
    /// Held for writing while publishing, for reading while searching
    generation: RwLock<()>,
}

impl std::fmt::Debug for HybridSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HybridSearch")
            .field("lexical", &self.lexical)
            .field("dense", &self.dense)
            .field("sparse", &self.sparse)
            .field("weights", &*self.weights.read())
            .finish()
    }
}

impl Default for HybridSearch {
    fn default() -> Self {
        Self::new(SearchConfig::default(), Arc::new(HashEmbedder::default()))
    }
}

impl HybridSearch {
    /// Create an unbuilt coordinator
    ///
    /// `embedder` embeds queries for the dense index; documents must carry
    /// embeddings produced by the same model.
    pub fn new(config: SearchConfig, embedder: Arc<dyn Embedder>) -> Self {
        HybridSearch {
            lexical: LexicalIndex::new(config.bm25),
            dense: DenseIndex::new(embedder),
            sparse: SparseLearnedIndex::new(),
            rrf: RrfFuser::new(config.fusion.rrf_k),
            weighted: WeightedFuser::new(config.fusion.normalization),
            weights: RwLock::new(config.alpha.default),
            generation: RwLock::new(()),
            config,
        }
    }

    /// Builder: replace the sparse encoder
    pub fn with_sparse_encoder(mut self, encoder: Arc<dyn SparseEncoder>) -> Self {
        self.sparse = self.sparse.with_encoder(encoder);
        self
    }

    /// Search configuration
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Lexical sub-index
    pub fn lexical(&self) -> &LexicalIndex {
        &self.lexical
    }

    /// Dense sub-index
    pub fn dense(&self) -> &DenseIndex {
        &self.dense
    }

    /// Sparse sub-index
    pub fn sparse(&self) -> &SparseLearnedIndex {
        &self.sparse
    }

    /// Number of indexed documents
    pub fn len(&self) -> usize {
        self.lexical.len()
    }

    /// Whether nothing has been indexed
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Weights chosen by the most recent search
    pub fn current_weights(&self) -> FusionWeights {
        *self.weights.read()
    }

    // ========================================================================
    // Build
    // ========================================================================

    /// Index `documents` in all three sub-indexes
    ///
    /// # Errors
    ///
    /// - `EmptyCorpus` for zero documents
    /// - `IndexBuild` for duplicate doc ids or a failed sub-index build
    ///
    /// Nothing is published unless all three builds succeed; on error the
    /// previous generation stays searchable.
    pub fn build_index(&self, documents: Vec<Document>) -> Result<()> {
        let start = Instant::now();
        let corpus = into_corpus(documents)?;

        let lexical = self.lexical.prepare(&corpus)?;
        let dense = self.dense.prepare(&corpus)?;
        let sparse = self.sparse.prepare(&corpus)?;

        {
            let _generation = self.generation.write();
            self.lexical.publish(lexical);
            self.dense.publish(dense);
            self.sparse.publish(sparse);
        }

        info!(
            target: "fusionrank::hybrid",
            docs = corpus.len(),
            vocab_size = self.sparse.vocab_size(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "Hybrid index built"
        );
        Ok(())
    }

    // ========================================================================
    // Search
    // ========================================================================

    /// Weights for `query` under this coordinator's alpha configuration
    pub fn dynamic_alpha_adjustment(&self, query: &str) -> FusionWeights {
        dynamic_alpha_adjustment(query, &self.config.alpha)
    }

    /// Hybrid search returning at most `top_k` fused results
    pub fn search(&self, query: &str, top_k: usize, fusion: FusionMethod) -> Vec<SearchResult> {
        self.search_detailed(query, top_k, fusion).results
    }

    /// Hybrid search with weights and execution statistics
    ///
    /// # Flow
    ///
    /// 1. Recompute weights from the query shape
    /// 2. Run the three sub-searches with `top_k × overfetch_factor`, in parallel
    /// 3. Fuse with `fusion`
    /// 4. Truncate to `top_k`
    pub fn search_detailed(
        &self,
        query: &str,
        top_k: usize,
        fusion: FusionMethod,
    ) -> HybridResponse {
        let start = Instant::now();
        let weights = self.dynamic_alpha_adjustment(query);
        *self.weights.write() = weights;

        if top_k == 0 {
            return HybridResponse {
                results: Vec::new(),
                weights,
                fusion,
                truncated: false,
                stats: SearchStats::default(),
            };
        }

        let fetch = top_k.saturating_mul(self.config.fusion.overfetch_factor);
        let (bm25, (dense, splade)) = {
            // Recursive read: a rayon worker may pick up another search while
            // a publish is queued.
            let _generation = self.generation.read_recursive();
            rayon::join(
                || self.lexical.search(query, fetch),
                || {
                    rayon::join(
                        || self.dense.search(query, fetch),
                        || self.sparse.search(query, fetch),
                    )
                },
            )
        };

        let mut stats = SearchStats {
            bm25_candidates: bm25.len(),
            dense_candidates: dense.len(),
            splade_candidates: splade.len(),
            ..SearchStats::default()
        };

        let lists = [
            (SearchMethod::Bm25, bm25),
            (SearchMethod::Dense, dense),
            (SearchMethod::Splade, splade),
        ];
        let FusedResult {
            results,
            candidates,
            truncated,
        } = self.fuser(fusion).fuse(&lists, &weights, top_k);

        stats.fused_candidates = candidates;
        stats.elapsed_micros = start.elapsed().as_micros() as u64;

        debug!(
            target: "fusionrank::hybrid",
            fusion = %fusion,
            bm25 = weights.bm25,
            dense = weights.dense,
            splade = weights.splade,
            bm25_candidates = stats.bm25_candidates,
            dense_candidates = stats.dense_candidates,
            splade_candidates = stats.splade_candidates,
            fused = candidates,
            returned = results.len(),
            elapsed_us = stats.elapsed_micros,
            "Hybrid search"
        );

        HybridResponse {
            results,
            weights,
            fusion,
            truncated,
            stats,
        }
    }

    /// Hybrid search keeping only results whose metadata matches `filters`
    ///
    /// Runs the configured default fusion with
    /// `top_k × metadata_overfetch_factor` candidates, keeps exact matches
    /// (equality only) and truncates to `top_k`. Fused ranks are kept, so
    /// they may have gaps. An empty filter map keeps everything.
    pub fn search_with_metadata(
        &self,
        query: &str,
        filters: &Metadata,
        top_k: usize,
    ) -> Vec<SearchResult> {
        let fetch = top_k.saturating_mul(self.config.fusion.metadata_overfetch_factor);
        self.search(query, fetch, self.config.fusion.default_method)
            .into_iter()
            .filter(|r| metadata_matches(&r.metadata, filters))
            .take(top_k)
            .collect()
    }

    fn fuser(&self, fusion: FusionMethod) -> &dyn Fuser {
        match fusion {
            FusionMethod::Rrf => &self.rrf,
            FusionMethod::Weighted => &self.weighted,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use fusionrank_core::error::Error;
    use serde_json::json;

    fn corpus() -> Vec<Document> {
        let embedder = HashEmbedder::default();
        embedder.embed_documents(vec![
            Document::new("d1", "python programming language").with_metadata("file_type", "python"),
            Document::new("d2", "javascript web browser").with_metadata("file_type", "javascript"),
            Document::new("d3", "python machine learning").with_metadata("file_type", "python"),
            Document::new("d4", "rust systems programming").with_metadata("file_type", "rust"),
        ])
    }

    fn built() -> HybridSearch {
        let search = HybridSearch::default();
        search.build_index(corpus()).unwrap();
        search
    }

    // ========================================
    // Dynamic alpha
    // ========================================

    #[test]
    fn test_alpha_short_query() {
        let w = dynamic_alpha_adjustment("python code", &AlphaConfig::default());
        assert_eq!(w, FusionWeights::new(0.4, 0.2, 0.4));
    }

    #[test]
    fn test_alpha_mid_query() {
        let w = dynamic_alpha_adjustment("how do i sort a list", &AlphaConfig::default());
        assert_eq!(w, FusionWeights::new(0.3, 0.4, 0.3));
    }

    #[test]
    fn test_alpha_long_query() {
        let query = "what is the best way to learn about machine learning with python today";
        let w = dynamic_alpha_adjustment(query, &AlphaConfig::default());
        assert_eq!(w, FusionWeights::new(0.2, 0.5, 0.3));
    }

    #[test]
    fn test_alpha_short_vs_long_differ() {
        let alpha = AlphaConfig::default();
        let short = dynamic_alpha_adjustment("python tips", &alpha);
        let long = dynamic_alpha_adjustment(
            "please explain in detail how neural networks learn representations from raw data over many epochs",
            &alpha,
        );
        assert_ne!(short, long);
        assert!(short.bm25 + short.splade > short.dense);
        assert!(long.dense > long.bm25);
    }

    #[test]
    fn test_alpha_capitalized_shift() {
        let w = dynamic_alpha_adjustment("Barack Obama speech", &AlphaConfig::default());
        assert!((w.bm25 - 0.5).abs() < 1e-6);
        assert!((w.dense - 0.1).abs() < 1e-6);
        assert!((w.splade - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_alpha_empty_query_shifts_like_capitalized() {
        for query in ["", "   "] {
            let w = dynamic_alpha_adjustment(query, &AlphaConfig::default());
            assert!((w.bm25 - 0.5).abs() < 1e-6);
            assert!((w.dense - 0.1).abs() < 1e-6);
            assert!((w.splade - 0.4).abs() < 1e-6);
        }
    }

    #[test]
    fn test_alpha_dense_clamped_at_zero() {
        let alpha = AlphaConfig {
            proper_noun_shift: 0.5,
            ..AlphaConfig::default()
        };
        let w = dynamic_alpha_adjustment("Rust", &alpha);
        assert_eq!(w.dense, 0.0);
        assert!(w.is_valid());
    }

    #[test]
    fn test_alpha_negative_shift_keeps_weights_valid() {
        let alpha = AlphaConfig {
            proper_noun_shift: -0.6,
            ..AlphaConfig::default()
        };
        let w = dynamic_alpha_adjustment("Rust", &alpha);
        assert_eq!(w.bm25, 0.0);
        assert!(w.is_valid());
    }

    // ========================================
    // Build
    // ========================================

    #[test]
    fn test_build_empty_corpus() {
        let search = HybridSearch::default();
        assert!(matches!(search.build_index(vec![]), Err(Error::EmptyCorpus)));
        assert!(search.search("python", 5, FusionMethod::Rrf).is_empty());
    }

    #[test]
    fn test_build_duplicate_ids_keeps_previous() {
        let search = built();
        let err = search
            .build_index(vec![Document::new("x", "a"), Document::new("x", "b")])
            .unwrap_err();
        assert!(matches!(err, Error::IndexBuild(_)));
        assert_eq!(search.len(), 4);
    }

    // ========================================
    // Search
    // ========================================

    #[test]
    fn test_search_truncates_and_ranks() {
        let search = built();
        let results = search.search("python programming", 2, FusionMethod::Rrf);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].rank, 1);
        assert_eq!(results[1].rank, 2);
        assert!(results.iter().all(|r| r.method == SearchMethod::Hybrid));
        assert_eq!(results[0].doc_id, "d1");
    }

    #[test]
    fn test_search_weighted_tag() {
        let search = built();
        let results = search.search("python", 3, FusionMethod::Weighted);
        assert!(!results.is_empty());
        assert!(results
            .iter()
            .all(|r| r.method == SearchMethod::HybridWeighted));
    }

    #[test]
    fn test_search_zero_top_k() {
        let search = built();
        assert!(search.search("python", 0, FusionMethod::Rrf).is_empty());
    }

    #[test]
    fn test_search_updates_current_weights() {
        let search = built();
        search.search("Python", 3, FusionMethod::Rrf);
        assert_eq!(
            search.current_weights(),
            search.dynamic_alpha_adjustment("Python")
        );
    }

    #[test]
    fn test_search_detailed_stats() {
        let search = built();
        let response = search.search_detailed("python", 1, FusionMethod::Rrf);
        assert_eq!(response.results.len(), 1);
        // 4 docs, fetch = 2 per method
        assert_eq!(response.stats.bm25_candidates, 2);
        assert_eq!(response.stats.dense_candidates, 2);
        assert_eq!(response.stats.splade_candidates, 2);
        assert!(response.stats.fused_candidates >= 2);
        assert!(response.truncated);
        assert_eq!(response.fusion, FusionMethod::Rrf);
    }

    // ========================================
    // Metadata
    // ========================================

    #[test]
    fn test_search_with_metadata_filters() {
        let search = built();
        let mut filters = Metadata::new();
        filters.insert("file_type".into(), json!("python"));

        let results = search.search_with_metadata("programming", &filters, 10);
        assert!(!results.is_empty());
        assert!(results
            .iter()
            .all(|r| r.metadata.get("file_type") == Some(&json!("python"))));
    }

    #[test]
    fn test_search_with_metadata_no_match() {
        let search = built();
        let mut filters = Metadata::new();
        filters.insert("file_type".into(), json!("haskell"));
        assert!(search
            .search_with_metadata("programming", &filters, 10)
            .is_empty());
    }

    #[test]
    fn test_search_with_metadata_empty_filters() {
        let search = built();
        let results = search.search_with_metadata("python", &Metadata::new(), 2);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_hybrid_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<HybridSearch>();
    }
}
