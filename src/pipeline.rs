//! End-to-end retrieval: hybrid search followed by two-stage re-ranking

use fusionrank_core::{Document, FusionRankConfig, Result};
use fusionrank_intelligence::{RankedResult, RerankCandidate, Reranker};
use fusionrank_search::{Embedder, HashEmbedder, HybridSearch};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Hybrid search plus re-ranking under one configuration
#[derive(Debug)]
pub struct RetrievalPipeline {
    search: HybridSearch,
    reranker: Reranker,
    config: FusionRankConfig,
}

impl RetrievalPipeline {
    /// Create a pipeline with a query embedder for the dense index
    ///
    /// # Errors
    ///
    /// `Config` if `config` fails validation.
    pub fn new(config: FusionRankConfig, embedder: Arc<dyn Embedder>) -> Result<Self> {
        config.validate()?;
        Ok(RetrievalPipeline {
            search: HybridSearch::new(config.search, embedder),
            reranker: Reranker::from_config(&config.rerank),
            config,
        })
    }

    /// Create a pipeline using the default `HashEmbedder`
    pub fn from_config(config: FusionRankConfig) -> Result<Self> {
        Self::new(config, Arc::new(HashEmbedder::default()))
    }

    /// Create a pipeline from a `fusionrank.toml` file
    pub fn from_file(path: &Path) -> Result<Self> {
        Self::from_config(FusionRankConfig::from_file(path)?)
    }

    /// Builder: replace the reranker
    pub fn with_reranker(mut self, reranker: Reranker) -> Self {
        self.reranker = reranker;
        self
    }

    /// Hybrid search coordinator
    pub fn search(&self) -> &HybridSearch {
        &self.search
    }

    /// Reranker
    pub fn reranker(&self) -> &Reranker {
        &self.reranker
    }

    /// Active configuration
    pub fn config(&self) -> &FusionRankConfig {
        &self.config
    }

    /// Index `documents`; see [`HybridSearch::build_index`]
    pub fn build_index(&self, documents: Vec<Document>) -> Result<()> {
        self.search.build_index(documents)
    }

    /// Retrieve the `top_k` most relevant documents for `query`
    ///
    /// Fetches `top_k × candidate_factor` fused results with the configured
    /// default fusion, then re-ranks them in two stages: the cross encoder
    /// keeps `max(stage1_top_k, top_k)` and the expensive strategy keeps
    /// `top_k`.
    pub fn retrieve(&self, query: &str, top_k: usize) -> Vec<RankedResult> {
        if top_k == 0 {
            return Vec::new();
        }
        let start = Instant::now();
        let rerank = &self.config.rerank;

        let fetch = top_k.saturating_mul(rerank.candidate_factor);
        let candidates: Vec<RerankCandidate> = self
            .search
            .search(query, fetch, self.config.search.fusion.default_method)
            .into_iter()
            .map(RerankCandidate::from)
            .collect();

        let stage1 = rerank.stage1_top_k.max(top_k);
        let results = self
            .reranker
            .two_stage_reranking(query, &candidates, stage1, top_k);

        tracing::debug!(
            target: "fusionrank::pipeline",
            candidates = candidates.len(),
            returned = results.len(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "Retrieval complete"
        );

        results
    }
}
