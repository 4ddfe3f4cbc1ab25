//! Reranker: strategy dispatch, fallback and two-stage pipelines

use super::{
    LexicalOverlapScorer, LlmRelevanceScorer, ProviderRelevanceScorer, RankedResult,
    RelevanceScorer, RerankCandidate, RerankStrategy,
};
use crate::llm_client::HttpChatClient;
use fusionrank_core::RerankConfig;
use std::sync::Arc;
use std::time::Instant;

/// Reorders candidates with a chosen strategy.
///
/// The cross encoder is always present; the LLM and provider scorers are
/// optional. `rerank` never fails: unavailable strategies degrade along
/// `RerankStrategy::fallback`.
#[derive(Clone)]
pub struct Reranker {
    cross_encoder: Arc<dyn RelevanceScorer>,
    llm: Option<Arc<dyn RelevanceScorer>>,
    provider: Option<Arc<dyn RelevanceScorer>>,
}

impl Default for Reranker {
    fn default() -> Self {
        Self::new()
    }
}

impl Reranker {
    /// Cross-encoder-only reranker using `LexicalOverlapScorer`
    pub fn new() -> Self {
        Reranker {
            cross_encoder: Arc::new(LexicalOverlapScorer::default()),
            llm: None,
            provider: None,
        }
    }

    /// Wire scorers from `[rerank]` configuration.
    ///
    /// The LLM and provider scorers are HTTP-backed; without the `rerank`
    /// feature they report `FeatureDisabled` and requests fall back.
    pub fn from_config(config: &RerankConfig) -> Self {
        let mut reranker = Reranker {
            cross_encoder: Arc::new(LexicalOverlapScorer::new(&config.cross_encoder_model)),
            llm: None,
            provider: None,
        };
        if let Some(llm) = &config.llm {
            let client = HttpChatClient::from_config(llm);
            reranker = reranker.with_llm(Arc::new(LlmRelevanceScorer::new(Arc::new(client))));
        }
        if let Some(provider) = &config.provider {
            reranker = reranker.with_provider(Arc::new(ProviderRelevanceScorer::from_config(provider)));
        }
        reranker
    }

    /// Replace the cross-encoder scorer
    pub fn with_cross_encoder(mut self, scorer: Arc<dyn RelevanceScorer>) -> Self {
        self.cross_encoder = scorer;
        self
    }

    /// Configure the LLM scorer
    pub fn with_llm(mut self, scorer: Arc<dyn RelevanceScorer>) -> Self {
        self.llm = Some(scorer);
        self
    }

    /// Configure the provider scorer
    pub fn with_provider(mut self, scorer: Arc<dyn RelevanceScorer>) -> Self {
        self.provider = Some(scorer);
        self
    }

    /// Whether `strategy` has a scorer behind it
    pub fn is_configured(&self, strategy: RerankStrategy) -> bool {
        self.scorer(strategy).is_some() || strategy == RerankStrategy::Passthrough
    }

    fn scorer(&self, strategy: RerankStrategy) -> Option<&Arc<dyn RelevanceScorer>> {
        match strategy {
            RerankStrategy::CrossEncoder => Some(&self.cross_encoder),
            RerankStrategy::Llm => self.llm.as_ref(),
            RerankStrategy::Provider => self.provider.as_ref(),
            RerankStrategy::Passthrough => None,
        }
    }

    /// Strategy used for the second stage of `two_stage_reranking`
    pub fn expensive_strategy(&self) -> RerankStrategy {
        if self.llm.is_some() {
            RerankStrategy::Llm
        } else if self.provider.is_some() {
            RerankStrategy::Provider
        } else {
            RerankStrategy::Llm
        }
    }

    // ========================================================================
    // Single-stage
    // ========================================================================

    /// Score every candidate with `strategy`, sort descending (ties keep
    /// input order), renumber from 1 and keep the first `top_k`.
    ///
    /// Non-finite scores, from a scorer or passed through, count as 0.0.
    pub fn rerank(
        &self,
        query: &str,
        candidates: &[RerankCandidate],
        strategy: RerankStrategy,
        top_k: usize,
    ) -> Vec<RankedResult> {
        if candidates.is_empty() || top_k == 0 {
            return Vec::new();
        }
        let start = Instant::now();

        let (used, scores) = self.score_with_fallback(query, candidates, strategy);

        let mut order: Vec<usize> = (0..candidates.len()).collect();
        order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

        let results: Vec<RankedResult> = order
            .into_iter()
            .take(top_k)
            .enumerate()
            .map(|(i, idx)| {
                let c = &candidates[idx];
                RankedResult {
                    doc_id: c.doc_id.clone(),
                    content: c.content.clone(),
                    metadata: c.metadata.clone(),
                    original_rank: c.rank,
                    original_score: c.score,
                    reranked_rank: (i + 1) as u32,
                    reranked_score: scores[idx],
                    strategy: used,
                }
            })
            .collect();

        tracing::debug!(
            target: "fusionrank::rerank",
            requested = %strategy,
            strategy = %used,
            candidates = candidates.len(),
            returned = results.len(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "Rerank complete"
        );

        results
    }

    /// Walk the fallback chain until a strategy yields one finite score
    /// per candidate.
    fn score_with_fallback(
        &self,
        query: &str,
        candidates: &[RerankCandidate],
        requested: RerankStrategy,
    ) -> (RerankStrategy, Vec<f32>) {
        let documents: Vec<&str> = candidates.iter().map(|c| c.content.as_str()).collect();
        let mut strategy = requested;

        loop {
            let outcome = match strategy {
                RerankStrategy::Passthrough => {
                    let scores = candidates.iter().map(|c| finite_or_zero(c.score)).collect();
                    return (strategy, scores);
                }
                _ => match self.scorer(strategy) {
                    None => Err("not configured".to_string()),
                    Some(scorer) => match scorer.score_batch(query, &documents) {
                        Ok(scores) if scores.len() == documents.len() => Ok(scores),
                        Ok(scores) => Err(format!(
                            "scorer '{}' returned {} scores for {} documents",
                            scorer.name(),
                            scores.len(),
                            documents.len()
                        )),
                        Err(e) => Err(e.to_string()),
                    },
                },
            };

            match outcome {
                Ok(scores) => {
                    let scores = scores.into_iter().map(finite_or_zero).collect();
                    return (strategy, scores);
                }
                Err(reason) => {
                    // Passthrough is terminal, so the chain always yields a strategy
                    let next = strategy.fallback().unwrap_or(RerankStrategy::Passthrough);
                    tracing::warn!(
                        target: "fusionrank::rerank",
                        strategy = %strategy,
                        fallback = %next,
                        reason = %reason,
                        "Rerank strategy unavailable, degrading"
                    );
                    strategy = next;
                }
            }
        }
    }

    // ========================================================================
    // Two-stage
    // ========================================================================

    /// Cheap cross encoder down to `stage1_top_k`, then the expensive
    /// strategy down to `min(stage2_top_k, stage1_top_k)`.
    ///
    /// `original_rank` and `original_score` in the output refer to the
    /// caller's `candidates`, not to the intermediate stage.
    pub fn two_stage_reranking(
        &self,
        query: &str,
        candidates: &[RerankCandidate],
        stage1_top_k: usize,
        stage2_top_k: usize,
    ) -> Vec<RankedResult> {
        let stage1 = self.rerank(query, candidates, RerankStrategy::CrossEncoder, stage1_top_k);
        if stage1.is_empty() {
            return stage1;
        }

        let intermediate: Vec<RerankCandidate> =
            stage1.iter().cloned().map(RerankCandidate::from).collect();
        let stage2_top_k = stage2_top_k.min(stage1_top_k);
        let mut stage2 = self.rerank(query, &intermediate, self.expensive_strategy(), stage2_top_k);

        // Stage-1 ranks are 1..=n, so each stage-2 original_rank indexes stage1
        for result in &mut stage2 {
            let source = (result.original_rank as usize)
                .checked_sub(1)
                .and_then(|i| stage1.get(i));
            if let Some(source) = source {
                result.original_rank = source.original_rank;
                result.original_score = source.original_score;
            }
        }

        tracing::debug!(
            target: "fusionrank::rerank",
            candidates = candidates.len(),
            stage1 = stage1.len(),
            stage2 = stage2.len(),
            "Two-stage rerank complete"
        );

        stage2
    }
}

/// Map NaN and infinite scores to 0.0, folding `-0.0` into `0.0`
fn finite_or_zero(score: f32) -> f32 {
    if score.is_finite() {
        score + 0.0
    } else {
        0.0
    }
}

impl std::fmt::Debug for Reranker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reranker")
            .field("cross_encoder", &self.cross_encoder.name())
            .field("llm", &self.llm.as_ref().map(|s| s.name().to_string()))
            .field("provider", &self.provider.as_ref().map(|s| s.name().to_string()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rerank::RerankError;

    /// Scores by content length
    struct LengthScorer;

    impl RelevanceScorer for LengthScorer {
        fn score(&self, _query: &str, document: &str) -> Result<f32, RerankError> {
            Ok(document.len() as f32)
        }
        fn name(&self) -> &str {
            "length"
        }
    }

    struct FailingScorer;

    impl RelevanceScorer for FailingScorer {
        fn score(&self, _query: &str, _document: &str) -> Result<f32, RerankError> {
            Err(RerankError::Network("connection refused".into()))
        }
        fn name(&self) -> &str {
            "failing"
        }
    }

    struct ShortScorer;

    impl RelevanceScorer for ShortScorer {
        fn score(&self, _query: &str, _document: &str) -> Result<f32, RerankError> {
            Ok(1.0)
        }
        fn score_batch(&self, _query: &str, _documents: &[&str]) -> Result<Vec<f32>, RerankError> {
            Ok(vec![1.0])
        }
        fn name(&self) -> &str {
            "short"
        }
    }

    fn candidates() -> Vec<RerankCandidate> {
        vec![
            RerankCandidate::new("a", "python programming language", 0.9, 1),
            RerankCandidate::new("b", "javascript web browser", 0.8, 2),
            RerankCandidate::new("c", "python machine learning", 0.7, 3),
        ]
    }

    #[test]
    fn test_cross_encoder_orders_by_overlap() {
        let reranker = Reranker::new();
        let out = reranker.rerank("python learning", &candidates(), RerankStrategy::CrossEncoder, 3);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].doc_id, "c");
        assert_eq!(out[0].original_rank, 3);
        assert_eq!(out[0].original_score, 0.7);
        assert_eq!(out[0].strategy, RerankStrategy::CrossEncoder);
        for (i, r) in out.iter().enumerate() {
            assert_eq!(r.reranked_rank, (i + 1) as u32);
        }
    }

    #[test]
    fn test_top_k_truncates() {
        let reranker = Reranker::new();
        let out = reranker.rerank("python", &candidates(), RerankStrategy::CrossEncoder, 1);
        assert_eq!(out.len(), 1);
        assert!(reranker
            .rerank("python", &candidates(), RerankStrategy::CrossEncoder, 0)
            .is_empty());
        assert!(reranker
            .rerank("python", &[], RerankStrategy::CrossEncoder, 5)
            .is_empty());
    }

    #[test]
    fn test_ties_keep_input_order() {
        let reranker = Reranker::new();
        let out = reranker.rerank("zzz", &candidates(), RerankStrategy::CrossEncoder, 3);
        let ids: Vec<_> = out.iter().map(|r| r.doc_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_unconfigured_llm_degrades_to_cross_encoder() {
        let reranker = Reranker::new();
        assert!(!reranker.is_configured(RerankStrategy::Llm));
        let out = reranker.rerank("python", &candidates(), RerankStrategy::Llm, 3);
        assert!(out.iter().all(|r| r.strategy == RerankStrategy::CrossEncoder));
    }

    #[test]
    fn test_failing_provider_degrades_to_cross_encoder() {
        let reranker = Reranker::new().with_provider(Arc::new(FailingScorer));
        let out = reranker.rerank("python", &candidates(), RerankStrategy::Provider, 3);
        assert_eq!(out[0].strategy, RerankStrategy::CrossEncoder);
    }

    #[test]
    fn test_failing_cross_encoder_degrades_to_passthrough() {
        let reranker = Reranker::new().with_cross_encoder(Arc::new(FailingScorer));
        let out = reranker.rerank("python", &candidates(), RerankStrategy::Llm, 3);
        let ids: Vec<_> = out.iter().map(|r| r.doc_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!(out.iter().all(|r| r.strategy == RerankStrategy::Passthrough));
        assert_eq!(out[0].reranked_score, 0.9);
    }

    #[test]
    fn test_wrong_score_count_degrades() {
        let reranker = Reranker::new().with_llm(Arc::new(ShortScorer));
        let out = reranker.rerank("python", &candidates(), RerankStrategy::Llm, 3);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].strategy, RerankStrategy::CrossEncoder);
    }

    #[test]
    fn test_passthrough_sorts_by_original_score() {
        let reranker = Reranker::new();
        let mut input = candidates();
        input.reverse();
        let out = reranker.rerank("q", &input, RerankStrategy::Passthrough, 3);
        assert_eq!(out[0].doc_id, "a");
        assert_eq!(out[0].original_rank, 1);
    }

    #[test]
    fn test_passthrough_non_finite_score_ranks_as_zero() {
        let input = vec![
            RerankCandidate::new("nan", "a", f32::NAN, 1),
            RerankCandidate::new("low", "b", 0.1, 2),
            RerankCandidate::new("neg", "c", -0.5, 3),
            RerankCandidate::new("inf", "d", f32::INFINITY, 4),
        ];
        let out = Reranker::new().rerank("q", &input, RerankStrategy::Passthrough, 4);
        let ids: Vec<_> = out.iter().map(|r| r.doc_id.as_str()).collect();
        assert_eq!(ids, vec!["low", "nan", "inf", "neg"]);
        assert!(out.iter().all(|r| r.reranked_score.is_finite()));
        assert!(out[1].original_score.is_nan());
    }

    #[test]
    fn test_two_stage_uses_llm_and_keeps_caller_provenance() {
        let reranker = Reranker::new().with_llm(Arc::new(LengthScorer));
        let out = reranker.two_stage_reranking("python", &candidates(), 2, 5);

        // Stage 1 keeps {a, c}; stage 2 is capped at stage1_top_k
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|r| r.strategy == RerankStrategy::Llm));
        // Longest content wins under LengthScorer
        assert_eq!(out[0].doc_id, "a");
        assert_eq!(out[0].original_rank, 1);
        assert_eq!(out[0].original_score, 0.9);
        assert_eq!(out[1].doc_id, "c");
        assert_eq!(out[1].original_rank, 3);
        assert_eq!(out[1].original_score, 0.7);
    }

    #[test]
    fn test_two_stage_without_expensive_scorer_degrades() {
        let reranker = Reranker::new();
        let out = reranker.two_stage_reranking("python", &candidates(), 3, 2);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|r| r.strategy == RerankStrategy::CrossEncoder));
    }

    #[test]
    fn test_expensive_strategy_prefers_llm() {
        assert_eq!(Reranker::new().expensive_strategy(), RerankStrategy::Llm);
        let provider_only = Reranker::new().with_provider(Arc::new(LengthScorer));
        assert_eq!(provider_only.expensive_strategy(), RerankStrategy::Provider);
        let both = provider_only.with_llm(Arc::new(LengthScorer));
        assert_eq!(both.expensive_strategy(), RerankStrategy::Llm);
    }

    #[test]
    fn test_from_config_wires_scorers() {
        let mut config = RerankConfig::default();
        let reranker = Reranker::from_config(&config);
        assert!(!reranker.is_configured(RerankStrategy::Llm));
        assert!(!reranker.is_configured(RerankStrategy::Provider));

        config.llm = Some(fusionrank_core::ModelConfig {
            endpoint: "http://localhost:1/v1".into(),
            model: "m".into(),
            api_key: None,
            timeout_ms: 10,
        });
        let reranker = Reranker::from_config(&config);
        assert!(reranker.is_configured(RerankStrategy::Llm));
        assert!(reranker.is_configured(RerankStrategy::CrossEncoder));
    }
}
