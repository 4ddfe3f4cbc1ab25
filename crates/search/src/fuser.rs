//! Fusion infrastructure for combining per-method rankings
//!
//! This module provides:
//! - Fuser trait for pluggable fusion algorithms
//! - RrfFuser: Reciprocal Rank Fusion (default)
//! - WeightedFuser: weighted sum of per-method scores
//! - min_max_normalize / z_score_normalize: optional per-list scaling
//!
//! Both fusers are deterministic: documents with equal fused scores keep
//! the order in which they first appeared across the input lists.

use crate::retriever::finite_or_zero;
use fusionrank_core::search_types::{
    FusionWeights, ScoreNormalization, SearchMethod, SearchResult,
};
use std::collections::HashMap;

// ============================================================================
// FusedResult
// ============================================================================

/// Result of fusing several ranked lists
#[derive(Debug, Clone, PartialEq)]
pub struct FusedResult {
    /// Final ranked list, ranks 1..=n
    pub results: Vec<SearchResult>,
    /// Distinct documents seen across all inputs
    pub candidates: usize,
    /// Whether candidates were dropped to honour `k`
    pub truncated: bool,
}

// ============================================================================
// Fuser Trait
// ============================================================================

/// Pluggable fusion interface
///
/// Takes `(method, results)` pairs and returns a combined ranked list
/// truncated to `k` items.
///
/// # Thread Safety
///
/// Fusers must be Send + Sync for concurrent search operations.
pub trait Fuser: Send + Sync {
    /// Fuse the per-method lists
    fn fuse(
        &self,
        lists: &[(SearchMethod, Vec<SearchResult>)],
        weights: &FusionWeights,
        k: usize,
    ) -> FusedResult;

    /// Method tag carried by fused results
    fn output_method(&self) -> SearchMethod;

    /// Name for debugging and logging
    fn name(&self) -> &str;
}

// ============================================================================
// Shared helpers
// ============================================================================

/// Accumulates fused scores keyed by doc id, remembering first appearance
#[derive(Default)]
struct Accumulator {
    entries: Vec<(SearchResult, f32)>,
    index: HashMap<String, usize>,
}

impl Accumulator {
    fn add(&mut self, hit: &SearchResult, contribution: f32) {
        let contribution = finite_or_zero(contribution);
        match self.index.get(&hit.doc_id) {
            Some(&i) => self.entries[i].1 += contribution,
            None => {
                self.index.insert(hit.doc_id.clone(), self.entries.len());
                self.entries.push((hit.clone(), contribution));
            }
        }
    }

    /// Stable sort by fused score, truncate to `k`, re-rank and re-tag
    ///
    /// Non-finite contributions and sums count as 0.0.
    fn finish(self, k: usize, method: SearchMethod) -> FusedResult {
        let mut entries = self.entries;
        for entry in &mut entries {
            entry.1 = finite_or_zero(entry.1);
        }
        entries.sort_by(|a, b| b.1.total_cmp(&a.1));

        let candidates = entries.len();
        let results = entries
            .into_iter()
            .take(k)
            .enumerate()
            .map(|(i, (mut hit, score))| {
                hit.score = score;
                hit.rank = (i + 1) as u32;
                hit.method = method;
                hit
            })
            .collect::<Vec<_>>();

        FusedResult {
            truncated: candidates > results.len(),
            candidates,
            results,
        }
    }
}

// ============================================================================
// RrfFuser
// ============================================================================

/// Reciprocal Rank Fusion (RRF)
///
/// RRF Score = sum(1 / (k + rank)) across all lists
/// Where k is a smoothing constant (default 60). Weights are ignored.
///
/// # Example
///
/// ```text
/// Given:
///   - List A: [doc1@rank1, doc2@rank2, doc3@rank3]
///   - List B: [doc2@rank1, doc4@rank2, doc1@rank3]
///   - k_rrf = 60
///
/// RRF scores:
///   doc1: 1/(60+1) + 1/(60+3) = 0.0164 + 0.0159 = 0.0323
///   doc2: 1/(60+2) + 1/(60+1) = 0.0161 + 0.0164 = 0.0325  <- highest
///   doc3: 1/(60+3) = 0.0159
///   doc4: 1/(60+2) = 0.0161
///
/// Final ranking: [doc2, doc1, doc4, doc3]
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RrfFuser {
    k_rrf: u32,
}

impl Default for RrfFuser {
    fn default() -> Self {
        RrfFuser { k_rrf: 60 }
    }
}

impl RrfFuser {
    /// Create a new RrfFuser with custom k value
    pub fn new(k_rrf: u32) -> Self {
        RrfFuser { k_rrf }
    }

    /// Get the k parameter
    pub fn k_rrf(&self) -> u32 {
        self.k_rrf
    }
}

impl Fuser for RrfFuser {
    fn fuse(
        &self,
        lists: &[(SearchMethod, Vec<SearchResult>)],
        _weights: &FusionWeights,
        k: usize,
    ) -> FusedResult {
        let mut acc = Accumulator::default();
        for (_method, results) in lists {
            for hit in results {
                acc.add(hit, 1.0 / (self.k_rrf as f32 + hit.rank as f32));
            }
        }
        acc.finish(k, self.output_method())
    }

    fn output_method(&self) -> SearchMethod {
        SearchMethod::Hybrid
    }

    fn name(&self) -> &str {
        "rrf"
    }
}

// ============================================================================
// WeightedFuser
// ============================================================================

/// Weighted score fusion
///
/// score(d) = sum(weight[method] * score_method(d)); absent lists
/// contribute 0. With `ScoreNormalization::None` raw scores are mixed on
/// their native scales (BM25 is unbounded, cosine is in [-1, 1]).
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedFuser {
    normalization: ScoreNormalization,
}

impl WeightedFuser {
    /// Create a weighted fuser applying `normalization` to each list first
    pub fn new(normalization: ScoreNormalization) -> Self {
        WeightedFuser { normalization }
    }

    /// Per-list normalization in effect
    pub fn normalization(&self) -> ScoreNormalization {
        self.normalization
    }
}

impl Fuser for WeightedFuser {
    fn fuse(
        &self,
        lists: &[(SearchMethod, Vec<SearchResult>)],
        weights: &FusionWeights,
        k: usize,
    ) -> FusedResult {
        let mut acc = Accumulator::default();
        for (method, results) in lists {
            let weight = weights.get(*method);
            let mut scores: Vec<f32> = results.iter().map(|r| r.score).collect();
            normalize_in_place(&mut scores, self.normalization);
            for (hit, score) in results.iter().zip(scores) {
                acc.add(hit, weight * score);
            }
        }
        acc.finish(k, self.output_method())
    }

    fn output_method(&self) -> SearchMethod {
        SearchMethod::HybridWeighted
    }

    fn name(&self) -> &str {
        "weighted"
    }
}

// ============================================================================
// Normalization
// ============================================================================

const NON_FINITE_FALLBACK: f32 = 0.0;
const DEGENERATE_VALUE: f32 = 0.5;
const Z_SCORE_CLIP_SIGMAS: f32 = 3.0;
const NUMERIC_EPSILON: f32 = 1e-10;

/// Apply `method` to `scores` in place
pub fn normalize_in_place(scores: &mut [f32], method: ScoreNormalization) {
    match method {
        ScoreNormalization::None => {}
        ScoreNormalization::MinMax => min_max_normalize(scores),
        ScoreNormalization::ZScore => z_score_normalize(scores),
    }
}

/// In-place min-max normalization into [0, 1]
///
/// Non-finite values map to 0.0. If every finite value is the same they
/// all map to 0.5.
pub fn min_max_normalize(scores: &mut [f32]) {
    let finite = scores.iter().copied().filter(|v| v.is_finite());
    let (min, max) = finite.fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if min > max {
        scores.fill(NON_FINITE_FALLBACK);
        return;
    }

    let range = max - min;
    for score in scores.iter_mut() {
        *score = if !score.is_finite() {
            NON_FINITE_FALLBACK
        } else if range <= NUMERIC_EPSILON {
            DEGENERATE_VALUE
        } else {
            ((*score - min) / range).clamp(0.0, 1.0)
        };
    }
}

/// In-place z-score normalization mapped into [0, 1]
///
/// z-scores are clipped to ±3σ and mapped by `(z + 3) / 6`. Non-finite
/// values map to 0.0; zero variance maps every finite value to 0.5.
pub fn z_score_normalize(scores: &mut [f32]) {
    let mut count = 0.0_f32;
    let mut mean = 0.0_f32;
    let mut m2 = 0.0_f32;

    // Welford running variance
    for &value in scores.iter() {
        if value.is_finite() {
            count += 1.0;
            let delta = value - mean;
            mean += delta / count;
            m2 += delta * (value - mean);
        }
    }

    if count == 0.0 {
        scores.fill(NON_FINITE_FALLBACK);
        return;
    }

    let std_dev = (m2 / count).sqrt();
    for score in scores.iter_mut() {
        *score = if !score.is_finite() {
            NON_FINITE_FALLBACK
        } else if std_dev <= NUMERIC_EPSILON {
            DEGENERATE_VALUE
        } else {
            let z = ((*score - mean) / std_dev).clamp(-Z_SCORE_CLIP_SIGMAS, Z_SCORE_CLIP_SIGMAS);
            (z + Z_SCORE_CLIP_SIGMAS) / (2.0 * Z_SCORE_CLIP_SIGMAS)
        };
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use fusionrank_core::types::Metadata;

    fn hit(doc_id: &str, score: f32, rank: u32, method: SearchMethod) -> SearchResult {
        SearchResult {
            doc_id: doc_id.to_string(),
            score,
            rank,
            content: format!("content of {}", doc_id),
            metadata: Metadata::new(),
            method,
        }
    }

    fn list(method: SearchMethod, ids: &[&str]) -> (SearchMethod, Vec<SearchResult>) {
        let hits = ids
            .iter()
            .enumerate()
            .map(|(i, id)| hit(id, 1.0 - i as f32 * 0.1, (i + 1) as u32, method))
            .collect();
        (method, hits)
    }

    fn ids(result: &FusedResult) -> Vec<&str> {
        result.results.iter().map(|r| r.doc_id.as_str()).collect()
    }

    #[test]
    fn test_rrf_empty() {
        let result = RrfFuser::default().fuse(&[], &FusionWeights::default(), 10);
        assert!(result.results.is_empty());
        assert!(!result.truncated);
    }

    #[test]
    fn test_rrf_documented_example() {
        let lists = vec![
            list(SearchMethod::Bm25, &["doc1", "doc2", "doc3"]),
            list(SearchMethod::Dense, &["doc2", "doc4", "doc1"]),
        ];
        let result = RrfFuser::default().fuse(&lists, &FusionWeights::default(), 10);
        assert_eq!(ids(&result), vec!["doc2", "doc1", "doc4", "doc3"]);
    }

    #[test]
    fn test_rrf_three_way_first_beats_single_first() {
        let lists = vec![
            list(SearchMethod::Bm25, &["a", "b"]),
            list(SearchMethod::Dense, &["a"]),
            list(SearchMethod::Splade, &["a"]),
        ];
        let result = RrfFuser::default().fuse(&lists, &FusionWeights::default(), 10);
        assert_eq!(result.results[0].doc_id, "a");
        assert!((result.results[0].score - 3.0 / 61.0).abs() < 1e-6);
        assert!((result.results[1].score - 1.0 / 62.0).abs() < 1e-6);
    }

    #[test]
    fn test_rrf_ties_keep_first_appearance() {
        let lists = vec![
            list(SearchMethod::Bm25, &["x"]),
            list(SearchMethod::Dense, &["y"]),
            list(SearchMethod::Splade, &["z"]),
        ];
        let result = RrfFuser::default().fuse(&lists, &FusionWeights::default(), 10);
        assert_eq!(ids(&result), vec!["x", "y", "z"]);
    }

    #[test]
    fn test_rrf_reranks_and_tags() {
        let lists = vec![list(SearchMethod::Bm25, &["a", "b", "c"])];
        let result = RrfFuser::default().fuse(&lists, &FusionWeights::default(), 2);
        assert_eq!(result.results.len(), 2);
        assert!(result.truncated);
        assert_eq!(result.candidates, 3);
        assert_eq!(result.results[1].rank, 2);
        assert!(result
            .results
            .iter()
            .all(|r| r.method == SearchMethod::Hybrid));
        assert_eq!(result.results[0].content, "content of a");
    }

    #[test]
    fn test_rrf_custom_k() {
        let lists = vec![list(SearchMethod::Bm25, &["a"])];
        let result = RrfFuser::new(10).fuse(&lists, &FusionWeights::default(), 1);
        assert!((result.results[0].score - 1.0 / 11.0).abs() < 1e-6);
    }

    #[test]
    fn test_weighted_sums_raw_scores() {
        let lists = vec![
            (
                SearchMethod::Bm25,
                vec![hit("a", 4.0, 1, SearchMethod::Bm25), hit("b", 2.0, 2, SearchMethod::Bm25)],
            ),
            (SearchMethod::Dense, vec![hit("b", 0.9, 1, SearchMethod::Dense)]),
        ];
        let weights = FusionWeights::new(0.5, 1.0, 0.0);
        let result = WeightedFuser::default().fuse(&lists, &weights, 10);

        // a: 0.5*4 = 2.0, b: 0.5*2 + 1.0*0.9 = 1.9
        assert_eq!(ids(&result), vec!["a", "b"]);
        assert!((result.results[0].score - 2.0).abs() < 1e-6);
        assert!((result.results[1].score - 1.9).abs() < 1e-6);
        assert!(result
            .results
            .iter()
            .all(|r| r.method == SearchMethod::HybridWeighted));
    }

    #[test]
    fn test_weighted_non_finite_score_contributes_zero() {
        let lists = vec![
            (
                SearchMethod::Bm25,
                vec![
                    hit("a", f32::NAN, 1, SearchMethod::Bm25),
                    hit("b", 1.0, 2, SearchMethod::Bm25),
                    hit("c", f32::NEG_INFINITY, 3, SearchMethod::Bm25),
                ],
            ),
            (SearchMethod::Dense, vec![hit("a", 0.5, 1, SearchMethod::Dense)]),
        ];
        let weights = FusionWeights::new(1.0, 1.0, 0.0);
        let result = WeightedFuser::default().fuse(&lists, &weights, 10);

        // a keeps its dense contribution; c ties at 0 behind both
        assert_eq!(ids(&result), vec!["b", "a", "c"]);
        assert!((result.results[1].score - 0.5).abs() < 1e-6);
        assert_eq!(result.results[2].score, 0.0);
        assert!(result.results.iter().all(|r| r.score.is_finite()));
    }

    #[test]
    fn test_weighted_min_max_changes_balance() {
        let lists = vec![
            (
                SearchMethod::Bm25,
                vec![hit("a", 10.0, 1, SearchMethod::Bm25), hit("b", 0.0, 2, SearchMethod::Bm25)],
            ),
            (
                SearchMethod::Dense,
                vec![hit("b", 0.9, 1, SearchMethod::Dense), hit("a", 0.1, 2, SearchMethod::Dense)],
            ),
        ];
        let weights = FusionWeights::new(0.3, 0.4, 0.3);

        let raw = WeightedFuser::default().fuse(&lists, &weights, 10);
        assert_eq!(raw.results[0].doc_id, "a");

        // After min-max both lists span [0, 1]; dense has the larger weight
        let normalized = WeightedFuser::new(ScoreNormalization::MinMax).fuse(&lists, &weights, 10);
        assert_eq!(normalized.results[0].doc_id, "b");
    }

    #[test]
    fn test_fusion_idempotent() {
        let lists = vec![
            list(SearchMethod::Bm25, &["a", "b", "c"]),
            list(SearchMethod::Dense, &["c", "a"]),
            list(SearchMethod::Splade, &["b", "d"]),
        ];
        let weights = FusionWeights::default();
        for fuser in [&RrfFuser::default() as &dyn Fuser, &WeightedFuser::default()] {
            let first = fuser.fuse(&lists, &weights, 10);
            let second = fuser.fuse(&lists, &weights, 10);
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_min_max_normalize() {
        let mut scores = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        min_max_normalize(&mut scores);
        assert_eq!(scores, vec![0.0, 0.25, 0.5, 0.75, 1.0]);

        let mut flat = vec![3.0, 3.0];
        min_max_normalize(&mut flat);
        assert_eq!(flat, vec![0.5, 0.5]);

        let mut odd = vec![5.0, f32::NAN, 10.0];
        min_max_normalize(&mut odd);
        assert_eq!(odd, vec![0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_z_score_normalize() {
        let mut scores = vec![-1.0, 0.0, 1.0];
        z_score_normalize(&mut scores);
        let mean = scores.iter().sum::<f32>() / 3.0;
        assert!((mean - 0.5).abs() < 1e-6);
        assert!(scores[0] < scores[1] && scores[1] < scores[2]);

        let mut flat = vec![42.0, 42.0];
        z_score_normalize(&mut flat);
        assert_eq!(flat, vec![0.5, 0.5]);
    }

    #[test]
    fn test_fuser_names() {
        assert_eq!(RrfFuser::default().name(), "rrf");
        assert_eq!(WeightedFuser::default().name(), "weighted");
    }

    #[test]
    fn test_fuser_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RrfFuser>();
        assert_send_sync::<WeightedFuser>();
    }
}
