//! Relevance scorers
//!
//! A `RelevanceScorer` rates how well a document answers a query. The
//! reranker holds one scorer per strategy and never inspects what is behind
//! it, so a hosted cross-encoder, a local model or a test double all plug in
//! the same way.

use super::RerankError;
use std::collections::HashSet;

/// Default cross-encoder model label
pub const DEFAULT_CROSS_ENCODER_MODEL: &str = "ms-marco-MiniLM-L-6-v2";

/// Capability that scores `(query, document)` pairs.
///
/// Higher is more relevant. Scores are only compared within one call, so
/// no particular scale is required.
pub trait RelevanceScorer: Send + Sync {
    /// Score one document against the query.
    fn score(&self, query: &str, document: &str) -> Result<f32, RerankError>;

    /// Score many documents against the query, one score per document in
    /// input order.
    ///
    /// The default scores each document independently. Remote scorers
    /// override it to make a single round-trip.
    fn score_batch(&self, query: &str, documents: &[&str]) -> Result<Vec<f32>, RerankError> {
        documents.iter().map(|d| self.score(query, d)).collect()
    }

    /// Scorer label, reported in logs.
    fn name(&self) -> &str;
}

// ============================================================================
// LexicalOverlapScorer
// ============================================================================

/// Cross-encoder stand-in: Jaccard overlap of lowercase whitespace words.
///
/// `|Q ∩ D| / |Q ∪ D|`, 0 when both sides are empty. Deterministic and
/// offline, so the cross-encoder strategy is always available.
#[derive(Debug, Clone)]
pub struct LexicalOverlapScorer {
    model: String,
}

impl LexicalOverlapScorer {
    /// Create a scorer reporting the given model label
    pub fn new(model: impl Into<String>) -> Self {
        LexicalOverlapScorer {
            model: model.into(),
        }
    }
}

impl Default for LexicalOverlapScorer {
    fn default() -> Self {
        Self::new(DEFAULT_CROSS_ENCODER_MODEL)
    }
}

/// Jaccard similarity of the lowercase whitespace-separated word sets.
pub fn jaccard_overlap(query: &str, document: &str) -> f32 {
    let query_lower = query.to_lowercase();
    let document_lower = document.to_lowercase();
    let q: HashSet<&str> = query_lower.split_whitespace().collect();
    let d: HashSet<&str> = document_lower.split_whitespace().collect();

    let union = q.union(&d).count();
    if union == 0 {
        return 0.0;
    }
    q.intersection(&d).count() as f32 / union as f32
}

impl RelevanceScorer for LexicalOverlapScorer {
    fn score(&self, query: &str, document: &str) -> Result<f32, RerankError> {
        Ok(jaccard_overlap(query, document))
    }

    fn name(&self) -> &str {
        &self.model
    }
}
