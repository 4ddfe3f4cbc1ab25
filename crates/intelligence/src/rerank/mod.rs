//! Re-ranking of fused search results
//!
//! This module provides post-fusion re-ranking: after hybrid search produces
//! top candidates, a relevance scorer rescores `(query, document)` pairs for
//! fine-grained ordering.
//!
//! # Architecture
//!
//! ```text
//! HybridSearch → fused top-N → RerankCandidate
//!     → cheap cross encoder (stage 1) → expensive LLM / provider (stage 2)
//!     → RankedResult
//! ```
//!
//! Strategies degrade instead of failing: an unconfigured or unreachable
//! scorer falls back to the cross encoder, and the cross encoder falls back
//! to the original fused order. `RankedResult::strategy` records what
//! actually ran.

pub mod error;
pub mod llm;
pub mod prompt;
pub mod provider;
pub mod reranker;
pub mod scorer;

pub use error::RerankError;
pub use llm::LlmRelevanceScorer;
pub use provider::ProviderRelevanceScorer;
pub use reranker::Reranker;
pub use scorer::{LexicalOverlapScorer, RelevanceScorer};

use fusionrank_core::{Error, Metadata, SearchResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A relevance score parsed from a model response.
#[derive(Debug, Clone)]
pub struct RerankScore {
    /// Index into the scored document list (0-based position)
    pub index: usize,
    /// Normalized relevance score in [0.0, 1.0]
    pub relevance_score: f32,
}

// ============================================================================
// RerankStrategy
// ============================================================================

/// Which scorer reorders the candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RerankStrategy {
    /// Cheap pairwise scorer, always available
    CrossEncoder,
    /// Chat model scoring a numbered batch
    Llm,
    /// Hosted `/rerank` API
    Provider,
    /// Keep the original order (by original score)
    Passthrough,
}

impl RerankStrategy {
    /// Stable string name
    pub fn as_str(&self) -> &'static str {
        match self {
            RerankStrategy::CrossEncoder => "cross_encoder",
            RerankStrategy::Llm => "llm",
            RerankStrategy::Provider => "provider",
            RerankStrategy::Passthrough => "passthrough",
        }
    }

    /// Strategy tried when this one is unavailable, `None` for passthrough
    pub fn fallback(&self) -> Option<RerankStrategy> {
        match self {
            RerankStrategy::Llm | RerankStrategy::Provider => Some(RerankStrategy::CrossEncoder),
            RerankStrategy::CrossEncoder => Some(RerankStrategy::Passthrough),
            RerankStrategy::Passthrough => None,
        }
    }
}

impl fmt::Display for RerankStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RerankStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s.to_ascii_lowercase().as_str() {
            "cross_encoder" | "cross-encoder" => Ok(RerankStrategy::CrossEncoder),
            "llm" | "llm_reranker" => Ok(RerankStrategy::Llm),
            "provider" | "cohere" | "cohere_rerank" => Ok(RerankStrategy::Provider),
            "passthrough" | "none" => Ok(RerankStrategy::Passthrough),
            other => Err(Error::invalid_input(format!(
                "unknown rerank strategy '{}'",
                other
            ))),
        }
    }
}

// ============================================================================
// Candidates and results
// ============================================================================

/// A document submitted for re-ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankCandidate {
    /// Document identity
    pub doc_id: String,
    /// Text the scorer reads
    pub content: String,
    /// Score from the previous stage
    pub score: f32,
    /// 1-based rank from the previous stage
    pub rank: u32,
    /// Document metadata, carried through untouched
    #[serde(default)]
    pub metadata: Metadata,
}

impl RerankCandidate {
    /// Create a candidate without metadata
    pub fn new(doc_id: impl Into<String>, content: impl Into<String>, score: f32, rank: u32) -> Self {
        RerankCandidate {
            doc_id: doc_id.into(),
            content: content.into(),
            score,
            rank,
            metadata: Metadata::new(),
        }
    }
}

impl From<SearchResult> for RerankCandidate {
    fn from(r: SearchResult) -> Self {
        RerankCandidate {
            doc_id: r.doc_id,
            content: r.content,
            score: r.score,
            rank: r.rank,
            metadata: r.metadata,
        }
    }
}

/// Feeds one stage's output into the next: the reranked score and rank
/// become the candidate's previous-stage values.
impl From<RankedResult> for RerankCandidate {
    fn from(r: RankedResult) -> Self {
        RerankCandidate {
            doc_id: r.doc_id,
            content: r.content,
            score: r.reranked_score,
            rank: r.reranked_rank,
            metadata: r.metadata,
        }
    }
}

/// A re-ranked document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    /// Document identity
    pub doc_id: String,
    /// Document content
    pub content: String,
    /// Document metadata
    #[serde(default)]
    pub metadata: Metadata,
    /// Rank in the caller's input list
    pub original_rank: u32,
    /// Score in the caller's input list
    pub original_score: f32,
    /// 1-based rank after re-ranking
    pub reranked_rank: u32,
    /// Score assigned by the strategy that ran
    pub reranked_score: f32,
    /// Strategy that actually produced `reranked_score`
    pub strategy: RerankStrategy,
}
