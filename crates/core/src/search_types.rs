//! Core search types
//!
//! This module defines the result and fusion types shared by every index
//! and by the fusion layer:
//! - SearchMethod: which index or fusion produced a result
//! - SearchResult: one ranked hit
//! - FusionWeights: per-method multipliers for weighted fusion
//! - FusionMethod / ScoreNormalization: fusion strategy selection
//! - SearchStats / HybridResponse: execution details for one query
//!
//! # Invariant
//!
//! Scores are method-specific. A BM25 score and a cosine score are NOT
//! comparable until they have been fused.

use crate::error::{Error, Result};
use crate::types::Metadata;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// SearchMethod
// ============================================================================

/// Tag identifying the retrieval method (or fusion) behind a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMethod {
    /// Lexical BM25
    Bm25,
    /// Dense embedding cosine similarity
    Dense,
    /// Learned sparse dot product
    Splade,
    /// Reciprocal Rank Fusion output
    Hybrid,
    /// Weighted score fusion output
    HybridWeighted,
}

impl SearchMethod {
    /// The three per-index methods, in fusion order
    pub const RETRIEVERS: [SearchMethod; 3] =
        [SearchMethod::Bm25, SearchMethod::Dense, SearchMethod::Splade];

    /// Stable string name
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMethod::Bm25 => "bm25",
            SearchMethod::Dense => "dense",
            SearchMethod::Splade => "splade",
            SearchMethod::Hybrid => "hybrid",
            SearchMethod::HybridWeighted => "hybrid_weighted",
        }
    }

    /// Whether this tag names a fused list rather than a single index
    pub fn is_fused(&self) -> bool {
        matches!(self, SearchMethod::Hybrid | SearchMethod::HybridWeighted)
    }
}

impl fmt::Display for SearchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "bm25" => Ok(SearchMethod::Bm25),
            "dense" => Ok(SearchMethod::Dense),
            "splade" => Ok(SearchMethod::Splade),
            "hybrid" => Ok(SearchMethod::Hybrid),
            "hybrid_weighted" => Ok(SearchMethod::HybridWeighted),
            other => Err(Error::invalid_input(format!(
                "unknown search method '{}'",
                other
            ))),
        }
    }
}

// ============================================================================
// SearchResult
// ============================================================================

/// A single ranked hit
///
/// `doc_id` refers back into the corpus; `content` and `metadata` are
/// denormalized copies so callers do not need the corpus to render results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Document identity
    pub doc_id: String,
    /// Method-specific score (higher = more relevant)
    pub score: f32,
    /// 1-based position within the producing list
    pub rank: u32,
    /// Document content
    pub content: String,
    /// Document metadata
    #[serde(default)]
    pub metadata: Metadata,
    /// Index or fusion that produced this result
    pub method: SearchMethod,
}

// ============================================================================
// FusionWeights
// ============================================================================

/// Per-method weights for weighted fusion
///
/// Weights are multiplicative and need not sum to 1. RRF ignores them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionWeights {
    /// Weight of the BM25 list
    pub bm25: f32,
    /// Weight of the dense list
    pub dense: f32,
    /// Weight of the sparse learned list
    pub splade: f32,
}

impl Default for FusionWeights {
    fn default() -> Self {
        FusionWeights::new(0.3, 0.4, 0.3)
    }
}

impl FusionWeights {
    /// Create weights for (bm25, dense, splade)
    pub const fn new(bm25: f32, dense: f32, splade: f32) -> Self {
        FusionWeights {
            bm25,
            dense,
            splade,
        }
    }

    /// Weight for a retrieval method; fused tags weigh 0
    pub fn get(&self, method: SearchMethod) -> f32 {
        match method {
            SearchMethod::Bm25 => self.bm25,
            SearchMethod::Dense => self.dense,
            SearchMethod::Splade => self.splade,
            SearchMethod::Hybrid | SearchMethod::HybridWeighted => 0.0,
        }
    }

    /// Sum of all three weights
    pub fn total(&self) -> f32 {
        self.bm25 + self.dense + self.splade
    }

    /// Whether every weight is finite and non-negative
    pub fn is_valid(&self) -> bool {
        [self.bm25, self.dense, self.splade]
            .iter()
            .all(|w| w.is_finite() && *w >= 0.0)
    }
}

// ============================================================================
// FusionMethod
// ============================================================================

/// How per-method rankings are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionMethod {
    /// Reciprocal Rank Fusion (rank based, ignores weights)
    #[default]
    Rrf,
    /// Weighted sum of raw per-method scores
    Weighted,
}

impl FusionMethod {
    /// Stable string name
    pub fn as_str(&self) -> &'static str {
        match self {
            FusionMethod::Rrf => "rrf",
            FusionMethod::Weighted => "weighted",
        }
    }

    /// Method tag carried by results of this fusion
    pub fn output_method(&self) -> SearchMethod {
        match self {
            FusionMethod::Rrf => SearchMethod::Hybrid,
            FusionMethod::Weighted => SearchMethod::HybridWeighted,
        }
    }
}

impl fmt::Display for FusionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FusionMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "rrf" => Ok(FusionMethod::Rrf),
            "weighted" => Ok(FusionMethod::Weighted),
            other => Err(Error::invalid_input(format!(
                "unknown fusion method '{}', expected \"rrf\" or \"weighted\"",
                other
            ))),
        }
    }
}

/// Per-method score normalization applied before weighted fusion
///
/// Raw BM25, cosine and sparse dot-product scores live on different
/// scales. `None` keeps them as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreNormalization {
    /// Use raw scores
    #[default]
    None,
    /// Min-max scale each list into [0, 1]
    MinMax,
    /// Z-score each list, clip to ±3σ and map into [0, 1]
    ZScore,
}

// ============================================================================
// SearchStats / HybridResponse
// ============================================================================

/// Execution statistics for one hybrid query
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchStats {
    /// Wall time spent in search + fusion (microseconds)
    pub elapsed_micros: u64,
    /// Results returned by the BM25 index
    pub bm25_candidates: usize,
    /// Results returned by the dense index
    pub dense_candidates: usize,
    /// Results returned by the sparse index
    pub splade_candidates: usize,
    /// Distinct documents after fusion, before truncation
    pub fused_candidates: usize,
}

impl SearchStats {
    /// Candidate count for one retrieval method
    pub fn candidates(&self, method: SearchMethod) -> usize {
        match method {
            SearchMethod::Bm25 => self.bm25_candidates,
            SearchMethod::Dense => self.dense_candidates,
            SearchMethod::Splade => self.splade_candidates,
            SearchMethod::Hybrid | SearchMethod::HybridWeighted => self.fused_candidates,
        }
    }
}

/// Detailed response of a hybrid query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HybridResponse {
    /// Final ranked results (length <= requested top_k)
    pub results: Vec<SearchResult>,
    /// Weights chosen for this query
    pub weights: FusionWeights,
    /// Fusion that produced `results`
    pub fusion: FusionMethod,
    /// Whether more fused candidates existed than were returned
    pub truncated: bool,
    /// Execution statistics
    pub stats: SearchStats,
}
