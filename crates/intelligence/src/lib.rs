//! Re-ranking layer for fusionrank
//!
//! This crate provides:
//! - RelevanceScorer trait for pluggable `(query, document)` scoring
//! - LexicalOverlapScorer, the offline cross-encoder stand-in
//! - LlmRelevanceScorer over a ChatCompletion capability
//! - ProviderRelevanceScorer for hosted `/rerank` APIs
//! - Reranker with strategy fallback and two-stage re-ranking
//!
//! HTTP transports are behind the `rerank` cargo feature.
//!
//! # Usage
//!
//! ```
//! use fusionrank_intelligence::{RerankCandidate, RerankStrategy, Reranker};
//!
//! let candidates = vec![
//!     RerankCandidate::new("d1", "python programming language", 0.03, 1),
//!     RerankCandidate::new("d3", "python machine learning", 0.02, 2),
//! ];
//! let reranked = Reranker::new().rerank(
//!     "machine learning",
//!     &candidates,
//!     RerankStrategy::CrossEncoder,
//!     2,
//! );
//! assert_eq!(reranked[0].doc_id, "d3");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod llm_client;
pub mod rerank;

// Re-export commonly used types
pub use llm_client::{ChatCompletion, HttpChatClient};
pub use rerank::{
    LexicalOverlapScorer, LlmRelevanceScorer, ProviderRelevanceScorer, RankedResult,
    RelevanceScorer, RerankCandidate, RerankError, RerankStrategy, Reranker,
};
