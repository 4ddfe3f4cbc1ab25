//! fusionrank - hybrid retrieval with rank fusion and re-ranking
//!
//! fusionrank indexes one corpus three ways (BM25, dense embeddings and a
//! learned sparse representation), fuses the three rankings with Reciprocal
//! Rank Fusion or a weighted sum, and optionally re-ranks the fused list
//! with a cheap cross encoder followed by an LLM or hosted provider.
//!
//! # Quick Start
//!
//! ```
//! use fusionrank::{Document, FusionRankConfig, HashEmbedder, RetrievalPipeline};
//!
//! let pipeline = RetrievalPipeline::from_config(FusionRankConfig::default()).unwrap();
//! let docs = HashEmbedder::default().embed_documents(vec![
//!     Document::new("d1", "python programming language"),
//!     Document::new("d2", "javascript web browser"),
//!     Document::new("d3", "python machine learning"),
//! ]);
//! pipeline.build_index(docs).unwrap();
//!
//! let results = pipeline.retrieve("python machine learning", 2);
//! assert_eq!(results[0].doc_id, "d3");
//! ```
//!
//! # Architecture
//!
//! - [`fusionrank_core`]: documents, result types, errors and configuration
//! - [`fusionrank_search`]: the three indexes, fusion and `HybridSearch`
//! - [`fusionrank_intelligence`]: relevance scorers and the `Reranker`
//!
//! [`RetrievalPipeline`] wires them together.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod pipeline;

pub use fusionrank_core::*;
pub use fusionrank_intelligence::{
    ChatCompletion, HttpChatClient, LexicalOverlapScorer, LlmRelevanceScorer,
    ProviderRelevanceScorer, RankedResult, RelevanceScorer, RerankCandidate, RerankError,
    RerankStrategy, Reranker,
};
pub use fusionrank_search::{
    cosine_similarity, dynamic_alpha_adjustment, tokenize, tokenize_unique, Bm25Scorer,
    DenseIndex, Embedder, FusedResult, Fuser, HashEmbedder, HybridSearch, LexicalIndex,
    LogTfEncoder, Retriever, RrfFuser, SparseEncoder, SparseLearnedIndex, WeightedFuser,
};
pub use pipeline::RetrievalPipeline;
