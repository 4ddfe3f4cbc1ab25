//! Core types for fusionrank
//!
//! This crate defines the foundational types shared by the search and
//! intelligence crates:
//! - Document / Corpus: the unit of retrieval and the immutable set of them
//! - Metadata / SparseVector: open key-value metadata and term-id weights
//! - SearchResult / SearchMethod: ranked hits and the method that produced them
//! - FusionWeights / FusionMethod / ScoreNormalization: fusion strategy
//! - HybridResponse / SearchStats: execution details for one query
//! - FusionRankConfig: `fusionrank.toml` configuration
//! - Error: error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod search_types;
pub mod types;

pub use config::{
    AlphaConfig, Bm25Config, FusionConfig, FusionRankConfig, ModelConfig, ProviderConfig,
    RerankConfig, SearchConfig, CONFIG_FILE_NAME,
};
pub use error::{Error, Result};
pub use search_types::{
    FusionMethod, FusionWeights, HybridResponse, ScoreNormalization, SearchMethod, SearchResult,
    SearchStats,
};
pub use types::{
    into_corpus, metadata_matches, validate_documents, values_equal, Corpus, Document, Metadata,
    SparseVector,
};
