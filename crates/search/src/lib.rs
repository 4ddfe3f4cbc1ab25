//! Hybrid retrieval for fusionrank
//!
//! This crate provides:
//! - Tokenizer shared by the lexical and sparse indexes
//! - Retriever trait and atomically swapped index snapshots
//! - LexicalIndex: BM25 over tokenized content
//! - DenseIndex: cosine similarity over precomputed embeddings
//! - SparseLearnedIndex: sparse dot product over a corpus vocabulary
//! - Fuser trait with RRF and weighted fusion
//! - HybridSearch: parallel three-way search, fusion and metadata filtering
//!
//! # Usage
//!
//! ```
//! use fusionrank_core::{Document, FusionMethod};
//! use fusionrank_search::{HashEmbedder, HybridSearch};
//!
//! let embedder = HashEmbedder::default();
//! let docs = embedder.embed_documents(vec![
//!     Document::new("d1", "python programming language"),
//!     Document::new("d2", "javascript web browser"),
//! ]);
//!
//! let search = HybridSearch::default();
//! search.build_index(docs).unwrap();
//! let results = search.search("python", 1, FusionMethod::Rrf);
//! assert_eq!(results[0].doc_id, "d1");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dense;
pub mod fuser;
pub mod hybrid;
pub mod lexical;
pub mod retriever;
pub mod sparse;
pub mod tokenizer;

// Re-export commonly used types
pub use dense::{cosine_similarity, DenseIndex, Embedder, HashEmbedder};
pub use fuser::{FusedResult, Fuser, RrfFuser, WeightedFuser};
pub use hybrid::{dynamic_alpha_adjustment, HybridSearch};
pub use lexical::{Bm25Scorer, CorpusStats, LexicalIndex, Scorer};
pub use retriever::{Retriever, SnapshotCell};
pub use sparse::{LogTfEncoder, SparseEncoder, SparseLearnedIndex, Vocabulary};
pub use tokenizer::{tokenize, tokenize_unique};
