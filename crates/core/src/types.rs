//! Document model
//!
//! A `Document` is the unit of retrieval. Documents are immutable once
//! submitted for indexing: every index works from a shared [`Corpus`]
//! snapshot and re-indexing means building a new snapshot.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Open key-value metadata attached to a document (author, file type, ...)
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Sparse term vector: vocabulary term id -> non-negative weight
pub type SparseVector = BTreeMap<u32, f32>;

/// Immutable document set shared by every index built from it
pub type Corpus = Arc<[Document]>;

/// A searchable document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Identity, unique within a corpus
    pub doc_id: String,
    /// Text content
    pub content: String,
    /// Arbitrary metadata used for filtering
    #[serde(default)]
    pub metadata: Metadata,
    /// Precomputed dense embedding
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    /// Precomputed sparse vector (overrides the index's own encoding)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sparse_vector: Option<SparseVector>,
}

impl Document {
    /// Create a document with id and content only
    pub fn new(doc_id: impl Into<String>, content: impl Into<String>) -> Self {
        Document {
            doc_id: doc_id.into(),
            content: content.into(),
            metadata: Metadata::new(),
            embedding: None,
            sparse_vector: None,
        }
    }

    /// Builder: add one metadata entry
    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Builder: attach a dense embedding
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Builder: attach a sparse vector
    pub fn with_sparse_vector(mut self, vector: SparseVector) -> Self {
        self.sparse_vector = Some(vector);
        self
    }

    /// Whether every `(key, value)` in `filters` is present with an equal value
    ///
    /// Equality only: no partial, prefix or range matching. An empty filter
    /// set matches every document.
    pub fn matches_filters(&self, filters: &Metadata) -> bool {
        metadata_matches(&self.metadata, filters)
    }
}

/// Exact-match metadata filter shared by documents and search results
///
/// Values compare with [`values_equal`], so a filter of `1` matches a
/// stored `1.0`.
pub fn metadata_matches(metadata: &Metadata, filters: &Metadata) -> bool {
    filters.iter().all(|(key, value)| {
        metadata
            .get(key)
            .is_some_and(|stored| values_equal(stored, value))
    })
}

/// JSON equality where numbers compare by numeric value
///
/// Two integers compare exactly; any pair involving a float compares as
/// `f64`. Arrays and objects compare element by element.
pub fn values_equal(a: &serde_json::Value, b: &serde_json::Value) -> bool {
    use serde_json::Value;
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if x.is_f64() || y.is_f64() {
                x.as_f64() == y.as_f64()
            } else {
                x == y
            }
        }
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| values_equal(x, y)))
        }
        _ => a == b,
    }
}

/// Freeze a document list into a shared corpus
///
/// # Errors
///
/// - `EmptyCorpus` if `documents` is empty
/// - `IndexBuild` if two documents share a `doc_id`
pub fn into_corpus(documents: Vec<Document>) -> Result<Corpus> {
    validate_documents(&documents)?;
    Ok(Arc::from(documents))
}

/// Check corpus-level invariants before any index is built
pub fn validate_documents(documents: &[Document]) -> Result<()> {
    if documents.is_empty() {
        return Err(Error::EmptyCorpus);
    }
    let mut seen = std::collections::HashSet::with_capacity(documents.len());
    for doc in documents {
        if !seen.insert(doc.doc_id.as_str()) {
            return Err(Error::index_build(format!(
                "duplicate doc_id '{}'",
                doc.doc_id
            )));
        }
    }
    Ok(())
}
