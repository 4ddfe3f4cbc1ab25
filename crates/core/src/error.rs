//! Error types for fusionrank
//!
//! This module defines the error taxonomy shared by the index, fusion and
//! rerank layers. We use `thiserror` for automatic `Display` and `Error`
//! trait implementations.
//!
//! # Propagation
//!
//! Corpus-level and configuration-level failures (`EmptyCorpus`,
//! `IndexBuild`, `Config`) propagate to the caller. Per-document anomalies
//! (`MalformedVector`) and provider outages (`UnavailableTool`) are
//! isolated: the search or rerank that hit them still returns results.

use std::io;
use thiserror::Error;

/// Result type alias for fusionrank operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for fusionrank
#[derive(Debug, Error)]
pub enum Error {
    /// Index build was called with zero documents
    ///
    /// The previously published snapshot (if any) stays in place.
    #[error("cannot build an index from an empty corpus")]
    EmptyCorpus,

    /// Unrecoverable build-time failure; nothing was published
    #[error("index build failed: {0}")]
    IndexBuild(String),

    /// A single document's embedding or sparse vector is unusable
    ///
    /// Non-fatal: the affected document scores 0 for that method.
    #[error("malformed vector for document '{doc_id}': {reason}")]
    MalformedVector {
        /// Document that carried the vector
        doc_id: String,
        /// What was wrong with it
        reason: String,
    },

    /// An external scoring provider is unreachable or unconfigured
    #[error("tool '{tool}' unavailable: {reason}")]
    UnavailableTool {
        /// Name of the strategy or provider
        tool: String,
        /// Why it could not be used
        reason: String,
    },

    /// Invalid argument (unknown method name, bad parameter)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Configuration could not be parsed or failed validation
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error (reading or writing configuration files)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Build an `IndexBuild` error
    pub fn index_build(msg: impl Into<String>) -> Self {
        Error::IndexBuild(msg.into())
    }

    /// Build a `MalformedVector` error
    pub fn malformed_vector(doc_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::MalformedVector {
            doc_id: doc_id.into(),
            reason: reason.into(),
        }
    }

    /// Build an `UnavailableTool` error
    pub fn unavailable(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::UnavailableTool {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    /// Build an `InvalidInput` error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Build a `Config` error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Whether the error is isolated to one document or provider
    ///
    /// Non-fatal errors are logged and absorbed by search and rerank.
    pub fn is_non_fatal(&self) -> bool {
        matches!(
            self,
            Error::MalformedVector { .. } | Error::UnavailableTool { .. }
        )
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_empty_corpus() {
        let msg = Error::EmptyCorpus.to_string();
        assert!(msg.contains("empty corpus"));
    }

    #[test]
    fn test_error_display_index_build() {
        let err = Error::index_build("duplicate doc_id 'd1'");
        let msg = err.to_string();
        assert!(msg.contains("index build failed"));
        assert!(msg.contains("d1"));
    }

    #[test]
    fn test_error_display_malformed_vector() {
        let err = Error::malformed_vector("doc7", "dimension 3 != 4");
        let msg = err.to_string();
        assert!(msg.contains("doc7"));
        assert!(msg.contains("dimension 3 != 4"));
    }

    #[test]
    fn test_error_display_unavailable() {
        let err = Error::unavailable("provider", "no api key");
        let msg = err.to_string();
        assert!(msg.contains("provider"));
        assert!(msg.contains("no api key"));
    }

    #[test]
    fn test_error_from_io() {
        let err: Error = io::Error::new(io::ErrorKind::NotFound, "missing").into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_error_from_toml() {
        let parsed: std::result::Result<toml::Value, _> = toml::from_str("= broken");
        let err: Error = parsed.unwrap_err().into();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_non_fatal_classification() {
        assert!(Error::malformed_vector("d", "r").is_non_fatal());
        assert!(Error::unavailable("t", "r").is_non_fatal());
        assert!(!Error::EmptyCorpus.is_non_fatal());
        assert!(!Error::index_build("x").is_non_fatal());
    }
}
