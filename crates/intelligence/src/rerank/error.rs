//! Error types for re-ranking

use thiserror::Error;

/// Errors that can occur while scoring candidates
///
/// Every variant is recoverable: the reranker answers any of them by
/// falling back to a cheaper strategy.
#[derive(Debug, Error)]
pub enum RerankError {
    /// HTTP request failed (network unreachable, connection refused, etc.)
    #[error("network error: {0}")]
    Network(String),

    /// Failed to parse the model or provider response into scores
    #[error("parse error: {0}")]
    Parse(String),

    /// Model request timed out
    #[error("rerank request timed out")]
    Timeout,

    /// Required cargo feature is not enabled
    #[error("feature '{0}' not enabled")]
    FeatureDisabled(&'static str),

    /// Strategy is not configured or its provider refuses to serve
    #[error("{tool} unavailable: {reason}")]
    Unavailable {
        /// Strategy or provider name
        tool: String,
        /// Why it cannot be used
        reason: String,
    },
}

impl RerankError {
    /// Build an `Unavailable` error
    pub fn unavailable(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        RerankError::Unavailable {
            tool: tool.into(),
            reason: reason.into(),
        }
    }
}

impl From<RerankError> for fusionrank_core::Error {
    fn from(e: RerankError) -> Self {
        match e {
            RerankError::Unavailable { tool, reason } => {
                fusionrank_core::Error::unavailable(tool, reason)
            }
            other => fusionrank_core::Error::unavailable("rerank", other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(RerankError::Timeout.to_string(), "rerank request timed out");
        assert_eq!(
            RerankError::FeatureDisabled("rerank").to_string(),
            "feature 'rerank' not enabled"
        );
        assert!(RerankError::unavailable("provider", "no api key")
            .to_string()
            .contains("no api key"));
    }

    #[test]
    fn test_into_core_error_is_unavailable_tool() {
        let core: fusionrank_core::Error = RerankError::Network("refused".into()).into();
        assert!(matches!(core, fusionrank_core::Error::UnavailableTool { .. }));
        assert!(core.is_non_fatal());

        let core: fusionrank_core::Error = RerankError::unavailable("llm", "not configured").into();
        match core {
            fusionrank_core::Error::UnavailableTool { tool, .. } => assert_eq!(tool, "llm"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
