//! Hosted rerank provider (`/rerank` endpoint)
//!
//! Request: `{model, query, documents, top_n}`.
//! Response: `{results: [{index, relevance_score}, ...]}`.
//!
//! Without an API key the provider refuses to serve and the reranker falls
//! back to the cross encoder.

use super::{RelevanceScorer, RerankError};
use crate::llm_client::post_json;
use fusionrank_core::ProviderConfig;
use std::time::Duration;

/// Scorer backed by a hosted `/rerank` API.
#[derive(Debug, Clone)]
pub struct ProviderRelevanceScorer {
    url: String,
    model: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl ProviderRelevanceScorer {
    /// Create a provider scorer.
    ///
    /// `endpoint` is the API base URL; `/rerank` is appended automatically.
    pub fn new(endpoint: &str, model: &str, api_key: Option<&str>, timeout_ms: u64) -> Self {
        let base = endpoint.trim_end_matches('/');
        ProviderRelevanceScorer {
            url: format!("{}/rerank", base),
            model: model.to_string(),
            api_key: api_key.map(|s| s.to_string()),
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    /// Create a provider scorer from a `[rerank.provider]` config section.
    pub fn from_config(config: &ProviderConfig) -> Self {
        Self::new(
            &config.endpoint,
            &config.model,
            config.api_key.as_deref(),
            config.timeout_ms,
        )
    }

    /// Full request URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Whether an API key is configured
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Map a provider response onto one score per document.
///
/// Entries with an out-of-range index or a non-numeric score are skipped;
/// documents the provider did not return score 0.
pub fn parse_provider_response(
    json: &serde_json::Value,
    document_count: usize,
) -> Result<Vec<f32>, RerankError> {
    let results = json
        .get("results")
        .and_then(|r| r.as_array())
        .ok_or_else(|| RerankError::Parse("response has no 'results' array".to_string()))?;

    let mut scores = vec![0.0; document_count];
    for entry in results {
        let index = entry.get("index").and_then(|i| i.as_u64());
        let score = entry.get("relevance_score").and_then(|s| s.as_f64());
        if let (Some(index), Some(score)) = (index, score) {
            let index = index as usize;
            if index < document_count && score.is_finite() {
                scores[index] = score as f32;
            }
        }
    }
    Ok(scores)
}

impl RelevanceScorer for ProviderRelevanceScorer {
    fn score(&self, query: &str, document: &str) -> Result<f32, RerankError> {
        let scores = self.score_batch(query, &[document])?;
        Ok(scores.first().copied().unwrap_or(0.0))
    }

    fn score_batch(&self, query: &str, documents: &[&str]) -> Result<Vec<f32>, RerankError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(RerankError::unavailable(
                "provider",
                "no API key configured",
            ));
        };
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let body = serde_json::json!({
            "model": self.model,
            "query": query,
            "documents": documents,
            "top_n": documents.len(),
        });
        let json = post_json(&self.url, Some(api_key), self.timeout, &body)?;
        parse_provider_response(&json, documents.len())
    }

    fn name(&self) -> &str {
        &self.model
    }
}
