//! LLM-backed relevance scoring
//!
//! Sends a single batch prompt with the query and numbered document
//! previews, asks the model to score each document 0-10, and normalizes the
//! parsed scores to [0.0, 1.0]. One round-trip per batch, retried once.

use super::prompt::build_rerank_messages;
use super::{RelevanceScorer, RerankError, RerankScore};
use crate::llm_client::{retry_once, ChatCompletion};
use std::sync::Arc;

/// Scorer that asks a chat model to rate documents.
pub struct LlmRelevanceScorer {
    client: Arc<dyn ChatCompletion>,
}

impl LlmRelevanceScorer {
    /// Wrap a chat completion capability
    pub fn new(client: Arc<dyn ChatCompletion>) -> Self {
        LlmRelevanceScorer { client }
    }
}

/// Parse the model's response text into rerank scores.
///
/// Expects lines like "1: 8" or "2: 5.5". 1-based line numbers map to
/// document indices; numbers outside `1..=document_count` and unparsable
/// lines are skipped. Scores are clamped to 0-10 and divided by 10.
pub fn parse_rerank_response(text: &str, document_count: usize) -> Vec<RerankScore> {
    let mut scores = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some((num_part, score_part)) = line.split_once(':') {
            if let (Ok(line_num), Ok(raw_score)) = (
                num_part.trim().parse::<usize>(),
                score_part.trim().parse::<f32>(),
            ) {
                if line_num >= 1 && line_num <= document_count && raw_score.is_finite() {
                    scores.push(RerankScore {
                        index: line_num - 1,
                        relevance_score: raw_score.clamp(0.0, 10.0) / 10.0,
                    });
                }
            }
        }
    }

    scores
}

impl RelevanceScorer for LlmRelevanceScorer {
    fn score(&self, query: &str, document: &str) -> Result<f32, RerankError> {
        let scores = self.score_batch(query, &[document])?;
        Ok(scores.first().copied().unwrap_or(0.0))
    }

    /// Documents the model leaves unscored get 0.0.
    fn score_batch(&self, query: &str, documents: &[&str]) -> Result<Vec<f32>, RerankError> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let messages = build_rerank_messages(query, documents);
        let parsed = retry_once(
            || self.client.complete(&messages),
            |text| parse_rerank_response(text, documents.len()),
            |scores| scores.is_empty(),
            || RerankError::Parse("model returned no valid scores after retry".to_string()),
            "rerank",
        )?;

        let mut out = vec![0.0; documents.len()];
        for s in parsed {
            out[s.index] = s.relevance_score;
        }
        Ok(out)
    }

    fn name(&self) -> &str {
        self.client.model()
    }
}
