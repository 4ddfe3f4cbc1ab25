//! Configuration via `fusionrank.toml`
//!
//! Every field has a default, so an empty file (or no file at all) yields
//! the stock BM25 parameters, RRF with k = 60, the default alpha heuristics
//! and a cross-encoder-only reranker.

use crate::error::{Error, Result};
use crate::search_types::{FusionMethod, FusionWeights, ScoreNormalization};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Config file name
pub const CONFIG_FILE_NAME: &str = "fusionrank.toml";

// ============================================================================
// Search configuration
// ============================================================================

/// BM25 parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bm25Config {
    /// Term-frequency saturation
    pub k1: f32,
    /// Length-normalization strength, in [0, 1]
    pub b: f32,
}

impl Default for Bm25Config {
    fn default() -> Self {
        Bm25Config { k1: 1.5, b: 0.75 }
    }
}

/// Fusion parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// RRF smoothing constant
    pub rrf_k: u32,
    /// Each index returns `top_k * overfetch_factor` candidates
    pub overfetch_factor: usize,
    /// `search_with_metadata` asks for `top_k * metadata_overfetch_factor`
    pub metadata_overfetch_factor: usize,
    /// Fusion used when the caller does not choose one
    pub default_method: FusionMethod,
    /// Per-method normalization before weighted fusion
    pub normalization: ScoreNormalization,
}

impl Default for FusionConfig {
    fn default() -> Self {
        FusionConfig {
            rrf_k: 60,
            overfetch_factor: 2,
            metadata_overfetch_factor: 3,
            default_method: FusionMethod::Rrf,
            normalization: ScoreNormalization::None,
        }
    }
}

/// Query-shape heuristics for choosing fusion weights
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlphaConfig {
    /// Weights for mid-length queries
    pub default: FusionWeights,
    /// Weights for queries of at most `short_max_words` words
    pub short: FusionWeights,
    /// Weights for queries of at least `long_min_words` words
    pub long: FusionWeights,
    /// Upper bound (inclusive) for a short query
    pub short_max_words: usize,
    /// Lower bound (inclusive) for a long query
    pub long_min_words: usize,
    /// Fraction of capitalized words that marks a named-entity query
    pub proper_noun_ratio: f32,
    /// Weight moved from dense to bm25 for named-entity queries
    pub proper_noun_shift: f32,
}

impl Default for AlphaConfig {
    fn default() -> Self {
        AlphaConfig {
            default: FusionWeights::new(0.3, 0.4, 0.3),
            short: FusionWeights::new(0.4, 0.2, 0.4),
            long: FusionWeights::new(0.2, 0.5, 0.3),
            short_max_words: 3,
            long_min_words: 10,
            proper_noun_ratio: 0.5,
            proper_noun_shift: 0.1,
        }
    }
}

/// Everything the hybrid search coordinator needs
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// BM25 parameters
    pub bm25: Bm25Config,
    /// Fusion parameters
    pub fusion: FusionConfig,
    /// Dynamic weighting heuristics
    pub alpha: AlphaConfig,
}

impl SearchConfig {
    /// Check parameter ranges
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if !(self.bm25.k1.is_finite() && self.bm25.k1 >= 0.0) {
            return Err(Error::config(format!("bm25.k1 must be >= 0, got {}", self.bm25.k1)));
        }
        if !(0.0..=1.0).contains(&self.bm25.b) {
            return Err(Error::config(format!(
                "bm25.b must be within [0, 1], got {}",
                self.bm25.b
            )));
        }
        if self.fusion.overfetch_factor == 0 || self.fusion.metadata_overfetch_factor == 0 {
            return Err(Error::config("fusion overfetch factors must be >= 1"));
        }
        for (name, weights) in [
            ("alpha.default", self.alpha.default),
            ("alpha.short", self.alpha.short),
            ("alpha.long", self.alpha.long),
        ] {
            if !weights.is_valid() {
                return Err(Error::config(format!(
                    "{} weights must be finite and non-negative",
                    name
                )));
            }
        }
        if !(self.alpha.proper_noun_shift.is_finite() && self.alpha.proper_noun_shift >= 0.0) {
            return Err(Error::config(format!(
                "alpha.proper_noun_shift must be >= 0, got {}",
                self.alpha.proper_noun_shift
            )));
        }
        if !(0.0..=1.0).contains(&self.alpha.proper_noun_ratio) {
            return Err(Error::config(format!(
                "alpha.proper_noun_ratio must be within [0, 1], got {}",
                self.alpha.proper_noun_ratio
            )));
        }
        if self.alpha.short_max_words >= self.alpha.long_min_words {
            return Err(Error::config(
                "alpha.short_max_words must be below alpha.long_min_words",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Rerank configuration
// ============================================================================

/// An OpenAI-compatible chat completions endpoint used for LLM reranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// API base URL (e.g. "http://localhost:11434/v1")
    pub endpoint: String,
    /// Model name
    pub model: String,
    /// Optional bearer token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// A hosted rerank endpoint (Cohere-style `/rerank`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API base URL (e.g. "https://api.cohere.com/v1")
    pub endpoint: String,
    /// Rerank model name
    #[serde(default = "default_provider_model")]
    pub model: String,
    /// API key; without one the provider strategy falls back
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_provider_model() -> String {
    "rerank-english-v2.0".to_string()
}

/// Reranker wiring and two-stage sizes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankConfig {
    /// Label of the cross-encoder model (reported in logs)
    pub cross_encoder_model: String,
    /// LLM endpoint for the expensive stage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm: Option<ModelConfig>,
    /// Hosted rerank provider
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderConfig>,
    /// Candidates kept by the cheap first stage
    pub stage1_top_k: usize,
    /// Candidates kept by the expensive second stage
    pub stage2_top_k: usize,
    /// Pipeline fetches `top_k * candidate_factor` fused results to rerank
    pub candidate_factor: usize,
}

impl Default for RerankConfig {
    fn default() -> Self {
        RerankConfig {
            cross_encoder_model: "ms-marco-MiniLM-L-6-v2".to_string(),
            llm: None,
            provider: None,
            stage1_top_k: 50,
            stage2_top_k: 10,
            candidate_factor: 5,
        }
    }
}

impl RerankConfig {
    /// Check stage sizes
    pub fn validate(&self) -> Result<()> {
        if self.stage1_top_k == 0 || self.stage2_top_k == 0 {
            return Err(Error::config("rerank stage sizes must be >= 1"));
        }
        if self.stage2_top_k > self.stage1_top_k {
            return Err(Error::config(format!(
                "rerank.stage2_top_k ({}) must not exceed rerank.stage1_top_k ({})",
                self.stage2_top_k, self.stage1_top_k
            )));
        }
        if self.candidate_factor == 0 {
            return Err(Error::config("rerank.candidate_factor must be >= 1"));
        }
        Ok(())
    }
}

// ============================================================================
// Top-level configuration
// ============================================================================

/// Configuration loaded from `fusionrank.toml`
///
/// # Example
///
/// ```toml
/// [search.bm25]
/// k1 = 1.5
/// b = 0.75
///
/// [search.fusion]
/// rrf_k = 60
/// default_method = "rrf"
///
/// [rerank]
/// stage1_top_k = 50
/// stage2_top_k = 10
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionRankConfig {
    /// Hybrid search settings
    pub search: SearchConfig,
    /// Reranker settings
    pub rerank: RerankConfig,
}

impl FusionRankConfig {
    /// Validate both sections
    pub fn validate(&self) -> Result<()> {
        self.search.validate()?;
        self.rerank.validate()
    }

    /// Parse and validate config from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: FusionRankConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# fusionrank configuration

[search.bm25]
# Term-frequency saturation and length normalization
k1 = 1.5
b = 0.75

[search.fusion]
# Reciprocal Rank Fusion constant
rrf_k = 60
# Each index returns top_k * overfetch_factor candidates before fusion
overfetch_factor = 2
# Metadata-filtered search fetches top_k * metadata_overfetch_factor
metadata_overfetch_factor = 3
# "rrf" or "weighted"
default_method = "rrf"
# Normalization before weighted fusion: "none", "min_max" or "z_score"
normalization = "none"

[rerank]
cross_encoder_model = "ms-marco-MiniLM-L-6-v2"
stage1_top_k = 50
stage2_top_k = 10
candidate_factor = 5

# LLM reranking (expensive second stage). Uncomment to enable.
# [rerank.llm]
# endpoint = "http://localhost:11434/v1"
# model = "qwen3:1.7b"
# api_key = "your-api-key"      # optional
# timeout_ms = 5000              # optional, default 5000

# Hosted rerank provider. Falls back to the cross encoder without a key.
# [rerank.provider]
# endpoint = "https://api.cohere.com/v1"
# model = "rerank-english-v2.0"
# api_key = "your-api-key"
"#
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content).map_err(|e| match e {
            Error::Config(msg) => Error::config(format!(
                "failed to load '{}': {}",
                path.display(),
                msg
            )),
            other => other,
        })
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml())?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::config(format!("failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
