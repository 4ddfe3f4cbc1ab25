//! Hybrid Search Performance Benchmarks
//!
//! Run with: cargo bench --bench hybrid_search
//!
//! Labels follow layer / variant / corpus size:
//! - build_index: all three indexes for small, medium, large corpora
//! - search_retriever: bm25, dense, splade individually
//! - search_hybrid: rrf, weighted, metadata-filtered
//! - rerank: cross encoder single-stage and two-stage pipeline

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fusionrank::{
    Document, FusionMethod, FusionRankConfig, HashEmbedder, HybridSearch, Metadata,
    RerankCandidate, RerankStrategy, Reranker, RetrievalPipeline, Retriever,
};
use serde_json::json;
use std::time::Duration;

// ============================================================================
// Constants and Utilities
// ============================================================================

/// Fixed seed for reproducible benchmarks
const BENCH_SEED: u64 = 0xDEADBEEF_CAFEBABE;

const WORDS: [&str; 16] = [
    "python", "rust", "javascript", "machine", "learning", "web", "browser", "systems",
    "programming", "language", "database", "index", "search", "vector", "fusion", "ranking",
];

const FILE_TYPES: [&str; 3] = ["python", "rust", "javascript"];

/// Simple LCG for deterministic pseudo-random content
fn lcg_next(state: &mut u64) -> u64 {
    *state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
    *state
}

/// Generate an embedded corpus of `count` documents, 8-24 words each
fn generate_corpus(count: usize) -> Vec<Document> {
    let mut state = BENCH_SEED;
    let docs = (0..count)
        .map(|i| {
            let len = 8 + (lcg_next(&mut state) % 17) as usize;
            let content: Vec<&str> = (0..len)
                .map(|_| WORDS[(lcg_next(&mut state) >> 33) as usize % WORDS.len()])
                .collect();
            Document::new(format!("doc_{}", i), content.join(" "))
                .with_metadata("file_type", FILE_TYPES[i % FILE_TYPES.len()])
        })
        .collect();
    HashEmbedder::default().embed_documents(docs)
}

fn built_search(count: usize) -> HybridSearch {
    let search = HybridSearch::default();
    search.build_index(generate_corpus(count)).unwrap();
    search
}

// ============================================================================
// Index Build
// ============================================================================

fn build_index_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_index");
    group.measurement_time(Duration::from_secs(5));
    group.sample_size(20);

    for doc_count in [100, 1_000, 10_000] {
        let corpus = generate_corpus(doc_count);
        group.throughput(Throughput::Elements(doc_count as u64));
        group.bench_with_input(
            BenchmarkId::new("hybrid", doc_count),
            &corpus,
            |b, corpus| {
                let search = HybridSearch::default();
                b.iter(|| search.build_index(corpus.clone()).unwrap());
            },
        );
    }

    group.finish();
}

// ============================================================================
// Per-retriever Search
// ============================================================================

fn search_retriever_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("search_retriever");
    group.measurement_time(Duration::from_secs(5));

    let search = built_search(1_000);

    group.bench_function("bm25", |b| {
        b.iter(|| search.lexical().search("python machine learning", 20))
    });
    group.bench_function("dense", |b| {
        b.iter(|| search.dense().search("python machine learning", 20))
    });
    group.bench_function("splade", |b| {
        b.iter(|| search.sparse().search("python machine learning", 20))
    });

    group.finish();
}

// ============================================================================
// Hybrid Search
// ============================================================================

fn search_hybrid_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("search_hybrid");
    group.measurement_time(Duration::from_secs(5));

    for doc_count in [1_000, 10_000] {
        let search = built_search(doc_count);
        group.throughput(Throughput::Elements(doc_count as u64));

        for fusion in [FusionMethod::Rrf, FusionMethod::Weighted] {
            group.bench_with_input(
                BenchmarkId::new(fusion.as_str(), doc_count),
                &fusion,
                |b, &fusion| b.iter(|| search.search("rust systems programming", 10, fusion)),
            );
        }

        let mut filters = Metadata::new();
        filters.insert("file_type".into(), json!("python"));
        group.bench_with_input(
            BenchmarkId::new("metadata_filtered", doc_count),
            &filters,
            |b, filters| b.iter(|| search.search_with_metadata("python web", filters, 10)),
        );
    }

    group.finish();
}

// ============================================================================
// Re-ranking
// ============================================================================

fn rerank_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("rerank");
    group.measurement_time(Duration::from_secs(5));

    let search = built_search(1_000);
    let candidates: Vec<RerankCandidate> = search
        .search("python machine learning", 50, FusionMethod::Rrf)
        .into_iter()
        .map(RerankCandidate::from)
        .collect();
    let reranker = Reranker::new();

    group.bench_function("cross_encoder/50", |b| {
        b.iter(|| {
            reranker.rerank(
                "python machine learning",
                &candidates,
                RerankStrategy::CrossEncoder,
                10,
            )
        })
    });
    group.bench_function("two_stage/50", |b| {
        b.iter(|| reranker.two_stage_reranking("python machine learning", &candidates, 20, 10))
    });

    let pipeline = RetrievalPipeline::from_config(FusionRankConfig::default()).unwrap();
    pipeline.build_index(generate_corpus(1_000)).unwrap();
    group.bench_function("pipeline/retrieve", |b| {
        b.iter(|| pipeline.retrieve("python machine learning", 10))
    });

    group.finish();
}

criterion_group!(
    benches,
    build_index_benchmarks,
    search_retriever_benchmarks,
    search_hybrid_benchmarks,
    rerank_benchmarks,
);
criterion_main!(benches);
