//! Hybrid retrieval: vector and BM25 search fused by rank, optionally
//! reranked by an LLM oracle, persisted as a JSON manifest.

pub mod fusion;
pub mod manifest;
pub mod oracle;
pub mod pipeline;
pub mod registry;
pub mod rerank;

pub use fusion::{FusedResult, FusionStrategy, ReciprocalRankFusion, WeightedRankFusion};
pub use oracle::OllamaOracle;
pub use pipeline::{PipelineComponents, RetrievalPipeline};
pub use registry::PipelineRegistry;
pub use rerank::RerankStage;
