use async_trait::async_trait;
use std::path::Path;

/// Maps text to fixed-length vectors. Implementations must return vectors of
/// one constant dimension and be deterministic enough for distance comparison.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Stable identifier of the model behind this embedder.
    fn model_id(&self) -> &str;

    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector"))
    }
}

/// Turns a file into plain text. Returns an empty string when the file
/// cannot be read; callers skip such files.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> String;
}

/// A candidate as shown to a reranking oracle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleCandidate {
    pub id: usize,
    pub content: String,
}

/// External relevance judge. Returns candidate ids ordered by decreasing
/// relevance; the output is validated by the caller, so out-of-range or
/// repeated ids are allowed here.
#[async_trait]
pub trait RerankOracle: Send + Sync {
    async fn rank(&self, query: &str, candidates: &[OracleCandidate], k: usize) -> anyhow::Result<Vec<i64>>;
}
