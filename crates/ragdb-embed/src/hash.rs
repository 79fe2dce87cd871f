use anyhow::Result;
use async_trait::async_trait;
use std::hash::{Hash, Hasher};
use twox_hash::XxHash64;

use ragdb_core::traits::Embedder;

/// Offline bag-of-words embedder: every lowercase word is hashed into one of
/// `dim` buckets and the result is L2-normalized. Deterministic across runs,
/// which makes it the embedder of choice for tests and air-gapped setups.
pub struct HashEmbedder { dim: usize, id: String }

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        let dim = dim.max(1);
        Self { dim, id: format!("hash:xxh64:d{dim}") }
    }

    pub fn dim(&self) -> usize { self.dim }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for token in text.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            let mut hasher = XxHash64::with_seed(0);
            token.to_lowercase().hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h % self.dim as u64) as usize;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += 0.5 + val;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 { for x in &mut v { *x /= norm; } }
        v
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn model_id(&self) -> &str { &self.id }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}
