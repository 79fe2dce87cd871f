//! Rank-based fusion of the vector and BM25 result lists.
//!
//! Only list positions are used: distances and BM25 scores live on different
//! scales and are never compared.

use std::collections::HashMap;

use ragdb_core::config::{FusionKind, RagConfig};
use ragdb_core::types::{Document, RankedResult};

pub const DEFAULT_RRF_K: f64 = 60.0;

/// A document after fusion. Ranks are 1-based; `None` means the document was
/// absent from that list.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedResult {
    pub document: Document,
    pub score: f64,
    pub vector_rank: Option<usize>,
    pub text_rank: Option<usize>,
}

pub trait FusionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Merge two rank-ordered lists into one, best first.
    fn fuse(&self, vector: &[RankedResult], text: &[RankedResult]) -> Vec<FusedResult>;
}

/// `rrf(d) = 1/(k + rank_vector(d)) + 1/(k + rank_text(d))`
#[derive(Debug, Clone, Copy)]
pub struct ReciprocalRankFusion {
    pub k: f64,
}

impl Default for ReciprocalRankFusion {
    fn default() -> Self { Self { k: DEFAULT_RRF_K } }
}

impl FusionStrategy for ReciprocalRankFusion {
    fn name(&self) -> &'static str { "rrf" }

    fn fuse(&self, vector: &[RankedResult], text: &[RankedResult]) -> Vec<FusedResult> {
        weighted_rank_fusion(vector, text, self.k, 1.0, 1.0)
    }
}

/// Weighted variant: each list's reciprocal rank is scaled by its weight.
#[derive(Debug, Clone, Copy)]
pub struct WeightedRankFusion {
    pub k: f64,
    pub vector_weight: f64,
    pub text_weight: f64,
}

impl Default for WeightedRankFusion {
    fn default() -> Self { Self { k: DEFAULT_RRF_K, vector_weight: 0.5, text_weight: 0.5 } }
}

impl FusionStrategy for WeightedRankFusion {
    fn name(&self) -> &'static str { "weighted" }

    fn fuse(&self, vector: &[RankedResult], text: &[RankedResult]) -> Vec<FusedResult> {
        weighted_rank_fusion(vector, text, self.k, self.vector_weight, self.text_weight)
    }
}

pub fn from_config(config: &RagConfig) -> Box<dyn FusionStrategy> {
    match config.fusion {
        FusionKind::Rrf => Box::new(ReciprocalRankFusion { k: config.rrf_k }),
        FusionKind::Weighted => Box::new(WeightedRankFusion {
            k: config.rrf_k,
            vector_weight: config.vector_weight,
            text_weight: config.text_weight,
        }),
    }
}

fn weighted_rank_fusion(
    vector: &[RankedResult],
    text: &[RankedResult],
    k: f64,
    vector_weight: f64,
    text_weight: f64,
) -> Vec<FusedResult> {
    let mut fused: Vec<FusedResult> = Vec::new();
    let mut by_id: HashMap<&str, usize> = HashMap::new();

    let lists = [(vector, true), (text, false)];
    for (list, is_vector) in lists {
        for (position, hit) in list.iter().enumerate() {
            let rank = position + 1;
            let slot = *by_id.entry(hit.document.id.as_str()).or_insert_with(|| {
                fused.push(FusedResult { document: hit.document.clone(), score: 0.0, vector_rank: None, text_rank: None });
                fused.len() - 1
            });
            let entry = &mut fused[slot];
            // a repeated id keeps its best (first) rank
            let rank_slot = if is_vector { &mut entry.vector_rank } else { &mut entry.text_rank };
            if rank_slot.is_none() { *rank_slot = Some(rank); }
        }
    }

    let reciprocal = |rank: Option<usize>, weight: f64| rank.map_or(0.0, |r| weight / (k + r as f64));
    for entry in &mut fused {
        entry.score = reciprocal(entry.vector_rank, vector_weight) + reciprocal(entry.text_rank, text_weight);
    }
    fused.retain(|entry| entry.score > 0.0);
    fused.sort_by(|a, b| b.score.total_cmp(&a.score));
    fused
}
