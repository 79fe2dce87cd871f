use std::sync::Arc;
use std::time::Duration;

use ragdb_core::traits::{OracleCandidate, RerankOracle};
use ragdb_core::types::Document;
use tracing::{debug, warn};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_CHARS: usize = 500;

/// Narrows fused candidates down to `k` with an optional relevance oracle.
///
/// The stage never fails: without an oracle, or when the oracle errors, times
/// out or returns nothing usable, the first `k` candidates are kept as they
/// came in.
#[derive(Clone)]
pub struct RerankStage {
    oracle: Option<Arc<dyn RerankOracle>>,
    timeout: Duration,
    max_chars: usize,
}

impl Default for RerankStage {
    fn default() -> Self { Self::new(None) }
}

impl RerankStage {
    pub fn new(oracle: Option<Arc<dyn RerankOracle>>) -> Self {
        Self { oracle, timeout: DEFAULT_TIMEOUT, max_chars: DEFAULT_MAX_CHARS }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    pub async fn rerank(&self, query: &str, candidates: Vec<Document>, k: usize) -> Vec<Document> {
        if candidates.len() <= k {
            return candidates;
        }
        let Some(oracle) = &self.oracle else {
            return first_k(candidates, k);
        };

        let shown: Vec<OracleCandidate> = candidates
            .iter()
            .enumerate()
            .map(|(id, doc)| OracleCandidate { id, content: truncate_chars(&doc.content, self.max_chars) })
            .collect();

        let ids = match tokio::time::timeout(self.timeout, oracle.rank(query, &shown, k)).await {
            Ok(Ok(ids)) => ids,
            Ok(Err(e)) => {
                warn!(error = %e, "rerank oracle failed, keeping fused order");
                return first_k(candidates, k);
            }
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs_f32(), "rerank oracle timed out, keeping fused order");
                return first_k(candidates, k);
            }
        };
        debug!(returned = ids.len(), candidates = candidates.len(), k, "rerank oracle answered");
        select(candidates, &ids, k)
    }
}

/// Orders `candidates` by the oracle's ids. Out-of-range and repeated ids are
/// skipped; unfilled slots take the remaining candidates in input order.
pub fn select(candidates: Vec<Document>, ids: &[i64], k: usize) -> Vec<Document> {
    let n = candidates.len();
    let mut used = vec![false; n];
    let mut picked: Vec<usize> = Vec::with_capacity(k.min(n));

    for &id in ids {
        if picked.len() == k {
            break;
        }
        let Ok(i) = usize::try_from(id) else { continue };
        if i >= n || used[i] {
            continue;
        }
        used[i] = true;
        picked.push(i);
    }
    if picked.is_empty() && !ids.is_empty() {
        warn!("rerank oracle returned no usable ids, keeping fused order");
    }
    for i in 0..n {
        if picked.len() == k {
            break;
        }
        if !used[i] {
            used[i] = true;
            picked.push(i);
        }
    }

    let mut slots: Vec<Option<Document>> = candidates.into_iter().map(Some).collect();
    picked.into_iter().filter_map(|i| slots[i].take()).collect()
}

fn first_k(mut candidates: Vec<Document>, k: usize) -> Vec<Document> {
    candidates.truncate(k);
    candidates
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
