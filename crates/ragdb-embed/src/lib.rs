use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

use ragdb_core::config::{EmbedderKind, RagConfig};
use ragdb_core::traits::Embedder;

pub mod hash;
pub mod ollama;

pub use hash::HashEmbedder;
pub use ollama::OllamaEmbedder;

/// Embedder selected by `rag.embedder`. `APP_USE_FAKE_EMBEDDINGS=1` forces the
/// offline [`HashEmbedder`] regardless of configuration.
pub fn get_default_embedder(config: &RagConfig) -> Result<Arc<dyn Embedder>> {
    let use_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if use_fake || config.embedder == EmbedderKind::Hash {
        tracing::info!(dim = config.embed_dim, "using hash embedder");
        return Ok(Arc::new(HashEmbedder::new(config.embed_dim)));
    }
    tracing::info!(model = %config.embed_model, url = %config.ollama_url, "using ollama embedder");
    let timeout = Duration::from_secs(config.embed_timeout_secs);
    Ok(Arc::new(OllamaEmbedder::new(&config.ollama_url, &config.embed_model, timeout)?))
}
