use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use ragdb_core::traits::Embedder;

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Embeddings from an Ollama server (`POST /api/embed`).
pub struct OllamaEmbedder {
    client: reqwest::Client,
    base_url: String,
    model: String,
    id: String,
}

impl OllamaEmbedder {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            id: format!("ollama:{model}"),
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_id(&self) -> &str { &self.id }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() { return Ok(Vec::new()); }
        let url = format!("{}/api/embed", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&EmbedRequest { model: &self.model, input: texts })
            .send()
            .await
            .with_context(|| format!("embedding request to {url} failed"))?
            .error_for_status()?;
        let body: EmbedResponse = response.json().await.context("malformed embedding response")?;
        if body.embeddings.len() != texts.len() {
            return Err(anyhow!("expected {} embeddings, got {}", texts.len(), body.embeddings.len()));
        }
        tracing::debug!(batch = texts.len(), model = %self.model, "embedded batch");
        Ok(body.embeddings)
    }
}
