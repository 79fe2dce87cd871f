//! Configuration loader, typed retrieval settings and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (`APP_RAG__TOP_K=10` overrides `rag.top_k`). Provides helpers to expand `~`
//! and `${VAR}` and to derive stable keys from document paths.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::default("rag", RagConfig::default()))
            .merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.validate_for_env(&env_name)?;
        Ok(config)
    }

    /// Builds a config from an explicit figment (tests, embedding hosts).
    pub fn from_figment(figment: Figment) -> Self {
        Self { figment: Figment::from(Serialized::default("rag", RagConfig::default())).merge(figment) }
    }

    /// The `[rag]` section, path-expanded and validated.
    pub fn rag(&self) -> Result<RagConfig> {
        let rag: RagConfig = self
            .figment
            .extract_inner("rag")
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        let rag = rag.expanded();
        rag.validate()?;
        Ok(rag)
    }

    fn validate_for_env(&self, env: &str) -> anyhow::Result<()> {
        match env {
            "prod" | "production" => {
                let rag = self.rag()?;
                if rag.force_reindex {
                    tracing::warn!("force_reindex is enabled in production; every start re-embeds the corpus");
                }
            }
            _ => {
                self.rag()?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    #[default]
    Cosine,
    Euclidean,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FusionKind {
    #[default]
    Rrf,
    Weighted,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderKind {
    Hash,
    #[default]
    Ollama,
}

/// Settings of one retrieval pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RagConfig {
    pub document_paths: Vec<String>,
    pub persist_dir: String,
    pub force_reindex: bool,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Chunks whose trimmed length does not exceed this are dropped.
    pub min_chunk_len: usize,
    /// Candidates requested from each index before fusion.
    pub top_k: usize,
    /// Final number of chunks after reranking.
    pub rerank_top_k: usize,
    pub rrf_k: f64,
    pub fusion: FusionKind,
    pub vector_weight: f64,
    pub text_weight: f64,
    pub bm25_k1: f64,
    pub bm25_b: f64,
    /// Drop common English function words before BM25 scoring.
    pub bm25_stop_words: bool,
    pub distance_metric: DistanceMetric,
    pub embedder: EmbedderKind,
    pub embed_model: String,
    /// Dimension of the offline hash embedder.
    pub embed_dim: usize,
    pub embed_batch_size: usize,
    pub embed_concurrency: usize,
    /// HTTP timeout of one embedding request.
    pub embed_timeout_secs: u64,
    pub rerank_enabled: bool,
    pub llm_model: String,
    pub ollama_url: String,
    pub oracle_timeout_secs: u64,
    pub rerank_max_chars: usize,
    pub show_progress: bool,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            document_paths: vec!["./files/".to_string()],
            persist_dir: "./rag_db".to_string(),
            force_reindex: false,
            chunk_size: 350,
            chunk_overlap: 75,
            min_chunk_len: 50,
            top_k: 20,
            rerank_top_k: 3,
            rrf_k: 60.0,
            fusion: FusionKind::Rrf,
            vector_weight: 0.5,
            text_weight: 0.5,
            bm25_k1: 1.5,
            bm25_b: 0.75,
            bm25_stop_words: false,
            distance_metric: DistanceMetric::Cosine,
            embedder: EmbedderKind::Ollama,
            embed_model: "all-minilm".to_string(),
            embed_dim: 384,
            embed_batch_size: 32,
            embed_concurrency: 4,
            embed_timeout_secs: 60,
            rerank_enabled: true,
            llm_model: "qwen3:8b".to_string(),
            ollama_url: "http://localhost:11434".to_string(),
            oracle_timeout_secs: 30,
            rerank_max_chars: 500,
            show_progress: false,
        }
    }
}

impl RagConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk_size must be positive".into()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 || self.rerank_top_k == 0 {
            return Err(Error::InvalidConfig("top_k and rerank_top_k must be positive".into()));
        }
        if self.rrf_k < 0.0 {
            return Err(Error::InvalidConfig("rrf_k must not be negative".into()));
        }
        if self.embed_batch_size == 0 || self.embed_concurrency == 0 {
            return Err(Error::InvalidConfig("embed_batch_size and embed_concurrency must be positive".into()));
        }
        if self.oracle_timeout_secs == 0 || self.embed_timeout_secs == 0 {
            return Err(Error::InvalidConfig("oracle_timeout_secs and embed_timeout_secs must be positive".into()));
        }
        if self.document_paths.is_empty() {
            return Err(Error::InvalidConfig("document_paths is empty".into()));
        }
        Ok(())
    }

    /// Copy with `~` and environment variables expanded in every path.
    pub fn expanded(mut self) -> Self {
        self.document_paths = self
            .document_paths
            .iter()
            .map(|p| expand_path(p).to_string_lossy().to_string())
            .collect();
        self.persist_dir = expand_path(&self.persist_dir).to_string_lossy().to_string();
        self
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Absolute, lexically normalized form of `p` (no filesystem access, so the
/// path does not need to exist). Trailing separators are dropped.
pub fn absolutize(p: &Path) -> PathBuf {
    let joined = if p.is_absolute() {
        p.to_path_buf()
    } else {
        env::current_dir().map(|cwd| cwd.join(p)).unwrap_or_else(|_| p.to_path_buf())
    };
    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Stable hex key of a document path, independent of how it was spelled.
pub fn path_key(p: &Path) -> String {
    let abs = absolutize(p);
    blake3::hash(abs.to_string_lossy().as_bytes()).to_hex().to_string()
}
