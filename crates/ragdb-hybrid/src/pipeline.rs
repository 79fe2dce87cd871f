use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use ragdb_core::config::RagConfig;
use ragdb_core::data_processor::{ChunkingConfig, DataProcessor};
use ragdb_core::error::{Error, Result};
use ragdb_core::extract::FileTextExtractor;
use ragdb_core::traits::{Embedder, RerankOracle, TextExtractor};
use ragdb_core::types::Document;
use ragdb_text::Bm25Index;
use ragdb_vector::{VectorIndex, VectorQuery};
use tracing::{debug, info, warn};

use crate::fusion::{self, FusionStrategy, ReciprocalRankFusion};
use crate::manifest::{self, LoadOutcome, Manifest};
use crate::oracle::OllamaOracle;
use crate::rerank::RerankStage;

pub const RESULTS_HEADER: &str = "Document search results:\n\n";
pub const RESULT_SEPARATOR: &str = "\n\n---\n\n";
pub const NO_RESULTS: &str = "No relevant information found.";

/// Collaborators a pipeline is built from.
pub struct PipelineComponents {
    pub embedder: Arc<dyn Embedder>,
    pub oracle: Option<Arc<dyn RerankOracle>>,
    pub extractor: Arc<dyn TextExtractor>,
    pub fusion: Box<dyn FusionStrategy>,
}

impl PipelineComponents {
    /// Plain RRF, file extraction and no oracle.
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            oracle: None,
            extractor: Arc::new(FileTextExtractor),
            fusion: Box::new(ReciprocalRankFusion::default()),
        }
    }

    /// Everything as configured: embedder per `rag.embedder`, the Ollama
    /// oracle when `rag.rerank_enabled`, fusion per `rag.fusion`.
    pub fn from_config(config: &RagConfig) -> anyhow::Result<Self> {
        let embedder = ragdb_embed::get_default_embedder(config)?;
        let oracle: Option<Arc<dyn RerankOracle>> = if config.rerank_enabled {
            let timeout = Duration::from_secs(config.oracle_timeout_secs);
            Some(Arc::new(OllamaOracle::new(&config.ollama_url, &config.llm_model, timeout)?))
        } else {
            None
        };
        Ok(Self { embedder, oracle, extractor: Arc::new(FileTextExtractor), fusion: fusion::from_config(config) })
    }

    pub fn with_oracle(mut self, oracle: Arc<dyn RerankOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_fusion(mut self, fusion: Box<dyn FusionStrategy>) -> Self {
        self.fusion = fusion;
        self
    }
}

/// Hybrid retrieval over one corpus: vector and BM25 search, rank fusion,
/// then an optional rerank down to `rerank_top_k`.
///
/// Building takes `&mut self`; queries take `&self`, so a built pipeline is
/// shared behind an `Arc`.
pub struct RetrievalPipeline {
    config: RagConfig,
    embedder: Arc<dyn Embedder>,
    extractor: Arc<dyn TextExtractor>,
    fusion: Box<dyn FusionStrategy>,
    reranker: RerankStage,
    vector: VectorIndex,
    text: Bm25Index,
}

impl RetrievalPipeline {
    /// An empty pipeline. Nothing is read from or written to disk.
    pub fn new(config: RagConfig, components: PipelineComponents) -> Self {
        let reranker = RerankStage::new(components.oracle)
            .with_timeout(Duration::from_secs(config.oracle_timeout_secs))
            .with_max_chars(config.rerank_max_chars);
        let vector = VectorIndex::with_embedder(config.distance_metric, components.embedder.clone());
        let text = Bm25Index::from_config(&config);
        Self {
            config,
            embedder: components.embedder,
            extractor: components.extractor,
            fusion: components.fusion,
            reranker,
            vector,
            text,
        }
    }

    /// Loads the persisted corpus, or indexes the configured paths when there
    /// is nothing usable on disk.
    pub async fn open(config: RagConfig, components: PipelineComponents) -> Result<Self> {
        config.validate()?;
        let mut pipeline = Self::new(config, components);
        pipeline.load_or_index().await?;
        Ok(pipeline)
    }

    async fn load_or_index(&mut self) -> Result<()> {
        let persist_dir = self.persist_dir();
        if self.config.force_reindex {
            info!(dir = %persist_dir.display(), "forced reindex");
            return self.index_documents().await.map(|_| ());
        }
        if !persist_dir.exists() {
            info!(dir = %persist_dir.display(), "no database found, indexing documents");
            return self.index_documents().await.map(|_| ());
        }

        match manifest::load(&persist_dir, &self.config.document_paths) {
            Ok(LoadOutcome::Loaded(stored)) if !stored.docs.is_empty() => {
                info!(docs = stored.docs.len(), dir = %persist_dir.display(), "loading existing database");
                self.ingest(stored.docs).await
            }
            Ok(LoadOutcome::Loaded(_)) => {
                info!("stored database is empty, indexing documents");
                self.index_documents().await.map(|_| ())
            }
            Ok(LoadOutcome::Missing) => {
                info!("no manifest in database directory, indexing documents");
                self.index_documents().await.map(|_| ())
            }
            Ok(LoadOutcome::LegacyFormat) => {
                info!("legacy database format, reindexing");
                self.index_documents().await.map(|_| ())
            }
            Ok(LoadOutcome::PathMismatch { cached, current }) => {
                warn!(?cached, ?current, "document paths changed, reindexing");
                self.index_documents().await.map(|_| ())
            }
            Err(e) => {
                warn!(error = %e, "could not read stored database, reindexing");
                self.index_documents().await.map(|_| ())
            }
        }
    }

    /// Extracts, chunks and ingests every configured path, then writes the
    /// manifest. Returns the number of indexed chunks.
    pub async fn index_documents(&mut self) -> Result<usize> {
        let documents = DataProcessor::new(ChunkingConfig::from(&self.config))
            .with_extractor(self.extractor.clone())
            .process_paths(&self.config.document_paths);
        info!(chunks = documents.len(), paths = ?self.config.document_paths, "documents chunked");
        self.ingest(documents).await?;

        let stored = Manifest::new(self.config.document_paths.clone(), self.embedder.model_id(), self.text.documents().to_vec());
        manifest::save(&self.persist_dir(), &stored)?;
        info!(dir = %self.config.persist_dir, chunks = self.len(), "database saved");
        Ok(self.len())
    }

    /// Replaces the corpus with `documents`. Both indexes are rebuilt and only
    /// swapped in once every embedding succeeded.
    pub async fn ingest(&mut self, documents: Vec<Document>) -> Result<()> {
        if documents.is_empty() {
            return Err(Error::EmptyCorpus);
        }
        let embeddings = self.embed_all(&documents).await?;

        let mut vector = VectorIndex::with_embedder(self.config.distance_metric, self.embedder.clone());
        let mut text = Bm25Index::from_config(&self.config);
        for (document, embedding) in documents.into_iter().zip(embeddings) {
            text.add(document.clone());
            vector.add_vector(document, embedding)?;
        }
        self.vector = vector;
        self.text = text;
        info!(docs = self.len(), dimension = ?self.vector.dimension(), "indexes built");
        Ok(())
    }

    async fn embed_all(&self, documents: &[Document]) -> Result<Vec<Vec<f32>>> {
        let batches: Vec<Vec<String>> = documents
            .chunks(self.config.embed_batch_size.max(1))
            .map(|batch| batch.iter().map(|d| d.content.clone()).collect())
            .collect();

        let pb = if self.config.show_progress { ProgressBar::new(documents.len() as u64) } else { ProgressBar::hidden() };
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb.set_message("embedding");

        let embedder = self.embedder.clone();
        let mut results = stream::iter(batches)
            .map(move |batch| {
                let embedder = embedder.clone();
                async move { embedder.embed_batch(&batch).await }
            })
            .buffered(self.config.embed_concurrency.max(1));

        let mut embeddings: Vec<Vec<f32>> = Vec::with_capacity(documents.len());
        while let Some(batch) = results.next().await {
            let batch = batch.map_err(|e| Error::Embedding(e.to_string()))?;
            pb.inc(batch.len() as u64);
            embeddings.extend(batch);
        }
        pb.finish_and_clear();

        if embeddings.len() != documents.len() {
            return Err(Error::Embedding(format!(
                "embedder returned {} vectors for {} documents",
                embeddings.len(),
                documents.len()
            )));
        }
        debug!(vectors = embeddings.len(), model = %self.embedder.model_id(), "embedded corpus");
        Ok(embeddings)
    }

    /// The final ranked chunks for `query`, at most `rerank_top_k` of them,
    /// with duplicate contents removed.
    pub async fn query(&self, query: &str) -> Result<Vec<Document>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::InvalidArgument("query must not be empty".into()));
        }
        if self.is_empty() {
            debug!("query against empty pipeline");
            return Ok(Vec::new());
        }
        let top_k = self.config.top_k;

        let vector_hits = self.vector.search(VectorQuery::Text(query), top_k).await?;
        let text_hits = self.text.search(query, top_k)?;
        let fused = self.fusion.fuse(&vector_hits, &text_hits);
        debug!(
            vector = vector_hits.len(),
            text = text_hits.len(),
            fused = fused.len(),
            strategy = self.fusion.name(),
            "hybrid candidates"
        );
        if fused.is_empty() {
            return Ok(Vec::new());
        }

        let candidates: Vec<Document> = fused.into_iter().map(|f| f.document).collect();
        let reranked = self.reranker.rerank(query, candidates, self.config.rerank_top_k).await;
        Ok(dedup_by_content(reranked))
    }

    /// `query` rendered for a human or an LLM prompt. Errors become text.
    pub async fn search(&self, query: &str) -> String {
        match self.query(query).await {
            Ok(docs) if docs.is_empty() => NO_RESULTS.to_string(),
            Ok(docs) => render_results(&docs),
            Err(e) => {
                warn!(error = %e, "search failed");
                format!("Sorry, an error occurred while searching: {e}")
            }
        }
    }

    pub fn config(&self) -> &RagConfig { &self.config }

    pub fn documents(&self) -> &[Document] { self.text.documents() }

    pub fn len(&self) -> usize { self.text.len() }

    pub fn is_empty(&self) -> bool { self.text.is_empty() }

    fn persist_dir(&self) -> PathBuf { PathBuf::from(&self.config.persist_dir) }
}

pub fn render_results(docs: &[Document]) -> String {
    let body = docs.iter().map(|d| d.content.as_str()).collect::<Vec<_>>().join(RESULT_SEPARATOR);
    format!("{RESULTS_HEADER}{body}")
}

fn dedup_by_content(docs: Vec<Document>) -> Vec<Document> {
    let mut seen = HashSet::new();
    docs.into_iter().filter(|d| seen.insert(d.content.clone())).collect()
}
