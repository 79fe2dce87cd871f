use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ragdb_core::config::{absolutize, path_key, RagConfig};
use ragdb_core::error::{Error, Result};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::pipeline::{PipelineComponents, RetrievalPipeline};

/// Key of the pipeline built from the base configuration's own paths.
pub const DEFAULT_SCOPE: &str = "__default__";

type ComponentFactory = dyn Fn(&RagConfig) -> anyhow::Result<PipelineComponents> + Send + Sync;

/// One scope's pipeline. `build` serializes opens and rebuilds of the scope
/// so only one writer touches its persist dir at a time; `current` is only
/// write-locked for the swap.
#[derive(Default)]
struct Scope {
    current: RwLock<Option<Arc<RetrievalPipeline>>>,
    build: Mutex<()>,
}

impl Scope {
    async fn current(&self) -> Option<Arc<RetrievalPipeline>> { self.current.read().await.clone() }
}

/// Open pipelines, one per document scope.
///
/// A scope is either the base configuration or a single document path; each
/// path scope persists under its own subdirectory of the base `persist_dir`.
/// The scope map is locked only to look up or insert a scope, so indexing one
/// scope never blocks queries on another. Rebuilt pipelines replace the cached
/// `Arc`, and callers holding the old one keep a consistent view until they
/// drop it.
pub struct PipelineRegistry {
    base: RagConfig,
    factory: Arc<ComponentFactory>,
    scopes: Mutex<HashMap<String, Arc<Scope>>>,
}

impl PipelineRegistry {
    /// Collaborators are built from each scope's configuration.
    pub fn new(base: RagConfig) -> Self { Self::with_factory(base, PipelineComponents::from_config) }

    pub fn with_factory<F>(base: RagConfig, factory: F) -> Self
    where
        F: Fn(&RagConfig) -> anyhow::Result<PipelineComponents> + Send + Sync + 'static,
    {
        Self { base, factory: Arc::new(factory), scopes: Mutex::new(HashMap::new()) }
    }

    /// Registry key and configuration for a scope.
    pub fn scope(&self, doc_path: Option<&Path>) -> (String, RagConfig) {
        let Some(path) = doc_path else {
            return (DEFAULT_SCOPE.to_string(), self.base.clone());
        };
        let abs = absolutize(path);
        let key = path_key(&abs);
        let mut config = self.base.clone();
        config.document_paths = vec![abs.to_string_lossy().to_string()];
        config.persist_dir = scope_persist_dir(Path::new(&self.base.persist_dir), &abs, &key)
            .to_string_lossy()
            .to_string();
        (key, config)
    }

    /// The cached pipeline for the scope, opening it on first use.
    pub async fn get_or_open(&self, doc_path: Option<&Path>) -> Result<Arc<RetrievalPipeline>> {
        let (key, config) = self.scope(doc_path);
        let scope = self.slot(&key).await;
        if let Some(existing) = scope.current().await {
            debug!(%key, "reusing open pipeline");
            return Ok(existing);
        }

        let _build = scope.build.lock().await;
        // opened by another caller while this one waited
        if let Some(existing) = scope.current().await {
            return Ok(existing);
        }
        info!(%key, persist_dir = %config.persist_dir, "opening pipeline");
        let pipeline = Arc::new(self.open(config).await?);
        *scope.current.write().await = Some(pipeline.clone());
        Ok(pipeline)
    }

    /// Rebuilds the scope from its source files and swaps the result in.
    /// Queries keep using the previous pipeline until the swap.
    pub async fn reindex(&self, doc_path: Option<&Path>) -> Result<Arc<RetrievalPipeline>> {
        let (key, mut config) = self.scope(doc_path);
        config.force_reindex = true;
        let scope = self.slot(&key).await;

        let _build = scope.build.lock().await;
        info!(%key, "rebuilding pipeline");
        let pipeline = Arc::new(self.open(config).await?);
        *scope.current.write().await = Some(pipeline.clone());
        Ok(pipeline)
    }

    /// Rendered results for `query` in the given scope. Never fails.
    pub async fn search(&self, query: &str, doc_path: Option<&Path>) -> String {
        match self.get_or_open(doc_path).await {
            Ok(pipeline) => pipeline.search(query).await,
            Err(e) => {
                warn!(error = %e, "could not open pipeline");
                format!("Sorry, an error occurred while searching: {e}")
            }
        }
    }

    /// Forgets the scope. Returns whether it held an open pipeline.
    pub async fn remove(&self, doc_path: Option<&Path>) -> bool {
        let (key, _) = self.scope(doc_path);
        let removed = self.scopes.lock().await.remove(&key);
        match removed {
            Some(scope) => scope.current().await.is_some(),
            None => false,
        }
    }

    pub async fn clear(&self) { self.scopes.lock().await.clear(); }

    /// Number of scopes with an open pipeline.
    pub async fn len(&self) -> usize {
        let scopes: Vec<Arc<Scope>> = self.scopes.lock().await.values().cloned().collect();
        let mut open = 0;
        for scope in scopes {
            if scope.current().await.is_some() {
                open += 1;
            }
        }
        open
    }

    pub async fn is_empty(&self) -> bool { self.len().await == 0 }

    async fn slot(&self, key: &str) -> Arc<Scope> {
        self.scopes.lock().await.entry(key.to_string()).or_default().clone()
    }

    async fn open(&self, config: RagConfig) -> Result<RetrievalPipeline> {
        let components = (self.factory)(&config).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        RetrievalPipeline::open(config, components).await
    }
}

/// `<base>/<last path component>_<first 8 hex chars of the path key>`
pub fn scope_persist_dir(base: &Path, abs_doc_path: &Path, key: &str) -> PathBuf {
    let name = abs_doc_path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_else(|| "root".to_string());
    base.join(format!("{}_{}", name, &key[..8.min(key.len())]))
}
