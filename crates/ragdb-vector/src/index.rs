use std::fmt;
use std::sync::Arc;

use ragdb_core::error::{Error, Result};
use ragdb_core::traits::Embedder;
use ragdb_core::types::{Document, RankedResult};

use crate::distance::{distance, DistanceMetric};

/// What to look up: raw text (embedded on the fly) or a ready vector.
#[derive(Debug, Clone, Copy)]
pub enum VectorQuery<'a> {
    Text(&'a str),
    Vector(&'a [f32]),
}

/// Exhaustive nearest-neighbour index over documents and their embeddings.
///
/// The first inserted vector fixes the dimension for the lifetime of the
/// index. Search is a linear scan, sized for hundreds to low thousands of
/// chunks.
pub struct VectorIndex {
    vectors: Vec<Vec<f32>>,
    documents: Vec<Document>,
    dimension: Option<usize>,
    metric: DistanceMetric,
    embedder: Option<Arc<dyn Embedder>>,
}

impl VectorIndex {
    pub fn new(metric: DistanceMetric) -> Self {
        Self { vectors: Vec::new(), documents: Vec::new(), dimension: None, metric, embedder: None }
    }

    pub fn with_embedder(metric: DistanceMetric, embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder: Some(embedder), ..Self::new(metric) }
    }

    /// Embeds `document.content` and stores it.
    pub async fn add_document(&mut self, document: Document) -> Result<()> {
        let vector = self.embed(&document.content).await?;
        self.add_vector(document, vector)
    }

    pub fn add_vector(&mut self, document: Document, vector: Vec<f32>) -> Result<()> {
        if vector.is_empty() {
            return Err(Error::InvalidArgument("vector must not be empty".into()));
        }
        match self.dimension {
            None => self.dimension = Some(vector.len()),
            Some(expected) if expected != vector.len() => {
                return Err(Error::DimensionMismatch { expected, actual: vector.len() });
            }
            Some(_) => {}
        }
        self.vectors.push(vector);
        self.documents.push(document);
        Ok(())
    }

    pub async fn search(&self, query: VectorQuery<'_>, k: usize) -> Result<Vec<RankedResult>> {
        match query {
            VectorQuery::Vector(v) => self.search_vector(v, k),
            VectorQuery::Text(text) => {
                if k == 0 {
                    return Err(Error::InvalidArgument("k must be a positive integer".into()));
                }
                if self.is_empty() {
                    return Ok(Vec::new());
                }
                let v = self.embed(text).await?;
                self.search_vector(&v, k)
            }
        }
    }

    /// The `k` nearest documents, ascending by distance. Equal distances keep
    /// insertion order.
    pub fn search_vector(&self, query: &[f32], k: usize) -> Result<Vec<RankedResult>> {
        if k == 0 {
            return Err(Error::InvalidArgument("k must be a positive integer".into()));
        }
        let Some(expected) = self.dimension else { return Ok(Vec::new()) };
        if query.len() != expected {
            return Err(Error::DimensionMismatch { expected, actual: query.len() });
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, stored)| (i, distance(self.metric, query, stored)))
            .collect();
        // NaN distances sort after every real one
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        tracing::debug!(candidates = scored.len(), k, metric = ?self.metric, "vector search");

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(i, d)| RankedResult::vector(self.documents[i].clone(), d))
            .collect())
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embedder = self
            .embedder
            .as_ref()
            .ok_or_else(|| Error::InvalidArgument("no embedder configured for text input".into()))?;
        embedder.embed(text).await.map_err(|e| Error::Embedding(e.to_string()))
    }

    pub fn dimension(&self) -> Option<usize> { self.dimension }

    pub fn metric(&self) -> DistanceMetric { self.metric }

    pub fn documents(&self) -> &[Document] { &self.documents }

    pub fn len(&self) -> usize { self.vectors.len() }

    pub fn is_empty(&self) -> bool { self.vectors.is_empty() }
}

impl fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VectorIndex")
            .field("len", &self.vectors.len())
            .field("dimension", &self.dimension)
            .field("metric", &self.metric)
            .field("embedder", &self.embedder.as_ref().map(|e| e.model_id().to_string()))
            .finish()
    }
}
