//! Domain types shared by the text and vector indexes.

use serde::{Deserialize, Serialize};

pub type DocumentId = String;

/// A chunk of a source document that is independently indexed.
///
/// - `id`: unique within one index generation
/// - `content`: the text payload of the chunk
/// - `source`: path of the file the chunk was cut from
/// - `chunk_index`: position of the chunk within its source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub content: String,
    pub source: String,
    #[serde(rename = "chunk_id")]
    pub chunk_index: usize,
}

impl Document {
    pub fn new(
        id: impl Into<DocumentId>,
        content: impl Into<String>,
        source: impl Into<String>,
        chunk_index: usize,
    ) -> Self {
        Self { id: id.into(), content: content.into(), source: source.into(), chunk_index }
    }
}

/// Indicates which index produced a result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceKind {
    Vector,
    Text,
}

/// One entry of a ranked result list.
///
/// `value` is engine-specific: a distance for [`SourceKind::Vector`]
/// (lower is better) and a BM25 score for [`SourceKind::Text`] (higher is
/// better). Fusion only ever looks at the position in the list.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedResult {
    pub document: Document,
    pub value: f32,
    pub source: SourceKind,
}

impl RankedResult {
    pub fn vector(document: Document, distance: f32) -> Self {
        Self { document, value: distance, source: SourceKind::Vector }
    }

    pub fn text(document: Document, score: f32) -> Self {
        Self { document, value: score, source: SourceKind::Text }
    }

    /// Lower-is-better view of the result regardless of the producing index.
    pub fn distance(&self) -> f32 {
        match self.source {
            SourceKind::Vector => self.value,
            SourceKind::Text => (-0.1 * self.value).exp(),
        }
    }
}
