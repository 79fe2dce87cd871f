use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::RagConfig;
use crate::extract::FileTextExtractor;
use crate::traits::TextExtractor;
use crate::types::Document;

/// File extensions picked up when walking a document directory.
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["pdf", "txt", "md", "py"];

const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub min_chunk_len: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: 350, chunk_overlap: 75, min_chunk_len: 50 }
    }
}

impl From<&RagConfig> for ChunkingConfig {
    fn from(cfg: &RagConfig) -> Self {
        Self { chunk_size: cfg.chunk_size, chunk_overlap: cfg.chunk_overlap, min_chunk_len: cfg.min_chunk_len }
    }
}

/// Enumerates source files, extracts their text and cuts it into chunks.
pub struct DataProcessor {
    chunking_config: ChunkingConfig,
    extractor: Arc<dyn TextExtractor>,
}

impl Default for DataProcessor {
    fn default() -> Self {
        Self::new(ChunkingConfig::default())
    }
}

impl DataProcessor {
    pub fn new(chunking_config: ChunkingConfig) -> Self {
        Self { chunking_config, extractor: Arc::new(FileTextExtractor::new()) }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Chunks every readable file under `paths`. Unreadable or empty files
    /// are skipped; an empty result is left for the caller to judge.
    pub fn process_paths<S: AsRef<str>>(&self, paths: &[S]) -> Vec<Document> {
        let files = self.list_files(paths);
        let mut documents = Vec::new();
        for (file_index, file_path) in files.iter().enumerate() {
            tracing::info!("Processing file {}/{}: {}", file_index + 1, files.len(), file_path.display());
            let content = self.extractor.extract(file_path);
            if content.trim().is_empty() {
                tracing::warn!(path = %file_path.display(), "no text extracted, skipping");
                continue;
            }
            documents.extend(self.chunk_content(&content, file_path));
        }
        tracing::info!("Processed {} files into {} chunks", files.len(), documents.len());
        documents
    }

    /// Splits `content` and keeps the chunks longer than the minimum length.
    /// `chunk_index` is the position in the unfiltered split.
    pub fn chunk_content(&self, content: &str, file_path: &Path) -> Vec<Document> {
        let source = file_path.to_string_lossy().to_string();
        self.split_text(content)
            .into_iter()
            .enumerate()
            .filter(|(_, chunk)| chunk.trim().chars().count() > self.chunking_config.min_chunk_len)
            .map(|(i, chunk)| Document::new(chunk_id(file_path, i), chunk, source.clone(), i))
            .collect()
    }

    /// Recursive character splitting: try paragraph, line, word and finally
    /// character boundaries until every piece fits `chunk_size`, then merge
    /// neighbouring pieces back up with `chunk_overlap` characters of overlap.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &SEPARATORS)
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let (idx, separator) = separators
            .iter()
            .enumerate()
            .find(|(_, s)| s.is_empty() || text.contains(**s))
            .map(|(i, s)| (i, *s))
            .unwrap_or((separators.len(), ""));
        let rest = separators.get(idx + 1..).unwrap_or(&[]);

        let pieces: Vec<&str> = if separator.is_empty() {
            text.char_indices().map(|(i, c)| &text[i..i + c.len_utf8()]).collect()
        } else {
            text.split(separator).filter(|p| !p.is_empty()).collect()
        };

        let mut chunks = Vec::new();
        let mut pending: Vec<&str> = Vec::new();
        for piece in pieces {
            if char_len(piece) < self.chunking_config.chunk_size {
                pending.push(piece);
                continue;
            }
            if !pending.is_empty() {
                chunks.extend(self.merge_pieces(&pending, separator));
                pending.clear();
            }
            if rest.is_empty() {
                chunks.push(piece.to_string());
            } else {
                chunks.extend(self.split_recursive(piece, rest));
            }
        }
        if !pending.is_empty() {
            chunks.extend(self.merge_pieces(&pending, separator));
        }
        chunks
    }

    fn merge_pieces(&self, pieces: &[&str], separator: &str) -> Vec<String> {
        let size = self.chunking_config.chunk_size;
        let overlap = self.chunking_config.chunk_overlap;
        let sep_len = char_len(separator);
        let mut out = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);
            let joined = |total: usize, window: &VecDeque<&str>| total + len + if window.is_empty() { 0 } else { sep_len };
            if joined(total, &window) > size && !window.is_empty() {
                push_joined(&mut out, &window, separator);
                while total > overlap || (total > 0 && joined(total, &window) > size) {
                    let Some(first) = window.pop_front() else { break };
                    total -= char_len(first) + if window.is_empty() { 0 } else { sep_len };
                }
            }
            window.push_back(piece);
            total += len + if window.len() > 1 { sep_len } else { 0 };
        }
        push_joined(&mut out, &window, separator);
        out
    }

    /// Files to process, in a stable order. Directories are walked
    /// recursively; explicitly listed files are taken whatever their extension.
    pub fn list_files<S: AsRef<str>>(&self, paths: &[S]) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for path in paths {
            let root = Path::new(path.as_ref());
            if !root.exists() {
                tracing::warn!(path = %root.display(), "document path does not exist, skipping");
                continue;
            }
            if root.is_file() {
                files.push(root.to_path_buf());
                continue;
            }
            let mut found: Vec<PathBuf> = walkdir::WalkDir::new(root)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| e.path().to_path_buf())
                .filter(|p| is_supported(p))
                .collect();
            found.sort();
            files.extend(found);
        }
        files
    }
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.iter().any(|s| ext.eq_ignore_ascii_case(s)))
}

fn push_joined(out: &mut Vec<String>, window: &VecDeque<&str>, separator: &str) {
    let joined = window.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

fn char_len(s: &str) -> usize { s.chars().count() }

/// `"{file_name}-{hash8}_chunk_{i}"`; the path hash keeps ids unique across
/// equally named files in different directories.
pub fn chunk_id(file_path: &Path, chunk_index: usize) -> String {
    let name = file_path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_else(|| "doc".to_string());
    let hash = blake3::hash(file_path.to_string_lossy().as_bytes()).to_hex();
    format!("{}-{}_chunk_{}", name, &hash.as_str()[..8], chunk_index)
}
