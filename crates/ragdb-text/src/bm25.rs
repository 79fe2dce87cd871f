use std::collections::HashMap;
use std::sync::OnceLock;

use ragdb_core::config::RagConfig;
use ragdb_core::error::{Error, Result};
use ragdb_core::types::{Document, RankedResult};

use crate::tokenize::Tokenizer;

/// Documents scoring at or below this are treated as non-matches.
pub const SCORE_EPSILON: f64 = 1e-9;

pub const DEFAULT_K1: f64 = 1.5;
pub const DEFAULT_B: f64 = 0.75;

/// Corpus-level statistics derived from the stored documents.
#[derive(Debug, Default)]
struct CorpusStats {
	doc_freqs: HashMap<String, usize>,
	idf: HashMap<String, f64>,
	avg_doc_len: f64,
}

/// Okapi BM25 over an in-memory corpus.
///
/// Inserts only record per-document data and drop the derived statistics;
/// the next read rebuilds them once. Reads take `&self`, so a built index can
/// be searched from many threads.
#[derive(Debug)]
pub struct Bm25Index {
	documents: Vec<Document>,
	doc_terms: Vec<HashMap<String, u32>>,
	doc_len: Vec<usize>,
	stats: OnceLock<CorpusStats>,
	k1: f64,
	b: f64,
	tokenizer: Tokenizer,
}

impl Default for Bm25Index {
	fn default() -> Self { Self::new(DEFAULT_K1, DEFAULT_B) }
}

impl Bm25Index {
	/// `k1` controls term-frequency saturation, `b` length normalization.
	pub fn new(k1: f64, b: f64) -> Self {
		Self {
			documents: Vec::new(),
			doc_terms: Vec::new(),
			doc_len: Vec::new(),
			stats: OnceLock::new(),
			k1,
			b,
			tokenizer: Tokenizer::new(),
		}
	}

	/// `bm25_k1`, `bm25_b` and `bm25_stop_words` from the retrieval settings.
	pub fn from_config(config: &RagConfig) -> Self {
		let tokenizer = if config.bm25_stop_words { Tokenizer::with_stop_words() } else { Tokenizer::new() };
		Self::new(config.bm25_k1, config.bm25_b).with_tokenizer(tokenizer)
	}

	pub fn with_tokenizer(mut self, tokenizer: Tokenizer) -> Self {
		self.tokenizer = tokenizer;
		self
	}

	pub fn add(&mut self, document: Document) {
		let tokens = self.tokenizer.tokenize(&document.content);
		let mut terms: HashMap<String, u32> = HashMap::new();
		for token in &tokens { *terms.entry(token.clone()).or_default() += 1; }
		self.doc_len.push(tokens.len());
		self.doc_terms.push(terms);
		self.documents.push(document);
		self.stats = OnceLock::new();
	}

	pub fn search(&self, query: &str, k: usize) -> Result<Vec<RankedResult>> {
		if k == 0 { return Err(Error::InvalidArgument("k must be a positive integer".into())); }
		if self.documents.is_empty() { return Ok(Vec::new()); }
		let stats = self.stats();
		if stats.avg_doc_len == 0.0 { return Ok(Vec::new()); }
		let query_tokens = self.tokenizer.tokenize(query);
		if query_tokens.is_empty() { return Ok(Vec::new()); }

		let mut scored: Vec<(usize, f64)> = (0..self.documents.len())
			.map(|i| (i, self.score(&query_tokens, i, stats)))
			.filter(|(_, score)| *score > SCORE_EPSILON)
			.collect();
		scored.sort_by(|a, b| b.1.total_cmp(&a.1));
		tracing::debug!(matches = scored.len(), k, "bm25 search");

		Ok(scored
			.into_iter()
			.take(k)
			.map(|(i, score)| RankedResult::text(self.documents[i].clone(), score as f32))
			.collect())
	}

	fn score(&self, query_tokens: &[String], doc_index: usize, stats: &CorpusStats) -> f64 {
		let terms = &self.doc_terms[doc_index];
		let length_ratio = self.doc_len[doc_index] as f64 / stats.avg_doc_len;
		query_tokens
			.iter()
			.filter_map(|token| stats.idf.get(token).map(|idf| (idf, terms.get(token).copied().unwrap_or(0))))
			.map(|(idf, tf)| {
				let tf = f64::from(tf);
				let numerator = idf * tf * (self.k1 + 1.0);
				let denominator = tf + self.k1 * (1.0 - self.b + self.b * length_ratio);
				numerator / (denominator + 1e-9)
			})
			.sum()
	}

	fn stats(&self) -> &CorpusStats {
		self.stats.get_or_init(|| {
			let n = self.documents.len();
			let mut doc_freqs: HashMap<String, usize> = HashMap::new();
			for terms in &self.doc_terms {
				for term in terms.keys() { *doc_freqs.entry(term.clone()).or_default() += 1; }
			}
			let idf = doc_freqs
				.iter()
				.map(|(term, &df)| {
					let (n, df) = (n as f64, df as f64);
					(term.clone(), ((n - df + 0.5) / (df + 0.5) + 1.0).ln())
				})
				.collect();
			let avg_doc_len = if n == 0 { 0.0 } else { self.doc_len.iter().sum::<usize>() as f64 / n as f64 };
			tracing::debug!(documents = n, terms = doc_freqs.len(), avg_doc_len, "rebuilt bm25 statistics");
			CorpusStats { doc_freqs, idf, avg_doc_len }
		})
	}

	/// Number of documents containing `term` (already normalized).
	pub fn doc_frequency(&self, term: &str) -> usize {
		self.stats().doc_freqs.get(term).copied().unwrap_or(0)
	}

	pub fn idf(&self, term: &str) -> Option<f64> { self.stats().idf.get(term).copied() }

	pub fn avg_doc_length(&self) -> f64 { self.stats().avg_doc_len }

	/// True when an insert happened since the statistics were last built.
	pub fn is_stale(&self) -> bool { self.stats.get().is_none() }

	pub fn documents(&self) -> &[Document] { &self.documents }

	pub fn len(&self) -> usize { self.documents.len() }

	pub fn is_empty(&self) -> bool { self.documents.is_empty() }
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn idf_matches_okapi_formula() {
		let mut index = Bm25Index::default();
		index.add(Document::new("a", "apple banana", "s", 0));
		index.add(Document::new("b", "apple cherry", "s", 1));
		index.add(Document::new("c", "durian", "s", 2));
		let expected = ((3.0 - 2.0 + 0.5) / (2.0 + 0.5) + 1.0f64).ln();
		assert!((index.idf("apple").unwrap() - expected).abs() < 1e-12);
		assert!((index.avg_doc_length() - 5.0 / 3.0).abs() < 1e-12);
	}

	#[test]
	fn stats_are_invalidated_by_insert_and_rebuilt_on_read() {
		let mut index = Bm25Index::default();
		index.add(Document::new("a", "apple", "s", 0));
		assert!(index.is_stale());
		assert_eq!(index.doc_frequency("apple"), 1);
		assert!(!index.is_stale());
		index.add(Document::new("b", "apple pie", "s", 1));
		assert!(index.is_stale());
		assert_eq!(index.doc_frequency("apple"), 2);
	}
}
