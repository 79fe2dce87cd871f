//! ragdb-text
//!
//! Lexical side of the hybrid engine: the shared tokenizer chain and an
//! in-memory Okapi BM25 index.

pub mod bm25;
pub mod tokenize;

pub use bm25::Bm25Index;
pub use tokenize::Tokenizer;
