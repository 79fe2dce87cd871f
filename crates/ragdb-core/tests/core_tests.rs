use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

use ragdb_core::config::{Config, DistanceMetric, FusionKind, RagConfig};
use ragdb_core::data_processor::{chunk_id, ChunkingConfig, DataProcessor};

fn long_paragraph(word: &str, words: usize) -> String {
    vec![word; words].join(" ")
}

#[test]
fn process_paths_single_small_file_is_filtered_as_noise() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    let mut f = fs::File::create(dir.join("a.txt")).unwrap();
    writeln!(f, "Short text").unwrap();

    let processor = DataProcessor::default();
    let docs = processor.process_paths(&[dir.to_string_lossy()]);

    assert!(docs.is_empty(), "chunks of 50 chars or fewer are dropped");
}

#[test]
fn process_paths_keeps_long_chunks_with_provenance() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    let text = "The quick brown fox jumps over the lazy dog near the riverbank at dawn.";
    fs::write(dir.join("notes.md"), text).unwrap();
    fs::write(dir.join("ignored.csv"), text).unwrap();

    let processor = DataProcessor::default();
    let docs = processor.process_paths(&[dir.to_string_lossy()]);

    assert_eq!(docs.len(), 1, "only supported extensions are walked");
    assert_eq!(docs[0].content, text);
    assert_eq!(docs[0].chunk_index, 0);
    assert!(docs[0].source.ends_with("notes.md"));
    assert!(docs[0].id.starts_with("notes.md-"));
}

#[test]
fn missing_paths_are_skipped() {
    let processor = DataProcessor::default();
    let docs = processor.process_paths(&["/no/such/dir/anywhere"]);
    assert!(docs.is_empty());
}

#[test]
fn split_text_respects_size_and_overlap() {
    let processor = DataProcessor::new(ChunkingConfig { chunk_size: 40, chunk_overlap: 10, min_chunk_len: 0 });
    let text = long_paragraph("word", 50);
    let chunks = processor.split_text(&text);

    assert!(chunks.len() > 1);
    for chunk in &chunks {
        assert!(chunk.chars().count() <= 40, "chunk too long: {}", chunk.len());
    }
    // consecutive chunks share their boundary words
    for pair in chunks.windows(2) {
        let tail = pair[0].rsplit(' ').next().unwrap();
        assert!(pair[1].starts_with(tail));
    }
}

#[test]
fn split_text_prefers_paragraph_boundaries() {
    let processor = DataProcessor::new(ChunkingConfig { chunk_size: 60, chunk_overlap: 0, min_chunk_len: 0 });
    let first = "First paragraph has a handful of words in it.";
    let second = "Second paragraph also has several words.";
    let chunks = processor.split_text(&format!("{first}\n\n{second}"));
    assert_eq!(chunks, vec![first.to_string(), second.to_string()]);
}

#[test]
fn split_text_falls_back_to_characters() {
    let processor = DataProcessor::new(ChunkingConfig { chunk_size: 10, chunk_overlap: 0, min_chunk_len: 0 });
    let chunks = processor.split_text(&"x".repeat(25));
    assert_eq!(chunks, vec!["x".repeat(10), "x".repeat(10), "x".repeat(5)]);
}

#[test]
fn chunk_ids_differ_for_same_name_in_different_dirs() {
    let a = chunk_id(Path::new("/a/readme.md"), 0);
    let b = chunk_id(Path::new("/b/readme.md"), 0);
    assert_ne!(a, b);
    assert!(a.ends_with("_chunk_0"));
}

#[test]
fn rag_config_defaults_and_overrides() {
    use figment::providers::{Format, Toml};
    let figment = figment::Figment::new().merge(Toml::string(
        r#"
        [rag]
        top_k = 8
        distance_metric = "euclidean"
        fusion = "weighted"
        "#,
    ));
    let rag = Config::from_figment(figment).rag().expect("rag config");
    assert_eq!(rag.top_k, 8);
    assert_eq!(rag.distance_metric, DistanceMetric::Euclidean);
    assert_eq!(rag.fusion, FusionKind::Weighted);
    assert_eq!(rag.chunk_size, RagConfig::default().chunk_size);
    assert_eq!(rag.rrf_k, 60.0);
}

#[test]
fn rag_config_rejects_unknown_metric() {
    use figment::providers::{Format, Toml};
    let figment = figment::Figment::new().merge(Toml::string("[rag]\ndistance_metric = \"manhattan\"\n"));
    assert!(Config::from_figment(figment).rag().is_err());
}

#[test]
fn rag_config_rejects_zero_timeouts() {
    use figment::providers::{Format, Toml};
    use ragdb_core::error::Error;
    for section in ["[rag]\noracle_timeout_secs = 0\n", "[rag]\nembed_timeout_secs = 0\n"] {
        let figment = figment::Figment::new().merge(Toml::string(section));
        assert!(matches!(Config::from_figment(figment).rag(), Err(Error::InvalidConfig(_))), "{section}");
    }
}

#[test]
fn timeouts_and_stop_words_are_independent_settings() {
    use figment::providers::{Format, Toml};
    let figment = figment::Figment::new()
        .merge(Toml::string("[rag]\nembed_timeout_secs = 120\nbm25_stop_words = true\n"));
    let rag = Config::from_figment(figment).rag().expect("rag config");
    assert_eq!(rag.embed_timeout_secs, 120);
    assert_eq!(rag.oracle_timeout_secs, RagConfig::default().oracle_timeout_secs);
    assert!(rag.bm25_stop_words);
}
