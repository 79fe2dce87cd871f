//! On-disk record of an indexed corpus: `<persist_dir>/docs.json`.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use ragdb_core::config::absolutize;
use ragdb_core::error::{Error, Result};
use ragdb_core::types::Document;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const MANIFEST_FILE: &str = "docs.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub document_paths: Vec<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub embed_model: Option<String>,
    pub docs: Vec<Document>,
}

impl Manifest {
    pub fn new(document_paths: Vec<String>, embed_model: &str, docs: Vec<Document>) -> Self {
        Self { document_paths, created_at: Some(Utc::now()), embed_model: Some(embed_model.to_string()), docs }
    }
}

/// What was found in a persist directory.
#[derive(Debug)]
pub enum LoadOutcome {
    Loaded(Manifest),
    Missing,
    /// A bare list of documents with no recorded paths.
    LegacyFormat,
    PathMismatch { cached: Vec<String>, current: Vec<String> },
}

pub fn manifest_path(persist_dir: &Path) -> PathBuf { persist_dir.join(MANIFEST_FILE) }

/// Writes through a temporary file so a crash never leaves a truncated manifest.
pub fn save(persist_dir: &Path, manifest: &Manifest) -> Result<()> {
    fs::create_dir_all(persist_dir)?;
    let target = manifest_path(persist_dir);
    let tmp = target.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_vec_pretty(manifest)?)?;
    fs::rename(&tmp, &target)?;
    tracing::debug!(path = %target.display(), docs = manifest.docs.len(), "manifest written");
    Ok(())
}

pub fn load(persist_dir: &Path, current_paths: &[String]) -> Result<LoadOutcome> {
    let path = manifest_path(persist_dir);
    if !path.exists() {
        return Ok(LoadOutcome::Missing);
    }
    let raw = fs::read_to_string(&path)?;
    let value: Value = serde_json::from_str(&raw)?;
    if value.is_array() {
        return Ok(LoadOutcome::LegacyFormat);
    }
    if value.get("docs").is_none() {
        return Err(Error::Persist(format!("{} has no docs field", path.display())));
    }
    let manifest: Manifest = serde_json::from_value(value)?;
    if !same_paths(&manifest.document_paths, current_paths) {
        return Ok(LoadOutcome::PathMismatch {
            cached: manifest.document_paths,
            current: current_paths.to_vec(),
        });
    }
    Ok(LoadOutcome::Loaded(manifest))
}

/// Compares as sets of absolute, normalized paths.
pub fn same_paths(a: &[String], b: &[String]) -> bool {
    let normalize = |paths: &[String]| -> BTreeSet<PathBuf> { paths.iter().map(|p| absolutize(Path::new(p))).collect() };
    normalize(a) == normalize(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_sets_ignore_order_and_spelling() {
        let a = vec!["/data/docs/".to_string(), "/data/more".to_string()];
        let b = vec!["/data/more".to_string(), "/data/./docs".to_string()];
        assert!(same_paths(&a, &b));
        assert!(!same_paths(&a, &["/data/docs".to_string()]));
    }

    #[test]
    fn legacy_list_and_missing_docs_are_detected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(load(dir.path(), &[]).unwrap(), LoadOutcome::Missing));

        fs::write(manifest_path(dir.path()), "[]").unwrap();
        assert!(matches!(load(dir.path(), &[]).unwrap(), LoadOutcome::LegacyFormat));

        fs::write(manifest_path(dir.path()), r#"{"document_paths": []}"#).unwrap();
        assert!(matches!(load(dir.path(), &[]), Err(Error::Persist(_))));
    }

    #[test]
    fn saved_manifest_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let paths = vec!["/srv/files".to_string()];
        let docs = vec![Document::new("a.txt-0_chunk_0", "hello", "/srv/files/a.txt", 0)];
        save(dir.path(), &Manifest::new(paths.clone(), "hash:xxh64:d8", docs.clone())).unwrap();

        match load(dir.path(), &paths).unwrap() {
            LoadOutcome::Loaded(m) => {
                assert_eq!(m.docs, docs);
                assert_eq!(m.embed_model.as_deref(), Some("hash:xxh64:d8"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        let raw = fs::read_to_string(manifest_path(dir.path())).unwrap();
        assert!(raw.contains("\"chunk_id\": 0"));
    }
}
