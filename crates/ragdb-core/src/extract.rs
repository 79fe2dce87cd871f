use std::fs;
use std::path::Path;

use crate::traits::TextExtractor;

/// Reads plain-text formats directly and PDFs through `pdf-extract`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileTextExtractor;

impl FileTextExtractor {
    pub fn new() -> Self { Self }

    fn read_plain(path: &Path) -> std::io::Result<String> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(content),
            Err(_) => Ok(String::from_utf8_lossy(&fs::read(path)?).to_string()),
        }
    }
}

impl TextExtractor for FileTextExtractor {
    fn extract(&self, path: &Path) -> String {
        let is_pdf = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
        if is_pdf {
            match pdf_extract::extract_text(path) {
                Ok(text) => collapse_whitespace(&text),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "PDF extraction failed, skipping file");
                    String::new()
                }
            }
        } else {
            Self::read_plain(path).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "read failed, skipping file");
                String::new()
            })
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_extracts_to_empty() {
        let text = FileTextExtractor::new().extract(Path::new("/definitely/not/here.txt"));
        assert!(text.is_empty());
    }

    #[test]
    fn collapse_whitespace_joins_runs() {
        assert_eq!(collapse_whitespace("  a\n\n b\t c "), "a b c");
    }
}
