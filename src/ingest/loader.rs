use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::core::errors::ApiError;

/// A source file loaded from the corpus directory.
#[derive(Debug, Clone)]
pub struct Document {
    pub text: String,
    pub source: PathBuf,
    /// Page number when the source format has pages; `.txt` sources have none.
    pub page: Option<u32>,
}

/// Scans the corpus directory for `.txt` files and loads them as documents.
///
/// Paths are sorted so repeated builds over an unchanged corpus produce the
/// same document order. Files that are empty after trimming are skipped. An
/// empty directory yields an empty vec; a missing directory is an error.
pub fn load_corpus(dir: &Path) -> Result<Vec<Document>, ApiError> {
    if !dir.is_dir() {
        return Err(ApiError::Internal(format!(
            "corpus directory not found: {}",
            dir.display()
        )));
    }

    let mut paths: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .map(|ext| ext.eq_ignore_ascii_case("txt"))
                .unwrap_or(false)
        })
        .collect();
    paths.sort();

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let text = fs::read_to_string(&path).map_err(|err| {
            ApiError::Internal(format!("failed to read {}: {}", path.display(), err))
        })?;
        if text.trim().is_empty() {
            continue;
        }
        documents.push(Document {
            text,
            source: path,
            page: None,
        });
    }

    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).expect("write fixture");
    }

    #[test]
    fn loads_txt_files_in_sorted_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(dir.path(), "b.txt", "second file");
        write(dir.path(), "a.txt", "first file");
        write(dir.path(), "notes.md", "ignored");
        write(dir.path(), "blank.txt", "   \n");

        let documents = load_corpus(dir.path()).expect("load should succeed");
        assert_eq!(documents.len(), 2);
        assert!(documents[0].source.ends_with("a.txt"));
        assert!(documents[1].source.ends_with("b.txt"));
        assert_eq!(documents[0].text, "first file");
        assert_eq!(documents[0].page, None);
    }

    #[test]
    fn empty_directory_yields_no_documents() {
        let dir = tempfile::tempdir().expect("tempdir");
        let documents = load_corpus(dir.path()).expect("load should succeed");
        assert!(documents.is_empty());
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("nope");
        assert!(load_corpus(&missing).is_err());
    }
}
