//! Content sources: where raw documents come from.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use sitesync_core::CanonicalPath;

use crate::error::{io_err, SyncError};

/// Enumerates and reads source documents.
pub trait ContentSource: Send + Sync {
    /// Directory every canonical path is relative to.
    fn root(&self) -> &Path;

    /// Every document of the recognized extension, sorted.
    fn list_documents(&self) -> Result<Vec<CanonicalPath>, SyncError>;

    /// Raw text of one document.
    fn read_document(&self, path: &CanonicalPath) -> Result<String, SyncError>;

    /// Map a change-notification path to a document, or `None` when the path
    /// is outside the root or has another extension.
    fn resolve(&self, changed: &Path) -> Option<CanonicalPath>;
}

/// Documents stored as files under a directory tree.
#[derive(Debug, Clone)]
pub struct FsContentSource {
    root: PathBuf,
    /// `root` with symlinks resolved; watcher events arrive as real paths.
    canonical_root: Option<PathBuf>,
    extension: String,
}

impl FsContentSource {
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        let root = root.into();
        let canonical_root = fs::canonicalize(&root).ok();
        Self {
            root,
            canonical_root,
            extension: extension.into(),
        }
    }

    fn has_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case(&self.extension))
            .unwrap_or(false)
    }

    fn relative_to_root<'a>(&self, path: &'a Path) -> Option<&'a Path> {
        path.strip_prefix(&self.root).ok().or_else(|| {
            self.canonical_root
                .as_ref()
                .and_then(|root| path.strip_prefix(root).ok())
        })
    }
}

impl ContentSource for FsContentSource {
    fn root(&self) -> &Path {
        &self.root
    }

    fn list_documents(&self) -> Result<Vec<CanonicalPath>, SyncError> {
        let mut documents = Vec::new();
        for dir in collect_dirs(&self.root)? {
            let entries = fs::read_dir(&dir).map_err(|e| io_err(&dir, e))?;
            for entry in entries {
                let entry = entry.map_err(|e| io_err(&dir, e))?;
                let path = entry.path();
                let ty = entry.file_type().map_err(|e| io_err(&path, e))?;
                if !ty.is_file() || !self.has_extension(&path) {
                    continue;
                }
                if let Some(canonical) = self
                    .relative_to_root(&path)
                    .and_then(CanonicalPath::from_relative)
                {
                    documents.push(canonical);
                }
            }
        }
        documents.sort();
        Ok(documents)
    }

    fn read_document(&self, path: &CanonicalPath) -> Result<String, SyncError> {
        let full = self.root.join(path.as_str());
        fs::read_to_string(&full).map_err(|e| io_err(full, e))
    }

    fn resolve(&self, changed: &Path) -> Option<CanonicalPath> {
        if !self.has_extension(changed) {
            return None;
        }
        if changed.is_relative() {
            return CanonicalPath::from_relative(changed);
        }
        if let Some(relative) = self.relative_to_root(changed) {
            return CanonicalPath::from_relative(relative);
        }
        let real = fs::canonicalize(changed).ok()?;
        self.relative_to_root(&real)
            .and_then(CanonicalPath::from_relative)
    }
}

/// Breadth-first list of `root` and every directory below it.
///
/// A missing root is an error: a pass over nothing would silently publish
/// nothing. Subdirectories removed during the walk are skipped.
pub fn collect_dirs(root: &Path) -> Result<Vec<PathBuf>, SyncError> {
    let meta = fs::metadata(root).map_err(|e| io_err(root, e))?;
    if !meta.is_dir() {
        return Err(io_err(
            root,
            std::io::Error::new(ErrorKind::InvalidInput, "content root is not a directory"),
        ));
    }

    let mut dirs = vec![root.to_path_buf()];
    let mut cursor = 0;
    while cursor < dirs.len() {
        let current = dirs[cursor].clone();
        cursor += 1;
        let entries = match fs::read_dir(&current) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => continue,
            Err(err) => return Err(io_err(&current, err)),
        };
        for entry in entries {
            let entry = entry.map_err(|e| io_err(&current, e))?;
            let ty = entry.file_type().map_err(|e| io_err(entry.path(), e))?;
            if ty.is_dir() {
                dirs.push(entry.path());
            }
        }
    }
    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, body: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    #[test]
    fn lists_matching_files_recursively_and_sorted() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "b.md", "");
        write(tmp.path(), "2024/a.md", "");
        write(tmp.path(), "2024/notes.txt", "");
        write(tmp.path(), "UPPER.MD", "");

        let source = FsContentSource::new(tmp.path(), "md");
        let docs = source.list_documents().unwrap();
        let names: Vec<&str> = docs.iter().map(CanonicalPath::as_str).collect();
        assert_eq!(names, vec!["2024/a.md", "UPPER.MD", "b.md"]);
    }

    #[test]
    fn collect_dirs_lists_root_and_nested_directories() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "2024/03/post.md", "");
        write(tmp.path(), "drafts/idea.md", "");
        write(tmp.path(), "top.md", "");

        let mut dirs = collect_dirs(tmp.path()).unwrap();
        dirs.sort();
        assert_eq!(
            dirs,
            vec![
                tmp.path().to_path_buf(),
                tmp.path().join("2024"),
                tmp.path().join("2024/03"),
                tmp.path().join("drafts"),
            ]
        );
    }

    #[test]
    fn collect_dirs_rejects_a_file_root() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "top.md", "");
        assert!(matches!(
            collect_dirs(&tmp.path().join("top.md")),
            Err(SyncError::Io { .. })
        ));
    }

    #[test]
    fn missing_root_is_a_pass_level_error() {
        let tmp = TempDir::new().unwrap();
        let source = FsContentSource::new(tmp.path().join("nope"), "md");
        assert!(matches!(source.list_documents(), Err(SyncError::Io { .. })));
    }

    #[test]
    fn read_document_returns_raw_text() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "post.md", "---\ntitle: x\n---\n");
        let source = FsContentSource::new(tmp.path(), "md");
        let text = source.read_document(&CanonicalPath::from("post.md")).unwrap();
        assert!(text.starts_with("---"));
    }

    #[test]
    fn resolve_filters_extension_and_root() {
        let tmp = TempDir::new().unwrap();
        let source = FsContentSource::new(tmp.path(), "md");

        let inside = tmp.path().join("2024").join("post.md");
        assert_eq!(
            source.resolve(&inside),
            Some(CanonicalPath::from("2024/post.md"))
        );
        assert_eq!(source.resolve(&tmp.path().join("post.txt")), None);
        assert_eq!(source.resolve(Path::new("/elsewhere/post.md")), None);
        assert_eq!(
            source.resolve(Path::new("rel/post.md")),
            Some(CanonicalPath::from("rel/post.md"))
        );
    }
}
