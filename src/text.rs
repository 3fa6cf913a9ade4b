//! File content access
//!
//! The store never keeps file bodies. Content requests are passed through to
//! a `TextAccess` collaborator, by default the local file system.

use crate::Result;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Text of one file at the time it was read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContent {
    pub path: PathBuf,
    pub text: String,
}

impl FileContent {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }

    /// Number of lines, counting a trailing line without newline
    pub fn line_count(&self) -> u32 {
        self.text.lines().count() as u32
    }

    /// 1-based line lookup
    pub fn line(&self, number: u32) -> Option<&str> {
        let index = usize::try_from(number).ok()?.checked_sub(1)?;
        self.text.lines().nth(index)
    }
}

/// Path-addressed text retrieval.
pub trait TextAccess {
    /// `Ok(None)` when nothing exists at `path`
    fn read(&self, path: &Path) -> Result<Option<FileContent>>;
}

/// Reads from the local file system.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileSystemTextAccess;

impl TextAccess for FileSystemTextAccess {
    fn read(&self, path: &Path) -> Result<Option<FileContent>> {
        match std::fs::read(path) {
            Ok(bytes) => Ok(Some(FileContent::new(
                path,
                String::from_utf8_lossy(&bytes).into_owned(),
            ))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory file contents, for embedding callers and tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryTextAccess {
    files: HashMap<PathBuf, String>,
}

impl MemoryTextAccess {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        self.files.insert(path.into(), text.into());
        self
    }
}

impl TextAccess for MemoryTextAccess {
    fn read(&self, path: &Path) -> Result<Option<FileContent>> {
        Ok(self
            .files
            .get(path)
            .map(|text| FileContent::new(path, text.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_count_and_lookup() {
        let content = FileContent::new("a.cpp", "int a;\nint b;\nint c;");
        assert_eq!(content.line_count(), 3);
        assert_eq!(content.line(2), Some("int b;"));
        assert_eq!(content.line(0), None);
        assert_eq!(content.line(4), None);
    }

    #[test]
    fn test_file_system_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let access = FileSystemTextAccess;
        assert!(access.read(&dir.path().join("missing.cpp")).unwrap().is_none());

        let path = dir.path().join("present.cpp");
        std::fs::write(&path, "x\ny\n").unwrap();
        let content = access.read(&path).unwrap().unwrap();
        assert_eq!(content.line_count(), 2);
    }

    #[test]
    fn test_memory_access() {
        let access = MemoryTextAccess::new().with_file("a.cpp", "one\ntwo\n");
        assert_eq!(access.read(Path::new("a.cpp")).unwrap().unwrap().line_count(), 2);
        assert!(access.read(Path::new("b.cpp")).unwrap().is_none());
    }
}
