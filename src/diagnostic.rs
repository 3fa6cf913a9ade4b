//! Indexing diagnostics stored alongside the graph
//!
//! Diagnostics are plain data: they reference a file by path, not by node
//! id, so they survive the removal of the file's graph rows.

use crate::Id;
use serde::{Deserialize, Serialize};

/// A parse or indexing error reported for a source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageDiagnostic {
    pub id: Id,
    pub message: String,
    pub file_path: String,
    pub line: u32,
    pub column: u32,
    /// Indexing of the file was aborted
    pub fatal: bool,
    /// The file was still (partially) indexed
    pub indexed: bool,
}

impl StorageDiagnostic {
    pub fn severity(&self) -> &'static str {
        if self.fatal { "fatal" } else { "error" }
    }
}

impl std::fmt::Display for StorageDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}: {}",
            self.file_path,
            self.line,
            self.column,
            self.severity(),
            self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let diagnostic = StorageDiagnostic {
            id: 1,
            message: "unexpected token".to_string(),
            file_path: "a.cpp".to_string(),
            line: 5,
            column: 3,
            fatal: false,
            indexed: true,
        };
        assert_eq!(diagnostic.to_string(), "a.cpp:5:3: error: unexpected token");
    }
}
