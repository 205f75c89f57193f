//! File changes and change-sets.
//!
//! A change-set is the domain-level description of the next commit: an
//! ordered list of path-level writes and deletes plus a commit message.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Serialize;

/// Content of a file write, fully resolved in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    /// UTF-8 text (JSON listings, markdown).
    Text(String),

    /// Raw bytes (images, icons).
    Binary(Vec<u8>),
}

impl FileContent {
    /// Encode for the blob API, which always carries base64.
    pub fn to_base64(&self) -> String {
        match self {
            Self::Text(text) => STANDARD.encode(text.as_bytes()),
            Self::Binary(bytes) => STANDARD.encode(bytes),
        }
    }

    /// Raw byte view of the content.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Binary(bytes) => bytes,
        }
    }

    /// Size in bytes before encoding.
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What happens to a path in the next commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeOperation {
    Write(FileContent),
    Delete,
}

/// One path-level change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    /// Repository-relative path, no leading slash.
    pub path: String,
    pub operation: ChangeOperation,
}

impl FileChange {
    pub fn is_write(&self) -> bool {
        matches!(self.operation, ChangeOperation::Write(_))
    }

    pub fn is_delete(&self) -> bool {
        matches!(self.operation, ChangeOperation::Delete)
    }

    /// Content of a write, `None` for deletes.
    pub fn content(&self) -> Option<&FileContent> {
        match &self.operation {
            ChangeOperation::Write(content) => Some(content),
            ChangeOperation::Delete => None,
        }
    }
}

/// Ordered file changes plus a commit message.
///
/// Holds at most one entry per path. A later write to a path replaces the
/// earlier entry in place; a delete never overrides a write already present
/// for the same path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    message: String,
    changes: Vec<FileChange>,
}

/// Counts reported to the UI before publishing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChangeSummary {
    pub writes: usize,
    pub deletes: usize,
}

impl ChangeSet {
    /// Create an empty change-set with a commit message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            changes: Vec::new(),
        }
    }

    /// Commit message for this change-set.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// All changes in insertion order.
    pub fn changes(&self) -> &[FileChange] {
        &self.changes
    }

    /// Write entries in insertion order.
    pub fn writes(&self) -> impl Iterator<Item = &FileChange> {
        self.changes.iter().filter(|c| c.is_write())
    }

    /// Delete entries in insertion order.
    pub fn deletes(&self) -> impl Iterator<Item = &FileChange> {
        self.changes.iter().filter(|c| c.is_delete())
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn summary(&self) -> ChangeSummary {
        ChangeSummary {
            writes: self.writes().count(),
            deletes: self.deletes().count(),
        }
    }

    /// Entry for `path`, if any.
    pub fn get(&self, path: &str) -> Option<&FileChange> {
        let path = normalize_path(path);
        self.changes.iter().find(|c| c.path == path)
    }

    /// Whether `path` is written by this change-set.
    pub fn writes_path(&self, path: &str) -> bool {
        self.get(path).is_some_and(FileChange::is_write)
    }

    /// Queue a UTF-8 text write.
    pub fn write_text(&mut self, path: impl AsRef<str>, text: impl Into<String>) {
        self.write(path, FileContent::Text(text.into()));
    }

    /// Queue a binary write.
    pub fn write_binary(&mut self, path: impl AsRef<str>, bytes: impl Into<Vec<u8>>) {
        self.write(path, FileContent::Binary(bytes.into()));
    }

    /// Queue a write, replacing any earlier entry for the same path.
    pub fn write(&mut self, path: impl AsRef<str>, content: FileContent) {
        let path = normalize_path(path.as_ref());
        let change = FileChange {
            path,
            operation: ChangeOperation::Write(content),
        };
        match self.changes.iter_mut().find(|c| c.path == change.path) {
            Some(existing) => *existing = change,
            None => self.changes.push(change),
        }
    }

    /// Queue a delete unless the path is already being written.
    pub fn delete(&mut self, path: impl AsRef<str>) {
        let path = normalize_path(path.as_ref());
        if self.changes.iter().any(|c| c.path == path) {
            return;
        }
        self.changes.push(FileChange {
            path,
            operation: ChangeOperation::Delete,
        });
    }
}

/// Strip leading slashes so every path is repository-relative.
fn normalize_path(path: &str) -> String {
    path.trim().trim_start_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_is_base64_encoded_as_utf8() {
        let content = FileContent::Text("héllo".to_string());
        assert_eq!(content.to_base64(), "aMOpbGxv");
        assert_eq!(content.len(), 6);
    }

    #[test]
    fn test_later_write_replaces_in_place() {
        let mut set = ChangeSet::new("msg");
        set.write_text("a.json", "1");
        set.write_text("b.json", "2");
        set.write_text("/a.json", "3");

        assert_eq!(set.len(), 2);
        assert_eq!(set.changes()[0].path, "a.json");
        assert_eq!(
            set.changes()[0].content(),
            Some(&FileContent::Text("3".to_string()))
        );
    }

    #[test]
    fn test_delete_does_not_override_write() {
        let mut set = ChangeSet::new("msg");
        set.write_binary("public/images/x.png", vec![1, 2, 3]);
        set.delete("public/images/x.png");
        set.delete("public/images/y.png");
        set.delete("public/images/y.png");

        assert_eq!(set.summary(), ChangeSummary { writes: 1, deletes: 1 });
        assert!(set.writes_path("public/images/x.png"));
        assert!(!set.writes_path("public/images/y.png"));
    }

    #[test]
    fn test_write_after_delete_wins() {
        let mut set = ChangeSet::new("msg");
        set.delete("a.png");
        set.write_binary("a.png", vec![9]);
        assert_eq!(set.len(), 1);
        assert!(set.writes_path("a.png"));
    }
}
