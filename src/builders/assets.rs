//! Shared asset handling for the change-set builders.
//!
//! Uploaded files are stored under a content-hash name so identical bytes
//! land on one path no matter how many slots reference them. Each domain
//! owns one asset directory; stale-asset deletion never reaches outside it.

use crate::error::AppError;
use crate::models::ChangeSet;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::Path;

/// A file picked in the editor but not yet published.
#[derive(Clone, PartialEq, Eq)]
pub struct PendingUpload {
    /// Name of the file as picked; only its extension is kept.
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for PendingUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingUpload")
            .field("file_name", &self.file_name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl PendingUpload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// Lowercased extension including the dot, or empty.
    pub fn extension(&self) -> String {
        Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext.to_lowercase()))
            .unwrap_or_default()
    }

    /// Hex SHA-256 of the bytes.
    pub fn content_hash(&self) -> String {
        hex::encode(Sha256::digest(&self.bytes))
    }

    /// `<sha256><ext>`, stable for identical bytes.
    pub fn hashed_file_name(&self) -> String {
        format!("{}{}", self.content_hash(), self.extension())
    }
}

/// Repository directory of a domain's assets and the public URL prefix that
/// maps onto it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetDir {
    repo_dir: String,
    public_prefix: String,
}

impl AssetDir {
    /// `repo_dir` like `public/images/project/`, `public_prefix` like `/images/project/`.
    pub fn new(repo_dir: impl Into<String>, public_prefix: impl Into<String>) -> Self {
        Self {
            repo_dir: with_trailing_slash(repo_dir.into()),
            public_prefix: with_trailing_slash(public_prefix.into()),
        }
    }

    pub fn public_prefix(&self) -> &str {
        &self.public_prefix
    }

    /// Whether `url` points into this directory.
    pub fn owns(&self, url: &str) -> bool {
        url.starts_with(&self.public_prefix)
    }

    /// Repository path backing a public URL owned by this directory.
    ///
    /// Returns `None` for URLs outside the directory, for the directory
    /// itself, and for anything that tries to climb out of it.
    pub fn repo_path_for(&self, url: &str) -> Option<String> {
        let name = url.strip_prefix(&self.public_prefix)?;
        let name = name.split(['?', '#']).next().unwrap_or_default();
        if name.is_empty() || name.split('/').any(|seg| seg.is_empty() || seg == "..") {
            return None;
        }
        Some(format!("{}{}", self.repo_dir, name))
    }

    /// Queue `upload` under its hashed name and return its public URL.
    ///
    /// Identical bytes are written once per change-set: a later upload with
    /// the same content reuses the first one's file, extension included.
    pub fn stage(&self, changes: &mut ChangeSet, upload: &PendingUpload) -> String {
        let file_name = match self.staged_name(changes, &upload.content_hash()) {
            Some(existing) => existing,
            None => {
                let file_name = upload.hashed_file_name();
                changes.write_binary(
                    format!("{}{}", self.repo_dir, file_name),
                    upload.bytes.clone(),
                );
                file_name
            }
        };
        format!("{}{}", self.public_prefix, file_name)
    }

    /// File name already written to this directory for content `hash`.
    fn staged_name(&self, changes: &ChangeSet, hash: &str) -> Option<String> {
        changes.writes().find_map(|change| {
            let name = change.path.strip_prefix(&self.repo_dir)?;
            let ext = name.strip_prefix(hash)?;
            (ext.is_empty() || (ext.starts_with('.') && !ext.contains('/')))
                .then(|| name.to_string())
        })
    }

    /// Queue a delete for every owned URL in `previous` that `current` no
    /// longer references.
    pub fn delete_stale<'a>(
        &self,
        changes: &mut ChangeSet,
        previous: impl IntoIterator<Item = &'a str>,
        current: &HashSet<&str>,
    ) -> usize {
        let mut deleted = 0;
        for url in previous {
            if current.contains(url) {
                continue;
            }
            if let Some(path) = self.repo_path_for(url) {
                if changes.get(&path).is_none() {
                    log::debug!("Removing unreferenced asset {}", path);
                    changes.delete(&path);
                    deleted += 1;
                }
            }
        }
        deleted
    }
}

fn with_trailing_slash(mut value: String) -> String {
    if !value.ends_with('/') {
        value.push('/');
    }
    value
}

/// Serialize a listing the way the site commits it: pretty, tab-indented.
pub fn to_tab_json<T: Serialize + ?Sized>(value: &T) -> Result<String, AppError> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer)?;
    String::from_utf8(out).map_err(|e| AppError::internal(format!("Invalid UTF-8 in JSON: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project_dir() -> AssetDir {
        AssetDir::new("public/images/project", "/images/project/")
    }

    #[test]
    fn test_hashed_file_name() {
        let upload = PendingUpload::new("Photo.JPG", b"abc".to_vec());
        assert_eq!(upload.extension(), ".jpg");
        assert_eq!(
            upload.hashed_file_name(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad.jpg"
        );
        assert_eq!(PendingUpload::new("README", vec![]).extension(), "");
    }

    #[test]
    fn test_repo_path_for() {
        let dir = project_dir();
        assert_eq!(
            dir.repo_path_for("/images/project/x.png"),
            Some("public/images/project/x.png".to_string())
        );
        assert_eq!(
            dir.repo_path_for("/images/project/x.png?v=2"),
            Some("public/images/project/x.png".to_string())
        );
        assert_eq!(dir.repo_path_for("/images/project/"), None);
        assert_eq!(dir.repo_path_for("/images/project/../avatar.png"), None);
        assert_eq!(dir.repo_path_for("/images/avatar.png"), None);
        assert_eq!(dir.repo_path_for("https://cdn.example.com/x.png"), None);
    }

    #[test]
    fn test_stage_dedups_identical_bytes() {
        let dir = project_dir();
        let mut set = ChangeSet::new("msg");
        let a = dir.stage(&mut set, &PendingUpload::new("a.png", vec![1, 2, 3]));
        let b = dir.stage(&mut set, &PendingUpload::new("b.PNG", vec![1, 2, 3]));
        assert_eq!(a, b);
        assert!(a.starts_with("/images/project/"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_stage_dedups_identical_bytes_across_extensions() {
        let dir = project_dir();
        let mut set = ChangeSet::new("msg");
        let png = dir.stage(&mut set, &PendingUpload::new("x.png", vec![7; 10]));
        let jpg = dir.stage(&mut set, &PendingUpload::new("y.jpg", vec![7; 10]));

        assert_eq!(png, jpg);
        assert!(png.ends_with(".png"));
        assert_eq!(set.summary().writes, 1);
    }

    #[test]
    fn test_stage_keeps_distinct_bytes_apart() {
        let dir = project_dir();
        let mut set = ChangeSet::new("msg");
        let a = dir.stage(&mut set, &PendingUpload::new("a.png", vec![1]));
        let b = dir.stage(&mut set, &PendingUpload::new("b.png", vec![2]));
        assert_ne!(a, b);
        assert_eq!(set.summary().writes, 2);
    }

    #[test]
    fn test_delete_stale_only_owned_and_unreferenced() {
        let dir = project_dir();
        let mut set = ChangeSet::new("msg");
        let current: HashSet<&str> = ["/images/project/a.png"].into_iter().collect();
        let previous = [
            "/images/project/a.png",
            "/images/project/b.png",
            "/images/avatar.png",
            "https://example.com/c.png",
        ];

        assert_eq!(dir.delete_stale(&mut set, previous, &current), 1);
        assert_eq!(set.deletes().count(), 1);
        assert_eq!(set.changes()[0].path, "public/images/project/b.png");
    }

    #[test]
    fn test_tab_json() {
        let json = to_tab_json(&serde_json::json!({"a": [1]})).unwrap();
        assert_eq!(json, "{\n\t\"a\": [\n\t\t1\n\t]\n}");
    }

    #[test]
    fn test_tab_json_keeps_key_order() {
        let value: serde_json::Value = serde_json::from_str(r#"{"zeta":1,"alpha":2}"#).unwrap();
        let json = to_tab_json(&value).unwrap();
        assert_eq!(json, "{\n\t\"zeta\": 1,\n\t\"alpha\": 2\n}");
    }
}
