//! GitHub git-data and app-installation wire types.

use serde::{Deserialize, Serialize};

/// File mode for regular (non-executable) blobs.
pub const REGULAR_FILE_MODE: &str = "100644";

/// Response of `GET /repos/:owner/:repo/git/ref/:ref`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitRefResponse {
    #[serde(rename = "ref")]
    pub ref_name: String,
    pub object: GitObjectPointer,
}

/// Object a ref points at.
#[derive(Debug, Clone, Deserialize)]
pub struct GitObjectPointer {
    pub sha: String,
    #[serde(rename = "type")]
    pub object_type: String,
}

/// Body of `POST /repos/:owner/:repo/git/blobs`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateBlobRequest<'a> {
    pub content: &'a str,
    pub encoding: &'a str,
}

/// Any created git object; only the SHA matters to the pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct GitObjectResponse {
    pub sha: String,
}

/// One entry of a tree creation request.
///
/// `sha: None` serializes as `null`, which removes the path from the base tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeEntry {
    pub path: String,
    pub mode: String,
    #[serde(rename = "type")]
    pub entry_type: String,
    pub sha: Option<String>,
}

impl TreeEntry {
    /// Entry pointing `path` at an uploaded blob.
    pub fn blob(path: impl Into<String>, sha: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mode: REGULAR_FILE_MODE.to_string(),
            entry_type: "blob".to_string(),
            sha: Some(sha.into()),
        }
    }

    /// Entry removing `path`.
    pub fn deletion(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mode: REGULAR_FILE_MODE.to_string(),
            entry_type: "blob".to_string(),
            sha: None,
        }
    }
}

/// Body of `POST /repos/:owner/:repo/git/trees`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateTreeRequest<'a> {
    pub base_tree: &'a str,
    pub tree: &'a [TreeEntry],
}

/// Body of `POST /repos/:owner/:repo/git/commits`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateCommitRequest<'a> {
    pub message: &'a str,
    pub tree: &'a str,
    pub parents: Vec<&'a str>,
}

/// Body of `PATCH /repos/:owner/:repo/git/refs/:ref`.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateRefRequest<'a> {
    pub sha: &'a str,
    pub force: bool,
}

/// Response of `GET /repos/:owner/:repo/installation`.
#[derive(Debug, Clone, Deserialize)]
pub struct InstallationResponse {
    pub id: u64,
}

/// Response of `POST /app/installations/:id/access_tokens`.
#[derive(Debug, Clone, Deserialize)]
pub struct InstallationTokenResponse {
    pub token: String,
    pub expires_at: Option<String>,
}

/// Response of `GET /repos/:owner/:repo/contents/:path`.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentResponse {
    pub sha: String,
    pub content: Option<String>,
    pub encoding: Option<String>,
}

/// Result of a successful publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishOutcome {
    /// New branch tip.
    pub commit_sha: String,

    /// Tree of the new commit.
    pub tree_sha: String,

    /// Tip observed at the start of the publish.
    pub parent_sha: String,

    /// Number of blobs uploaded.
    pub blobs_created: usize,

    /// Number of paths removed.
    pub paths_deleted: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deletion_serializes_null_sha() {
        let json = serde_json::to_value(TreeEntry::deletion("public/a.png")).unwrap();
        assert_eq!(json["sha"], serde_json::Value::Null);
        assert_eq!(json["mode"], "100644");
        assert_eq!(json["type"], "blob");
    }

    #[test]
    fn test_ref_response_parses() {
        let raw = r#"{"ref":"refs/heads/main","node_id":"x","url":"u","object":{"sha":"abc","type":"commit","url":"u"}}"#;
        let parsed: GitRefResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.ref_name, "refs/heads/main");
        assert_eq!(parsed.object.sha, "abc");
        assert_eq!(parsed.object.object_type, "commit");
    }
}
