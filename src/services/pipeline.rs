//! Git object publish pipeline.
//!
//! Turns a [`ChangeSet`] into exactly one commit on the configured branch:
//!
//! 1. RefLookup: read the branch tip.
//! 2. BlobCreation: upload every write (concurrently, all before stage 3).
//! 3. TreeCreation: layer writes and null-SHA deletes onto the tip's tree.
//! 4. CommitCreation: one commit whose only parent is the tip from stage 1.
//! 5. RefUpdate: force-move the branch to the new commit.
//!
//! Any failure aborts the run. Objects created before the failure stay
//! unreferenced on the remote; only stage 5 is visible to readers.

use crate::config::{GitHubSettings, RepoTarget};
use crate::error::AppError;
use crate::models::{ChangeOperation, ChangeSet, PublishOutcome, TreeEntry};
use crate::services::github_client::GitHost;
use crate::services::publish_events::{PublishEvents, PublishPhase};
use crate::services::token_broker::TokenBroker;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Blob uploads in flight at once.
pub const DEFAULT_BLOB_CONCURRENCY: usize = 4;

/// The five git stages of a publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    RefLookup,
    BlobCreation,
    TreeCreation,
    CommitCreation,
    RefUpdate,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RefLookup => "RefLookup",
            Self::BlobCreation => "BlobCreation",
            Self::TreeCreation => "TreeCreation",
            Self::CommitCreation => "CommitCreation",
            Self::RefUpdate => "RefUpdate",
        };
        f.write_str(name)
    }
}

/// Publishes change-sets to one GitHub branch.
pub struct GitPipeline {
    host: Arc<dyn GitHost>,
    broker: Arc<TokenBroker>,
    settings: GitHubSettings,
    events: PublishEvents,
    blob_concurrency: usize,
}

impl GitPipeline {
    pub fn new(
        host: Arc<dyn GitHost>,
        broker: Arc<TokenBroker>,
        settings: GitHubSettings,
        events: PublishEvents,
    ) -> Self {
        Self {
            host,
            broker,
            settings,
            events,
            blob_concurrency: DEFAULT_BLOB_CONCURRENCY,
        }
    }

    /// Override how many blob uploads run concurrently (minimum 1).
    pub fn with_blob_concurrency(mut self, limit: usize) -> Self {
        self.blob_concurrency = limit.max(1);
        self
    }

    pub fn events(&self) -> &PublishEvents {
        &self.events
    }

    /// Commit `changes` to the configured branch.
    pub async fn publish(&self, changes: &ChangeSet) -> Result<PublishOutcome, AppError> {
        if changes.is_empty() {
            return Err(AppError::invalid_input("Nothing to publish"));
        }

        let result = self.run(changes).await;
        match &result {
            Ok(outcome) => {
                log::info!(
                    "Published {} as {} ({} blobs, {} deletions)",
                    changes.message(),
                    outcome.commit_sha,
                    outcome.blobs_created,
                    outcome.paths_deleted
                );
                self.events
                    .phase(PublishPhase::Complete, format!("Published {}", outcome.commit_sha));
            }
            Err(err) => {
                if err.is_auth_failure() {
                    self.broker.invalidate().await;
                }
                log::error!("Publish failed: {}", err);
                self.events.failed(err.to_string());
            }
        }
        result
    }

    async fn run(&self, changes: &ChangeSet) -> Result<PublishOutcome, AppError> {
        // Configuration problems surface before any token is brokered
        let target = self.settings.repo_target()?;

        self.events
            .phase(PublishPhase::Authenticating, "Obtaining installation token");
        let token = self.broker.get_auth_token(&target).await?;

        self.events.phase(
            PublishPhase::LookingUpRef,
            format!("Reading {}", target.ref_path()),
        );
        let parent_sha = self
            .host
            .get_branch_tip(&token, &target)
            .await
            .map_err(ref_lookup_error)?;
        log::debug!("Branch {} at {}", target.branch, parent_sha);

        let blob_shas = self.upload_blobs(&token, &target, changes).await?;

        self.events
            .phase(PublishPhase::CreatingTree, "Assembling tree");
        let entries = tree_entries(changes, &blob_shas)?;
        let tree_sha = self
            .host
            .create_tree(&token, &target, &parent_sha, &entries)
            .await
            .map_err(|e| stage_error(PipelineStage::TreeCreation, e))?;

        self.events
            .phase(PublishPhase::CreatingCommit, "Creating commit");
        let commit_sha = self
            .host
            .create_commit(&token, &target, changes.message(), &tree_sha, &parent_sha)
            .await
            .map_err(|e| stage_error(PipelineStage::CommitCreation, e))?;

        self.events.phase(
            PublishPhase::UpdatingRef,
            format!("Moving {} to {}", target.branch, commit_sha),
        );
        self.host
            .update_branch(&token, &target, &commit_sha)
            .await
            .map_err(|e| stage_error(PipelineStage::RefUpdate, e))?;

        Ok(PublishOutcome {
            commit_sha,
            tree_sha,
            parent_sha,
            blobs_created: blob_shas.len(),
            paths_deleted: changes.deletes().count(),
        })
    }

    /// Upload every write, returning blob SHAs in write order.
    async fn upload_blobs(
        &self,
        token: &str,
        target: &RepoTarget,
        changes: &ChangeSet,
    ) -> Result<Vec<String>, AppError> {
        let contents: Vec<_> = changes.writes().filter_map(|c| c.content()).collect();
        let total = contents.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        self.events
            .progress(PublishPhase::UploadingBlobs, "Uploading files", 0, total);
        let done = AtomicUsize::new(0);
        let host = &self.host;
        let events = &self.events;
        let done = &done;

        stream::iter(contents)
            .map(|content| async move {
                let encoded = content.to_base64();
                let sha = host
                    .create_blob(token, target, &encoded)
                    .await
                    .map_err(|e| stage_error(PipelineStage::BlobCreation, e))?;
                let processed = done.fetch_add(1, Ordering::SeqCst) + 1;
                events.progress(
                    PublishPhase::UploadingBlobs,
                    "Uploading files",
                    processed,
                    total,
                );
                Ok::<_, AppError>(sha)
            })
            .buffered(self.blob_concurrency)
            .try_collect()
            .await
    }

    /// Read a UTF-8 file from the branch, `None` if it does not exist.
    pub async fn read_text_file(&self, path: &str) -> Result<Option<String>, AppError> {
        let target = self.settings.repo_target()?;
        let token = self.broker.get_auth_token(&target).await?;

        let bytes = match self.host.read_file(&token, &target, path).await {
            Ok(bytes) => bytes,
            Err(err) => {
                if err.is_auth_failure() {
                    self.broker.invalidate().await;
                }
                return Err(err);
            }
        };

        bytes
            .map(|b| {
                String::from_utf8(b)
                    .map_err(|_| AppError::internal(format!("{} is not valid UTF-8", path)))
            })
            .transpose()
    }

    /// Read and parse a JSON file from the branch, `None` if it does not exist.
    pub async fn read_json_file<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Option<T>, AppError> {
        match self.read_text_file(path).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| AppError::internal(format!("Invalid JSON in {}: {}", path, e))),
            None => Ok(None),
        }
    }
}

/// Tree entries in change-set order; writes consume `blob_shas` in order.
fn tree_entries(changes: &ChangeSet, blob_shas: &[String]) -> Result<Vec<TreeEntry>, AppError> {
    let mut shas = blob_shas.iter();
    changes
        .changes()
        .iter()
        .map(|change| match &change.operation {
            ChangeOperation::Write(_) => shas
                .next()
                .map(|sha| TreeEntry::blob(&change.path, sha))
                .ok_or_else(|| AppError::internal("Missing blob for write")),
            ChangeOperation::Delete => Ok(TreeEntry::deletion(&change.path)),
        })
        .collect()
}

/// A 401 stays `UpstreamAuth` so the stale token gets dropped; any other
/// failure to resolve the branch means the repository is unavailable.
fn ref_lookup_error(err: AppError) -> AppError {
    match err {
        AppError::UpstreamAuth { .. } => err,
        AppError::GitHubApi {
            message,
            status_code: Some(status),
            ..
        } => AppError::repo_unavailable_status(message, status),
        AppError::GitHubApi { message, .. } | AppError::Network { message } => {
            AppError::repo_unavailable(message)
        }
        other => other,
    }
}

/// Wrap a failure after authentication with the stage it happened in.
fn stage_error(stage: PipelineStage, err: AppError) -> AppError {
    match err {
        AppError::UpstreamAuth { .. } => err,
        AppError::GitHubApi {
            message,
            status_code,
            ..
        } => AppError::pipeline_stage(stage.to_string(), message, status_code),
        AppError::Network { message } | AppError::Internal { message } => {
            AppError::pipeline_stage(stage.to_string(), message, None)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_entries_follow_change_order() {
        let mut set = ChangeSet::new("msg");
        set.write_text("a.json", "{}");
        set.delete("old.png");
        set.write_binary("b.png", vec![1]);

        let entries = tree_entries(&set, &["sha-a".to_string(), "sha-b".to_string()]).unwrap();
        assert_eq!(
            entries,
            vec![
                TreeEntry::blob("a.json", "sha-a"),
                TreeEntry::deletion("old.png"),
                TreeEntry::blob("b.png", "sha-b"),
            ]
        );
    }

    #[test]
    fn test_tree_entries_require_every_blob() {
        let mut set = ChangeSet::new("msg");
        set.write_text("a.json", "{}");
        assert!(tree_entries(&set, &[]).is_err());
    }

    #[test]
    fn test_ref_lookup_not_found_is_repo_unavailable() {
        let err = ref_lookup_error(AppError::github_api_full("Not Found", 404, "/repos/o/r"));
        assert!(matches!(
            err,
            AppError::RepoUnavailable {
                status_code: Some(404),
                ..
            }
        ));

        let err = ref_lookup_error(AppError::network("Request timed out"));
        assert!(matches!(err, AppError::RepoUnavailable { .. }));

        let err = ref_lookup_error(AppError::upstream_auth_status("Bad credentials", 401));
        assert!(err.is_auth_failure());
    }

    #[test]
    fn test_stage_error_keeps_remote_message() {
        let err = stage_error(
            PipelineStage::CommitCreation,
            AppError::github_api_full("Git Repository is empty.", 409, "/repos/o/r/git/commits"),
        );
        assert_eq!(err.to_string(), "CommitCreation failed: Git Repository is empty.");
        assert_eq!(err.status_code(), Some(409));
    }
}
