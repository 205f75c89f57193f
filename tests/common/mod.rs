//! Shared fakes for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use site_publisher_lib::config::{AppSettings, GitHubSettings, RepoTarget};
use site_publisher_lib::error::AppError;
use site_publisher_lib::models::TreeEntry;
use site_publisher_lib::services::{AppInstallationApi, GitHost, MemoryCredentialStore};
use site_publisher_lib::AppState;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const TIP_SHA: &str = "tip0000000000000000000000000000000000000";
pub const TREE_SHA: &str = "tree000000000000000000000000000000000000";
pub const COMMIT_SHA: &str = "commit0000000000000000000000000000000000";
pub const INSTALLATION_TOKEN: &str = "ghs_test_installation_token";

/// The fixture key used to sign real JWTs.
pub fn test_private_key() -> String {
    std::fs::read_to_string(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/test_app_key.pem"
    ))
    .expect("fixture key")
}

pub fn test_settings() -> AppSettings {
    AppSettings {
        github: GitHubSettings {
            owner: "octo".to_string(),
            repo: "site".to_string(),
            app_id: "424242".to_string(),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// One call made against the fake host.
#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    RefLookup,
    Blob { content_base64: String },
    Tree { base_tree: String, entries: Vec<TreeEntry> },
    Commit { message: String, tree: String, parent: String },
    RefUpdate { sha: String },
    Read { path: String },
}

/// Stage at which the fake host should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    RefLookup,
    Blob,
    Tree,
    Commit,
    RefUpdate,
}

/// In-memory git host recording every call in order.
#[derive(Default)]
pub struct RecordingHost {
    calls: Mutex<Vec<HostCall>>,
    tokens: Mutex<Vec<String>>,
    failure: Mutex<Option<(FailAt, AppError)>>,
    files: Mutex<HashMap<String, Vec<u8>>>,
    blob_counter: AtomicUsize,
}

impl RecordingHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn tokens(&self) -> Vec<String> {
        self.tokens.lock().unwrap().clone()
    }

    pub fn fail_at(&self, stage: FailAt, error: AppError) {
        *self.failure.lock().unwrap() = Some((stage, error));
    }

    pub fn clear_failure(&self) {
        *self.failure.lock().unwrap() = None;
    }

    pub fn put_file(&self, path: &str, content: &str) {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), content.as_bytes().to_vec());
    }

    fn record(&self, token: &str, call: HostCall) {
        self.tokens.lock().unwrap().push(token.to_string());
        self.calls.lock().unwrap().push(call);
    }

    fn check(&self, stage: FailAt) -> Result<(), AppError> {
        let mut failure = self.failure.lock().unwrap();
        match failure.take() {
            Some((at, err)) if at == stage => Err(err),
            other => {
                *failure = other;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl GitHost for RecordingHost {
    async fn get_branch_tip(&self, token: &str, _target: &RepoTarget) -> Result<String, AppError> {
        self.record(token, HostCall::RefLookup);
        self.check(FailAt::RefLookup)?;
        Ok(TIP_SHA.to_string())
    }

    async fn create_blob(
        &self,
        token: &str,
        _target: &RepoTarget,
        content_base64: &str,
    ) -> Result<String, AppError> {
        self.record(
            token,
            HostCall::Blob {
                content_base64: content_base64.to_string(),
            },
        );
        self.check(FailAt::Blob)?;
        let n = self.blob_counter.fetch_add(1, Ordering::SeqCst);
        Ok(format!("blob{:036}", n))
    }

    async fn create_tree(
        &self,
        token: &str,
        _target: &RepoTarget,
        base_tree: &str,
        entries: &[TreeEntry],
    ) -> Result<String, AppError> {
        self.record(
            token,
            HostCall::Tree {
                base_tree: base_tree.to_string(),
                entries: entries.to_vec(),
            },
        );
        self.check(FailAt::Tree)?;
        Ok(TREE_SHA.to_string())
    }

    async fn create_commit(
        &self,
        token: &str,
        _target: &RepoTarget,
        message: &str,
        tree: &str,
        parent: &str,
    ) -> Result<String, AppError> {
        self.record(
            token,
            HostCall::Commit {
                message: message.to_string(),
                tree: tree.to_string(),
                parent: parent.to_string(),
            },
        );
        self.check(FailAt::Commit)?;
        Ok(COMMIT_SHA.to_string())
    }

    async fn update_branch(
        &self,
        token: &str,
        _target: &RepoTarget,
        commit_sha: &str,
    ) -> Result<(), AppError> {
        self.record(
            token,
            HostCall::RefUpdate {
                sha: commit_sha.to_string(),
            },
        );
        self.check(FailAt::RefUpdate)
    }

    async fn read_file(
        &self,
        token: &str,
        _target: &RepoTarget,
        path: &str,
    ) -> Result<Option<Vec<u8>>, AppError> {
        self.record(
            token,
            HostCall::Read {
                path: path.to_string(),
            },
        );
        Ok(self.files.lock().unwrap().get(path).cloned())
    }
}

/// Installation API fake counting exchanges.
#[derive(Default)]
pub struct CountingInstallations {
    lookups: AtomicUsize,
    exchanges: AtomicUsize,
    reject: Mutex<Option<AppError>>,
}

impl CountingInstallations {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn exchanges(&self) -> usize {
        self.exchanges.load(Ordering::SeqCst)
    }

    /// Fail the next installation lookup with `error`.
    pub fn reject_next(&self, error: AppError) {
        *self.reject.lock().unwrap() = Some(error);
    }
}

#[async_trait]
impl AppInstallationApi for CountingInstallations {
    async fn installation_id(&self, jwt: &str, owner: &str, repo: &str) -> Result<u64, AppError> {
        assert_eq!(jwt.split('.').count(), 3, "app JWT must have three segments");
        assert_eq!((owner, repo), ("octo", "site"));
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.reject.lock().unwrap().take() {
            return Err(err);
        }
        Ok(77)
    }

    async fn installation_token(&self, _jwt: &str, installation_id: u64) -> Result<String, AppError> {
        assert_eq!(installation_id, 77);
        let n = self.exchanges.fetch_add(1, Ordering::SeqCst);
        if n == 0 {
            Ok(INSTALLATION_TOKEN.to_string())
        } else {
            Ok(format!("{}_{}", INSTALLATION_TOKEN, n))
        }
    }
}

/// App state over in-memory fakes.
pub fn fake_state(
    settings: AppSettings,
) -> (AppState, Arc<RecordingHost>, Arc<CountingInstallations>) {
    let host = RecordingHost::new();
    let installations = CountingInstallations::new();
    let state = AppState::with_parts(
        settings,
        Arc::new(MemoryCredentialStore::new()),
        host.clone(),
        installations.clone(),
    );
    (state, host, installations)
}

/// Fake state with the fixture key already unlocked.
pub async fn unlocked_state() -> (AppState, Arc<RecordingHost>, Arc<CountingInstallations>) {
    let (state, host, installations) = fake_state(test_settings());
    state
        .vault()
        .initialize(test_private_key().as_bytes(), "secret123")
        .await
        .expect("vault setup");
    (state, host, installations)
}
