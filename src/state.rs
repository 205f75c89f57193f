//! Process-wide application state.
//!
//! Wires the session context, vault, token broker and pipeline together.
//! The embedding application builds one `AppState` at startup and hands a
//! reference to every command.

use crate::config::AppSettings;
use crate::error::AppError;
use crate::services::{
    store_from_settings, AppInstallationApi, CredentialStore, CredentialVault, GitHost,
    GitHubClient, GitPipeline, PublishEvents, SessionContext, TokenBroker,
};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

pub struct AppState {
    settings: AppSettings,
    session: SessionContext,
    vault: CredentialVault,
    pipeline: GitPipeline,
    publish_guard: Mutex<()>,
}

impl AppState {
    /// Production wiring: the configured credential backend and the real
    /// GitHub API.
    pub fn new(settings: AppSettings) -> Result<Self, AppError> {
        let client = Arc::new(GitHubClient::new((&settings.github).into())?);
        let store = store_from_settings(&settings.storage);
        Ok(Self::with_parts(settings, store, client.clone(), client))
    }

    /// Wire the state from explicit parts.
    pub fn with_parts(
        settings: AppSettings,
        store: Arc<dyn CredentialStore>,
        host: Arc<dyn GitHost>,
        installations: Arc<dyn AppInstallationApi>,
    ) -> Self {
        let session = SessionContext::new();
        let vault = CredentialVault::new(store, session.clone());
        let broker = Arc::new(TokenBroker::new(
            session.clone(),
            installations,
            settings.github.app_id.clone(),
        ));
        let pipeline = GitPipeline::new(host, broker, settings.github.clone(), PublishEvents::new());

        Self {
            settings,
            session,
            vault,
            pipeline,
            publish_guard: Mutex::new(()),
        }
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn vault(&self) -> &CredentialVault {
        &self.vault
    }

    pub fn pipeline(&self) -> &GitPipeline {
        &self.pipeline
    }

    pub fn events(&self) -> &PublishEvents {
        self.pipeline.events()
    }

    /// Claim the single publish slot; fails instead of queueing.
    pub(crate) fn try_begin_publish(&self) -> Result<MutexGuard<'_, ()>, AppError> {
        self.publish_guard
            .try_lock()
            .map_err(|_| AppError::invalid_input("Another publish is already in progress"))
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
