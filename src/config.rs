//! Application settings.
//!
//! Settings are persisted as a small JSON file next to the site checkout.
//! Missing files and missing keys fall back to defaults.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default settings filename.
pub const SETTINGS_FILE: &str = "settings.json";

/// Placeholder some deployments leave in unset owner/repo fields.
const UNSET_PLACEHOLDER: &str = "-";

/// Application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppSettings {
    /// GitHub App and target repository.
    pub github: GitHubSettings,

    /// Durable storage locations.
    pub storage: StorageSettings,
}

/// GitHub App identity and the repository it publishes to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GitHubSettings {
    /// Repository owner (user or organization).
    pub owner: String,

    /// Repository name.
    pub repo: String,

    /// Branch that publishes move.
    pub branch: String,

    /// GitHub App ID used as the JWT issuer.
    pub app_id: String,

    /// REST API base URL.
    pub api_base_url: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// User-Agent header sent with every request.
    pub user_agent: String,
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            owner: String::new(),
            repo: String::new(),
            branch: "main".to_string(),
            app_id: String::new(),
            api_base_url: "https://api.github.com".to_string(),
            timeout_secs: 30,
            user_agent: format!("site-publisher/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Backend holding the encrypted credential record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialBackend {
    /// JSON file at `credential_path`.
    #[default]
    File,

    /// OS keychain.
    Keyring,
}

/// Where the encrypted credential record lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StorageSettings {
    pub backend: CredentialBackend,

    /// Path of the JSON file holding the encrypted private key; only used
    /// by the file backend.
    pub credential_path: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: CredentialBackend::File,
            credential_path: PathBuf::from("credentials.json"),
        }
    }
}

/// Owner/repo/branch triple every git operation is addressed by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoTarget {
    pub owner: String,
    pub repo: String,
    pub branch: String,
}

impl RepoTarget {
    /// Ref path relative to `refs/`, e.g. `heads/main`.
    pub fn ref_path(&self) -> String {
        format!("heads/{}", self.branch)
    }
}

impl GitHubSettings {
    /// Check that owner and repo are usable before any network call.
    pub fn validate(&self) -> Result<(), AppError> {
        let is_unset = |v: &str| v.trim().is_empty() || v.trim() == UNSET_PLACEHOLDER;

        if is_unset(&self.owner) || is_unset(&self.repo) {
            return Err(AppError::repo_unavailable(
                "GitHub owner and repo are not configured",
            ));
        }
        if self.branch.trim().is_empty() {
            return Err(AppError::repo_unavailable("GitHub branch is not configured"));
        }
        Ok(())
    }

    /// Validated repository coordinates.
    pub fn repo_target(&self) -> Result<RepoTarget, AppError> {
        self.validate()?;
        Ok(RepoTarget {
            owner: self.owner.trim().to_string(),
            repo: self.repo.trim().to_string(),
            branch: self.branch.trim().to_string(),
        })
    }
}

impl AppSettings {
    /// Load settings from `path`, using defaults if the file does not exist.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        match std::fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str(&raw)
                .map_err(|e| AppError::invalid_input(format!("Invalid settings file: {}", e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No settings at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(AppError::internal(format!(
                "Failed to read settings: {}",
                e
            ))),
        }
    }

    /// Save settings to `path`.
    pub fn save(&self, path: &Path) -> Result<(), AppError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .map_err(|e| AppError::internal(format!("Failed to save settings: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> GitHubSettings {
        GitHubSettings {
            owner: "octo".to_string(),
            repo: "site".to_string(),
            app_id: "12345".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_settings() {
        let settings = AppSettings::default();
        assert_eq!(settings.github.branch, "main");
        assert_eq!(settings.github.api_base_url, "https://api.github.com");
        assert_eq!(settings.github.timeout_secs, 30);
    }

    #[test]
    fn test_placeholder_owner_is_rejected() {
        let mut github = configured();
        github.owner = "-".to_string();
        let err = github.validate().unwrap_err();
        assert!(matches!(err, AppError::RepoUnavailable { .. }));

        github.owner = "octo".to_string();
        github.repo = "  ".to_string();
        assert!(github.validate().is_err());
    }

    #[test]
    fn test_repo_target_ref_path() {
        let target = configured().repo_target().unwrap();
        assert_eq!(target.ref_path(), "heads/main");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, r#"{"github":{"owner":"octo","repo":"site"}}"#).unwrap();

        let settings = AppSettings::load(&path).unwrap();
        assert_eq!(settings.github.owner, "octo");
        assert_eq!(settings.github.branch, "main");
        assert_eq!(settings.storage.credential_path, PathBuf::from("credentials.json"));
        assert_eq!(settings.storage.backend, CredentialBackend::File);
    }

    #[test]
    fn test_keyring_backend_parses() {
        let settings: AppSettings =
            serde_json::from_str(r#"{"storage":{"backend":"keyring"}}"#).unwrap();
        assert_eq!(settings.storage.backend, CredentialBackend::Keyring);
        assert_eq!(settings.storage.credential_path, PathBuf::from("credentials.json"));
    }

    #[test]
    fn test_missing_file_and_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        let mut settings = AppSettings::load(&path).unwrap();
        settings.github = configured();
        settings.save(&path).unwrap();

        let reloaded = AppSettings::load(&path).unwrap();
        assert_eq!(reloaded.github.app_id, "12345");
    }
}
