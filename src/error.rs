//! Application error types.
//!
//! These errors are serializable so the editing UI receives a structured
//! object it can branch on (prompt for login, show the remote message, ...).

use serde::Serialize;
use thiserror::Error;

/// Application-level errors returned from every public operation.
///
/// All variants serialize to a structured JSON object for frontend consumption.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum AppError {
    /// Supplied key material is not a PEM private key.
    #[error("Invalid key format: {message}")]
    InvalidKeyFormat { message: String },

    /// Wrong passphrase or corrupted ciphertext.
    #[error("Unlock failed: {message}")]
    UnlockFailed { message: String },

    /// No decrypted key in the current session.
    #[error("Not authenticated: {message}")]
    NotAuthenticated { message: String },

    /// JWT signing or token exchange was rejected, or a later call returned 401.
    #[error("GitHub authentication error: {message}")]
    UpstreamAuth {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        status_code: Option<u16>,
    },

    /// Target repository or branch is misconfigured or unreachable.
    #[error("Repository unavailable: {message}")]
    RepoUnavailable {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        status_code: Option<u16>,
    },

    /// A git stage failed after authentication succeeded.
    #[error("{stage} failed: {message}")]
    PipelineStage {
        stage: String,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        status_code: Option<u16>,
    },

    /// GitHub API request returned a non-success status.
    #[error("GitHub API error: {message}")]
    GitHubApi {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        status_code: Option<u16>,
        #[serde(skip_serializing_if = "Option::is_none")]
        endpoint: Option<String>,
    },

    /// Durable credential storage operation failed.
    #[error("Credential storage error: {message}")]
    CredentialStorage { message: String },

    /// Invalid input provided.
    #[error("Invalid input: {message}")]
    InvalidInput {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        field: Option<String>,
    },

    /// Network request failed before any response was received.
    #[error("Network error: {message}")]
    Network { message: String },

    /// Internal application error.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AppError {
    /// Create an invalid key format error.
    pub fn invalid_key_format(message: impl Into<String>) -> Self {
        Self::InvalidKeyFormat {
            message: message.into(),
        }
    }

    /// Create an unlock failure.
    pub fn unlock_failed(message: impl Into<String>) -> Self {
        Self::UnlockFailed {
            message: message.into(),
        }
    }

    /// Create a not-authenticated error.
    pub fn not_authenticated(message: impl Into<String>) -> Self {
        Self::NotAuthenticated {
            message: message.into(),
        }
    }

    /// Create an upstream authentication error.
    pub fn upstream_auth(message: impl Into<String>) -> Self {
        Self::UpstreamAuth {
            message: message.into(),
            status_code: None,
        }
    }

    /// Create an upstream authentication error with the HTTP status.
    pub fn upstream_auth_status(message: impl Into<String>, status_code: u16) -> Self {
        Self::UpstreamAuth {
            message: message.into(),
            status_code: Some(status_code),
        }
    }

    /// Create a repository unavailable error.
    pub fn repo_unavailable(message: impl Into<String>) -> Self {
        Self::RepoUnavailable {
            message: message.into(),
            status_code: None,
        }
    }

    /// Create a repository unavailable error with the HTTP status.
    pub fn repo_unavailable_status(message: impl Into<String>, status_code: u16) -> Self {
        Self::RepoUnavailable {
            message: message.into(),
            status_code: Some(status_code),
        }
    }

    /// Create a pipeline stage failure.
    pub fn pipeline_stage(
        stage: impl Into<String>,
        message: impl Into<String>,
        status_code: Option<u16>,
    ) -> Self {
        Self::PipelineStage {
            stage: stage.into(),
            message: message.into(),
            status_code,
        }
    }

    /// Create a GitHub API error.
    pub fn github_api(message: impl Into<String>) -> Self {
        Self::GitHubApi {
            message: message.into(),
            status_code: None,
            endpoint: None,
        }
    }

    /// Create a GitHub API error with status code and endpoint.
    pub fn github_api_full(
        message: impl Into<String>,
        status_code: u16,
        endpoint: impl Into<String>,
    ) -> Self {
        Self::GitHubApi {
            message: message.into(),
            status_code: Some(status_code),
            endpoint: Some(endpoint.into()),
        }
    }

    /// Create a credential storage error.
    pub fn credential_storage(message: impl Into<String>) -> Self {
        Self::CredentialStorage {
            message: message.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            field: None,
        }
    }

    /// Create an invalid input error with field name.
    pub fn invalid_input_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this error means the installation token was rejected.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::UpstreamAuth { .. })
    }

    /// HTTP status attached to the error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::UpstreamAuth { status_code, .. }
            | Self::RepoUnavailable { status_code, .. }
            | Self::PipelineStage { status_code, .. }
            | Self::GitHubApi { status_code, .. } => *status_code,
            _ => None,
        }
    }
}

// Conversions from common error types

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::network("Request timed out")
        } else if err.is_connect() {
            Self::network("Failed to connect to server")
        } else if err.is_status() {
            Self::github_api(format!("HTTP error: {}", err))
        } else {
            Self::network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal(format!("JSON error: {}", err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::credential_storage(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::upstream_auth(format!("Failed to sign app JWT: {}", err))
    }
}
