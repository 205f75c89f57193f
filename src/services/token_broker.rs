//! Installation token broker.
//!
//! Exchanges the session's private key for a GitHub App installation token:
//! sign an RS256 app JWT, look up the installation on the configured
//! repository, then mint an access token for it. The token is cached in the
//! session until logout or until a call reports it as rejected.

use crate::config::RepoTarget;
use crate::error::AppError;
use crate::services::github_client::AppInstallationApi;
use crate::services::session::SessionContext;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Backdate `iat` to tolerate clock drift against GitHub.
const JWT_BACKDATE_SECS: i64 = 60;

/// GitHub caps app JWT lifetime at ten minutes.
const JWT_LIFETIME_SECS: i64 = 9 * 60;

#[derive(Debug, Serialize)]
struct AppClaims<'a> {
    iat: i64,
    exp: i64,
    iss: &'a str,
}

/// Sign a short-lived app JWT with a PEM RSA private key.
pub fn sign_app_jwt(app_id: &str, pem: &[u8]) -> Result<String, AppError> {
    if app_id.trim().is_empty() {
        return Err(AppError::upstream_auth("GitHub App ID is not configured"));
    }

    let key = EncodingKey::from_rsa_pem(pem)?;
    let now = chrono::Utc::now().timestamp();
    let claims = AppClaims {
        iat: now - JWT_BACKDATE_SECS,
        exp: now + JWT_LIFETIME_SECS,
        iss: app_id.trim(),
    };

    Ok(jsonwebtoken::encode(
        &Header::new(Algorithm::RS256),
        &claims,
        &key,
    )?)
}

/// Session-scoped installation token cache in front of the app exchange.
pub struct TokenBroker {
    session: SessionContext,
    api: Arc<dyn AppInstallationApi>,
    app_id: String,
    // Serializes brokering so concurrent callers share one exchange
    exchange: Mutex<()>,
}

impl TokenBroker {
    pub fn new(
        session: SessionContext,
        api: Arc<dyn AppInstallationApi>,
        app_id: impl Into<String>,
    ) -> Self {
        Self {
            session,
            api,
            app_id: app_id.into(),
            exchange: Mutex::new(()),
        }
    }

    /// Cached installation token, brokering a new one for `target` when absent.
    pub async fn get_auth_token(&self, target: &RepoTarget) -> Result<String, AppError> {
        if let Some(token) = self.session.cached_token().await {
            return Ok(token);
        }

        let _guard = self.exchange.lock().await;
        // Another caller may have finished brokering while we waited
        if let Some(token) = self.session.cached_token().await {
            return Ok(token);
        }

        let key = self
            .session
            .current_key()
            .await
            .ok_or_else(|| AppError::not_authenticated("Unlock the vault to publish"))?;

        log::info!(
            "Brokering installation token for {}/{}",
            target.owner,
            target.repo
        );
        let jwt = sign_app_jwt(&self.app_id, &key)?;

        let installation_id = self
            .api
            .installation_id(&jwt, &target.owner, &target.repo)
            .await
            .map_err(|e| exchange_error("Installation lookup", e))?;
        let token = self
            .api
            .installation_token(&jwt, installation_id)
            .await
            .map_err(|e| exchange_error("Token exchange", e))?;

        self.session.cache_token(token.clone()).await;
        log::debug!("Installation {} token cached", installation_id);
        Ok(token)
    }

    /// Drop the cached token after the API rejected it.
    pub async fn invalidate(&self) {
        log::warn!("Installation token rejected, next publish will re-broker");
        self.session.invalidate_token().await;
    }
}

/// Every failure during the exchange is an upstream auth failure.
fn exchange_error(step: &str, err: AppError) -> AppError {
    let message = format!("{} failed: {}", step, err);
    match err.status_code() {
        Some(status) => AppError::upstream_auth_status(message, status),
        None => AppError::upstream_auth(message),
    }
}
