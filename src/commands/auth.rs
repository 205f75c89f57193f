//! Authentication commands.
//!
//! These commands drive the vault from the login screen: first-run setup,
//! unlocking an existing credential, logging out and erasing the credential.

use crate::error::AppError;
use crate::models::AuthStatus;
use crate::state::AppState;
use serde::Deserialize;

/// Input for the login command.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginInput {
    /// PEM private key; required on first run, ignored afterwards.
    #[serde(default)]
    pub pem: Option<String>,

    /// Passphrase protecting the stored key.
    pub passphrase: String,
}

/// Which login flow the UI should show.
pub async fn auth_status(state: &AppState) -> Result<AuthStatus, AppError> {
    Ok(AuthStatus {
        has_stored_credential: state.vault().has_stored_credential()?,
        is_unlocked: state.session().is_authenticated().await,
    })
}

/// Set up the vault on first run, unlock it otherwise.
///
/// # Errors
/// - `InvalidInput` if no key was supplied on first run
/// - `InvalidKeyFormat` if the supplied key is not PEM
/// - `UnlockFailed` if the passphrase does not decrypt the stored key
pub async fn login(state: &AppState, input: LoginInput) -> Result<AuthStatus, AppError> {
    let vault = state.vault();

    if vault.has_stored_credential()? {
        if input.pem.is_some() {
            log::debug!("Credential already stored, ignoring supplied key");
        }
        vault.unlock(&input.passphrase).await?;
    } else {
        let pem = input
            .pem
            .as_deref()
            .filter(|pem| !pem.trim().is_empty())
            .ok_or_else(|| {
                AppError::invalid_input_field("A private key is required for first-time setup", "pem")
            })?;
        vault.initialize(pem.as_bytes(), &input.passphrase).await?;
    }

    auth_status(state).await
}

/// End the session; the stored credential stays for the next unlock.
pub async fn logout(state: &AppState) -> Result<AuthStatus, AppError> {
    state.vault().lock().await;
    auth_status(state).await
}

/// End the session and erase the stored credential.
pub async fn reset_credentials(state: &AppState) -> Result<AuthStatus, AppError> {
    state.vault().reset().await?;
    auth_status(state).await
}
