//! Durable credential record.

use serde::{Deserialize, Serialize};

/// The only credential data ever written to durable storage.
///
/// `encrypted_key` is the passphrase-encrypted PEM private key envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRecord {
    pub encrypted_key: String,
}

/// Auth state reported to the UI to pick the setup or unlock flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatus {
    pub has_stored_credential: bool,
    pub is_unlocked: bool,
}
