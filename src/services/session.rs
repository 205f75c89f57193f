//! Volatile session state.
//!
//! Holds the decrypted private key and the cached installation token for the
//! lifetime of one unlocked session. Nothing in here is ever persisted. The
//! key buffer is zeroed when the session is cleared or dropped.

use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use zeroize::{Zeroize, Zeroizing};

#[derive(Default)]
struct SessionState {
    raw_key: Option<Zeroizing<Vec<u8>>>,
    installation_token: Option<String>,
}

impl Drop for SessionState {
    fn drop(&mut self) {
        if let Some(token) = self.installation_token.as_mut() {
            token.zeroize();
        }
    }
}

/// Shared handle to the session's key material and token cache.
///
/// Cloning the handle shares the same underlying state; the vault writes the
/// key, the token broker reads it and owns the token cache.
#[derive(Clone, Default)]
pub struct SessionContext {
    inner: Arc<RwLock<SessionState>>,
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext").finish_non_exhaustive()
    }
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install freshly decrypted key material.
    ///
    /// A token brokered with a previous key is discarded.
    pub async fn install_key(&self, key: Zeroizing<Vec<u8>>) {
        let mut state = self.inner.write().await;
        state.raw_key = Some(key);
        if let Some(mut token) = state.installation_token.take() {
            token.zeroize();
        }
    }

    /// Copy of the current key material, if the session is unlocked.
    pub async fn current_key(&self) -> Option<Zeroizing<Vec<u8>>> {
        let state = self.inner.read().await;
        state.raw_key.clone()
    }

    /// Whether a key is present.
    pub async fn is_authenticated(&self) -> bool {
        self.inner.read().await.raw_key.is_some()
    }

    /// End the session: zero the key and drop the cached token.
    pub async fn clear(&self) {
        let mut state = self.inner.write().await;
        state.raw_key = None;
        if let Some(mut token) = state.installation_token.take() {
            token.zeroize();
        }
    }

    /// Cached installation token, if any.
    pub async fn cached_token(&self) -> Option<String> {
        self.inner.read().await.installation_token.clone()
    }

    pub async fn cache_token(&self, token: String) {
        let mut state = self.inner.write().await;
        if let Some(mut old) = state.installation_token.replace(token) {
            old.zeroize();
        }
    }

    /// Forget the cached token so the next request re-brokers one.
    pub async fn invalidate_token(&self) {
        let mut state = self.inner.write().await;
        if let Some(mut token) = state.installation_token.take() {
            token.zeroize();
        }
    }
}
