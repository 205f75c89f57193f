//! Durable storage for the encrypted credential record.
//!
//! Only the ciphertext envelope is ever written here. Three backends share
//! one trait: a JSON file next to the site settings, the OS keychain
//! (Keychain on macOS, Credential Manager on Windows, Secret Service on
//! Linux), and an in-process store for tests and throwaway sessions.

use crate::config::{CredentialBackend, StorageSettings};
use crate::error::AppError;
use crate::models::CredentialRecord;
use keyring::Entry;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Namespace the record is stored under in every backend.
pub const STORAGE_NAMESPACE: &str = "site-publisher-secure-storage";

/// Service name used in the keychain.
const SERVICE_NAME: &str = "site-publisher";

/// Durable store holding at most one credential record.
pub trait CredentialStore: Send + Sync {
    /// Load the stored record, `None` on first run.
    fn load(&self) -> Result<Option<CredentialRecord>, AppError>;

    /// Replace the stored record.
    fn save(&self, record: &CredentialRecord) -> Result<(), AppError>;

    /// Erase the stored record. Idempotent.
    fn clear(&self) -> Result<(), AppError>;

    /// Whether a record exists.
    fn exists(&self) -> Result<bool, AppError> {
        Ok(self.load()?.is_some())
    }
}

/// JSON file store.
///
/// The file is an object keyed by namespace so it can sit beside other
/// namespaced records without clobbering them.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Map<String, Value>, AppError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(Map::new()),
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| {
                AppError::credential_storage(format!("Corrupted credential file: {}", e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Map::new()),
            Err(e) => Err(AppError::credential_storage(format!(
                "Failed to read credential file: {}",
                e
            ))),
        }
    }

    fn write_all(&self, records: &Map<String, Value>) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        // Write to a sibling file first so a crash never leaves half a record.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(records)?)?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            AppError::credential_storage(format!("Failed to store credential: {}", e))
        })
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<CredentialRecord>, AppError> {
        let mut records = self.read_all()?;
        match records.remove(STORAGE_NAMESPACE) {
            Some(value) => serde_json::from_value(value).map(Some).map_err(|e| {
                AppError::credential_storage(format!("Corrupted credential record: {}", e))
            }),
            None => Ok(None),
        }
    }

    fn save(&self, record: &CredentialRecord) -> Result<(), AppError> {
        let mut records = self.read_all()?;
        records.insert(STORAGE_NAMESPACE.to_string(), serde_json::to_value(record)?);
        self.write_all(&records)
    }

    fn clear(&self) -> Result<(), AppError> {
        let mut records = self.read_all()?;
        if records.remove(STORAGE_NAMESPACE).is_none() {
            return Ok(());
        }
        self.write_all(&records)
    }
}

/// OS keychain store.
#[derive(Debug, Clone)]
pub struct KeyringCredentialStore {
    account: String,
}

impl KeyringCredentialStore {
    /// Store the record under the default namespace.
    pub fn new() -> Self {
        Self::for_account(STORAGE_NAMESPACE)
    }

    /// Store the record under a custom account name.
    pub fn for_account(account: &str) -> Self {
        Self {
            account: normalize_account(account),
        }
    }

    fn entry(&self) -> Result<Entry, AppError> {
        Entry::new(SERVICE_NAME, &self.account).map_err(|e| {
            AppError::credential_storage(format!("Failed to create keyring entry: {}", e))
        })
    }
}

impl Default for KeyringCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for KeyringCredentialStore {
    fn load(&self) -> Result<Option<CredentialRecord>, AppError> {
        match self.entry()?.get_password() {
            Ok(raw) => serde_json::from_str(&raw).map(Some).map_err(|e| {
                AppError::credential_storage(format!("Corrupted credential record: {}", e))
            }),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(AppError::credential_storage(format!(
                "Failed to retrieve credential: {}",
                e
            ))),
        }
    }

    fn save(&self, record: &CredentialRecord) -> Result<(), AppError> {
        let raw = serde_json::to_string(record)?;
        self.entry()?
            .set_password(&raw)
            .map_err(|e| AppError::credential_storage(format!("Failed to store credential: {}", e)))
    }

    fn clear(&self) -> Result<(), AppError> {
        match self.entry()?.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()), // Idempotent: already deleted
            Err(e) => Err(AppError::credential_storage(format!(
                "Failed to delete credential: {}",
                e
            ))),
        }
    }
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    record: Mutex<Option<CredentialRecord>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Option<CredentialRecord>>, AppError> {
        self.record
            .lock()
            .map_err(|_| AppError::credential_storage("Credential store lock poisoned"))
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<CredentialRecord>, AppError> {
        Ok(self.lock()?.clone())
    }

    fn save(&self, record: &CredentialRecord) -> Result<(), AppError> {
        *self.lock()? = Some(record.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), AppError> {
        *self.lock()? = None;
        Ok(())
    }
}

/// Store for the configured backend.
pub fn store_from_settings(settings: &StorageSettings) -> Arc<dyn CredentialStore> {
    match settings.backend {
        CredentialBackend::File => {
            log::debug!(
                "Using credential file {}",
                settings.credential_path.display()
            );
            Arc::new(FileCredentialStore::new(settings.credential_path.clone()))
        }
        CredentialBackend::Keyring => {
            log::debug!("Using OS keychain for credentials");
            Arc::new(KeyringCredentialStore::new())
        }
    }
}

/// Normalize an account name for the keychain.
fn normalize_account(account: &str) -> String {
    account.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(value: &str) -> CredentialRecord {
        CredentialRecord {
            encrypted_key: value.to_string(),
        }
    }

    #[test]
    fn test_normalize_account() {
        assert_eq!(normalize_account(" Site-Publisher "), "site-publisher");
    }

    #[test]
    fn test_file_store_round_trip_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("nested").join("credentials.json"));

        assert!(!store.exists().unwrap());
        store.save(&record("v1:abc")).unwrap();
        assert_eq!(store.load().unwrap(), Some(record("v1:abc")));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        // Clearing twice is not an error
        store.clear().unwrap();
    }

    #[test]
    fn test_file_store_keeps_other_namespaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, r#"{"other-app": {"token": "x"}}"#).unwrap();

        let store = FileCredentialStore::new(&path);
        store.save(&record("v1:abc")).unwrap();
        store.clear().unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("other-app"));
        assert!(!raw.contains(STORAGE_NAMESPACE));
    }

    #[test]
    fn test_file_store_only_persists_encrypted_key_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        let store = FileCredentialStore::new(&path);
        store.save(&record("v1:abc")).unwrap();

        let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let stored = raw[STORAGE_NAMESPACE].as_object().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored["encryptedKey"], "v1:abc");
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryCredentialStore::new();
        store.save(&record("v1:x")).unwrap();
        assert!(store.exists().unwrap());
        store.clear().unwrap();
        assert!(!store.exists().unwrap());
    }

    #[test]
    fn test_file_backend_writes_configured_path() {
        let dir = tempfile::tempdir().unwrap();
        let settings = StorageSettings {
            backend: CredentialBackend::File,
            credential_path: dir.path().join("credentials.json"),
        };

        let store = store_from_settings(&settings);
        store.save(&record("v1:abc")).unwrap();
        assert!(settings.credential_path.exists());
        assert_eq!(store.load().unwrap(), Some(record("v1:abc")));
    }

    #[test]
    fn test_keyring_backend_never_touches_credential_file() {
        let dir = tempfile::tempdir().unwrap();
        let settings = StorageSettings {
            backend: CredentialBackend::Keyring,
            credential_path: dir.path().join("credentials.json"),
        };

        let store = store_from_settings(&settings);
        // The keychain may be unavailable here; only the file matters
        let _ = store.save(&record("v1:abc"));
        let _ = store.clear();
        assert!(!settings.credential_path.exists());
    }
}
