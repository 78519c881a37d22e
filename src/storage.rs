//! Persisted-State Storage and Cleanup
//!
//! Relay sign-clients persist session and pairing state in local key/value
//! storage plus structured on-device databases. The janitor enumerates and
//! deletes every artifact matching the known key layout so a fresh connect
//! never builds on stale credentials.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::WalletError;

/// Key recording the user's last deep-link wallet choice
pub const DEEPLINK_CHOICE_KEY: &str = "WALLETCONNECT_DEEPLINK_CHOICE";

/// Legacy global keys written by older sign-client revisions
pub const LEGACY_KEYS: [&str; 3] = [
    "walletconnect",
    "WALLETCONNECT_V2_CORE",
    "WALLETCONNECT_V2_CLIENT",
];

/// Substrings identifying relay-session keys whose exact form is not known
/// ahead of time
pub const KEY_MARKERS: [&str; 3] = ["walletconnect", "WALLETCONNECT", "wc@"];

/// Substrings identifying relay-session databases
pub const DB_MARKERS: [&str; 3] = ["walletconnect", "WALLETCONNECT", "wc@"];

/// Generic persisted-state failure
#[derive(Debug, Error)]
#[error("storage error: {0}")]
pub struct StorageError(pub String);

impl From<StorageError> for WalletError {
    fn from(err: StorageError) -> Self {
        WalletError::Storage(err.0)
    }
}

/// Local key/value storage (browser localStorage or an embedded analogue)
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
    async fn keys(&self) -> Result<Vec<String>, StorageError>;
}

/// Structured on-device databases (IndexedDB or an embedded analogue)
#[async_trait]
pub trait DatabaseStore: Send + Sync {
    async fn database_names(&self) -> Result<Vec<String>, StorageError>;
    async fn delete_database(&self, name: &str) -> Result<(), StorageError>;
}

/// Whether cleanup failures abort the operation or are logged and skipped.
///
/// Strict is used at the start of a fresh connect (never build on possibly
/// corrupt storage); best-effort everywhere in teardown (always reach a
/// clean local state even if individual deletions fail).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupMode {
    Strict,
    BestEffort,
}

/// Deletes all persisted relay-session artifacts matching known prefixes
pub struct StorageJanitor {
    project_id: String,
    kv: Arc<dyn KeyValueStore>,
    db: Arc<dyn DatabaseStore>,
}

impl StorageJanitor {
    pub fn new(project_id: &str, kv: Arc<dyn KeyValueStore>, db: Arc<dyn DatabaseStore>) -> Self {
        Self {
            project_id: project_id.to_string(),
            kv,
            db,
        }
    }

    /// The fixed, well-known keys for this project id
    fn well_known_keys(&self) -> Vec<String> {
        let mut keys = vec![
            DEEPLINK_CHOICE_KEY.to_string(),
            format!("wc@2:client:{}//session", self.project_id),
            format!("wc@2:client:{}//pairing", self.project_id),
        ];
        keys.extend(LEGACY_KEYS.iter().map(|k| k.to_string()));
        keys
    }

    /// Remove all persisted relay-session state.
    ///
    /// Removes the well-known keys, then scans remaining keys for known
    /// markers (catch-all for keys whose exact form is version-dependent),
    /// then deletes any database carrying a wallet-connect marker.
    pub async fn clear(&self, mode: CleanupMode) -> Result<(), StorageError> {
        for key in self.well_known_keys() {
            if let Err(e) = self.kv.remove(&key).await {
                self.handle(mode, e)?;
            }
        }

        match self.kv.keys().await {
            Ok(keys) => {
                for key in keys {
                    if KEY_MARKERS.iter().any(|m| key.contains(m)) {
                        debug!("removing stray relay key: {}", key);
                        if let Err(e) = self.kv.remove(&key).await {
                            self.handle(mode, e)?;
                        }
                    }
                }
            }
            Err(e) => self.handle(mode, e)?,
        }

        match self.db.database_names().await {
            Ok(names) => {
                for name in names {
                    if DB_MARKERS.iter().any(|m| name.contains(m)) {
                        debug!("deleting relay database: {}", name);
                        if let Err(e) = self.db.delete_database(&name).await {
                            self.handle(mode, e)?;
                        }
                    }
                }
            }
            Err(e) => self.handle(mode, e)?,
        }

        Ok(())
    }

    fn handle(&self, mode: CleanupMode, err: StorageError) -> Result<(), StorageError> {
        match mode {
            CleanupMode::Strict => Err(err),
            CleanupMode::BestEffort => {
                warn!("ignoring cleanup failure: {}", err);
                Ok(())
            }
        }
    }
}

/// In-memory store backing both traits, for tests and headless hosts
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<std::collections::BTreeMap<String, String>>,
    databases: Mutex<std::collections::BTreeSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a database by name (tests seed state through this)
    pub fn create_database(&self, name: &str) {
        self.databases.lock().unwrap().insert(name.to_string());
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.entries.lock().unwrap().keys().cloned().collect())
    }
}

#[async_trait]
impl DatabaseStore for MemoryStore {
    async fn database_names(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.databases.lock().unwrap().iter().cloned().collect())
    }

    async fn delete_database(&self, name: &str) -> Result<(), StorageError> {
        self.databases.lock().unwrap().remove(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    struct FailingStore;

    #[async_trait]
    impl KeyValueStore for FailingStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError("kv offline".to_string()))
        }

        async fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError("kv offline".to_string()))
        }

        async fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError("kv offline".to_string()))
        }

        async fn keys(&self) -> Result<Vec<String>, StorageError> {
            Err(StorageError("kv offline".to_string()))
        }
    }

    async fn seeded_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store.set(DEEPLINK_CHOICE_KEY, "{}").await.unwrap();
        store
            .set("wc@2:client:abc123//session", "[...]")
            .await
            .unwrap();
        store.set("WALLETCONNECT_V2_CORE", "{}").await.unwrap();
        store
            .set("wc@2:0.3//messages", "{}") // version-dependent key
            .await
            .unwrap();
        store.set("app:theme", "dark").await.unwrap();
        store.create_database("WALLETCONNECT_V2_INDEXED_DB");
        store.create_database("app-cache");
        store
    }

    #[tokio::test]
    async fn test_clear_removes_known_keys_and_markers() {
        let store = seeded_store().await;
        let janitor = StorageJanitor::new("abc123", store.clone(), store.clone());

        assert_ok!(janitor.clear(CleanupMode::Strict).await);

        let keys = store.keys().await.unwrap();
        assert_eq!(keys, vec!["app:theme".to_string()]);
        assert_eq!(
            store.database_names().await.unwrap(),
            vec!["app-cache".to_string()]
        );
    }

    #[tokio::test]
    async fn test_strict_mode_propagates_failures() {
        let store = Arc::new(MemoryStore::new());
        let janitor = StorageJanitor::new("abc123", Arc::new(FailingStore), store);

        let result = janitor.clear(CleanupMode::Strict).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_best_effort_mode_swallows_failures() {
        let store = Arc::new(MemoryStore::new());
        store.create_database("wc@2:core");
        let janitor = StorageJanitor::new("abc123", Arc::new(FailingStore), store.clone());

        assert_ok!(janitor.clear(CleanupMode::BestEffort).await);

        // Database cleanup still ran despite the kv failures
        assert!(store.database_names().await.unwrap().is_empty());
    }
}
