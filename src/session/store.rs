//! Durable persistence for the unlock session
//!
//! Only two fields ever touch disk: the unlocked flag and the unlock
//! timestamp. The wallet access token is volatile by design and has no
//! place in the serialized form.

use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

/// The persisted slice of the unlock session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedLockState {
    pub is_wallet_unlocked: bool,
    pub unlock_timestamp: Option<i64>,
}

impl PersistedLockState {
    pub fn locked() -> Self {
        Self::default()
    }

    pub fn unlocked_at(timestamp_ms: i64) -> Self {
        Self {
            is_wallet_unlocked: true,
            unlock_timestamp: Some(timestamp_ms),
        }
    }
}

/// Storage backend for the persisted lock state.
///
/// Modeled async to tolerate storage backends that suspend; the file
/// implementation goes through `tokio::fs`.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the persisted state. A missing record is the locked default;
    /// unreadable or corrupt records are errors so the session can fail
    /// closed.
    async fn load(&self) -> Result<PersistedLockState>;

    /// Persist the given state.
    async fn save(&self, state: &PersistedLockState) -> Result<()>;
}

/// File-backed store (JSON).
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl StateStore for FileStore {
    async fn load(&self) -> Result<PersistedLockState> {
        if !self.path.exists() {
            return Ok(PersistedLockState::locked());
        }
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| Error::Storage(e.to_string()))
    }

    async fn save(&self, state: &PersistedLockState) -> Result<()> {
        let content =
            serde_json::to_string_pretty(state).map_err(|e| Error::Storage(e.to_string()))?;
        tokio::fs::write(&self.path, content)
            .await
            .map_err(|e| Error::Storage(e.to_string()))
    }
}

/// In-memory store, for tests and ephemeral sessions.
#[derive(Default, Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<Option<PersistedLockState>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: PersistedLockState) -> Self {
        Self {
            state: Arc::new(Mutex::new(Some(state))),
        }
    }

    /// Current stored value, if anything has been saved.
    pub async fn snapshot(&self) -> Option<PersistedLockState> {
        self.state.lock().await.clone()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn load(&self) -> Result<PersistedLockState> {
        Ok(self
            .state
            .lock()
            .await
            .clone()
            .unwrap_or_else(PersistedLockState::locked))
    }

    async fn save(&self, state: &PersistedLockState) -> Result<()> {
        *self.state.lock().await = Some(state.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("wallet-state.json"));

        store
            .save(&PersistedLockState::unlocked_at(1_700_000_000_000))
            .await
            .unwrap();

        let loaded = store.load().await.unwrap();
        assert!(loaded.is_wallet_unlocked);
        assert_eq!(loaded.unlock_timestamp, Some(1_700_000_000_000));
    }

    #[tokio::test]
    async fn missing_file_loads_as_locked() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("absent.json"));

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, PersistedLockState::locked());
    }

    #[tokio::test]
    async fn corrupt_file_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet-state.json");
        tokio::fs::write(&path, "{not json").await.unwrap();

        let store = FileStore::new(&path);
        assert!(matches!(store.load().await, Err(Error::Storage(_))));
    }

    #[test]
    fn serialized_form_has_exactly_the_two_fields() {
        let value =
            serde_json::to_value(PersistedLockState::unlocked_at(1_700_000_000_000)).unwrap();
        let object = value.as_object().unwrap();
        let mut keys: Vec<_> = object.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, ["isWalletUnlocked", "unlockTimestamp"]);
    }

    #[test]
    fn wire_names_match_the_storage_layout() {
        let parsed: PersistedLockState = serde_json::from_str(
            r#"{ "isWalletUnlocked": true, "unlockTimestamp": 42 }"#,
        )
        .unwrap();
        assert!(parsed.is_wallet_unlocked);
        assert_eq!(parsed.unlock_timestamp, Some(42));
    }

    #[tokio::test]
    async fn memory_store_round_trip() {
        let store = MemoryStore::new();
        assert_eq!(store.load().await.unwrap(), PersistedLockState::locked());

        store
            .save(&PersistedLockState::unlocked_at(42))
            .await
            .unwrap();
        assert_eq!(
            store.snapshot().await,
            Some(PersistedLockState::unlocked_at(42))
        );
    }
}
