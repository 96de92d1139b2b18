use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tutor_core::model::{ProgressState, PronunciationScoreTable};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Keys of the logical records kept in the key-value store.
pub mod keys {
    pub const PROGRESS: &str = "tutor.progress";
    pub const PRONUNCIATION_SCORES: &str = "tutor.pronunciation_scores";
    pub const LEARNER_NAME: &str = "tutor.learner_name";
}

/// String key-value store; the only persistence primitive the tutor needs.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be written.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend rejects the delete.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Persisted shape of `ProgressState`.
///
/// Indices are signed so that hand-edited or stale saves with negative values
/// still deserialize; they are dropped when converting back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    #[serde(default)]
    pub current_section: i64,
    #[serde(default)]
    pub unlocked_sections: Vec<i64>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl ProgressRecord {
    #[must_use]
    pub fn from_state(state: &ProgressState) -> Self {
        Self {
            current_section: i64::try_from(state.current_section()).unwrap_or(i64::MAX),
            unlocked_sections: state
                .unlocked_sections()
                .iter()
                .filter_map(|&index| i64::try_from(index).ok())
                .collect(),
            last_updated: state.last_updated(),
        }
    }

    /// Convert into domain progress. The result still needs `repair` against
    /// the loaded curriculum.
    #[must_use]
    pub fn into_state(self) -> ProgressState {
        let current = usize::try_from(self.current_section).unwrap_or(0);
        let unlocked = self
            .unlocked_sections
            .into_iter()
            .filter_map(|index| usize::try_from(index).ok());
        ProgressState::from_persisted(current, unlocked, self.last_updated)
    }
}

#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` for malformed records.
    async fn load_progress(&self) -> Result<Option<ProgressState>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be written.
    async fn save_progress(&self, state: &ProgressState) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be removed.
    async fn clear_progress(&self) -> Result<(), StorageError>;
}

#[async_trait]
pub trait PronunciationScoreRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` for malformed records.
    async fn load_scores(&self) -> Result<Option<PronunciationScoreTable>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be written.
    async fn save_scores(&self, table: &PronunciationScoreTable) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be removed.
    async fn clear_scores(&self) -> Result<(), StorageError>;
}

#[async_trait]
pub trait LearnerRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn load_learner_name(&self) -> Result<Option<String>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the name cannot be written.
    async fn save_learner_name(&self, name: &str) -> Result<(), StorageError>;
}

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Typed records over any `KeyValueStore`, encoded as JSON.
#[derive(Clone)]
pub struct KvRepository {
    store: Arc<dyn KeyValueStore>,
}

impl KvRepository {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ProgressRepository for KvRepository {
    async fn load_progress(&self) -> Result<Option<ProgressState>, StorageError> {
        let Some(raw) = self.store.get(keys::PROGRESS).await? else {
            return Ok(None);
        };
        let record: ProgressRecord = serde_json::from_str(&raw).map_err(ser)?;
        Ok(Some(record.into_state()))
    }

    async fn save_progress(&self, state: &ProgressState) -> Result<(), StorageError> {
        let raw = serde_json::to_string(&ProgressRecord::from_state(state)).map_err(ser)?;
        self.store.set(keys::PROGRESS, &raw).await
    }

    async fn clear_progress(&self) -> Result<(), StorageError> {
        self.store.remove(keys::PROGRESS).await
    }
}

#[async_trait]
impl PronunciationScoreRepository for KvRepository {
    async fn load_scores(&self) -> Result<Option<PronunciationScoreTable>, StorageError> {
        let Some(raw) = self.store.get(keys::PRONUNCIATION_SCORES).await? else {
            return Ok(None);
        };
        serde_json::from_str(&raw).map(Some).map_err(ser)
    }

    async fn save_scores(&self, table: &PronunciationScoreTable) -> Result<(), StorageError> {
        let raw = serde_json::to_string(table).map_err(ser)?;
        self.store.set(keys::PRONUNCIATION_SCORES, &raw).await
    }

    async fn clear_scores(&self) -> Result<(), StorageError> {
        self.store.remove(keys::PRONUNCIATION_SCORES).await
    }
}

#[async_trait]
impl LearnerRepository for KvRepository {
    async fn load_learner_name(&self) -> Result<Option<String>, StorageError> {
        let name = self.store.get(keys::LEARNER_NAME).await?;
        Ok(name
            .map(|n| n.trim().to_owned())
            .filter(|n| !n.is_empty()))
    }

    async fn save_learner_name(&self, name: &str) -> Result<(), StorageError> {
        self.store.set(keys::LEARNER_NAME, name.trim()).await
    }
}

/// In-memory key-value store for tests and ephemeral sessions.
///
/// Clones share the same entries. Counts successful writes and removals so
/// tests can assert that a rejected command touched nothing.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
    writes: Arc<AtomicUsize>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `set`/`remove` calls served so far.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(key.to_owned(), value.to_owned());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(key);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Aggregates the record repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub store: Arc<dyn KeyValueStore>,
    pub progress: Arc<dyn ProgressRepository>,
    pub scores: Arc<dyn PronunciationScoreRepository>,
    pub learner: Arc<dyn LearnerRepository>,
}

impl Storage {
    #[must_use]
    pub fn from_store(store: Arc<dyn KeyValueStore>) -> Self {
        let repo = KvRepository::new(Arc::clone(&store));
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo.clone());
        let scores: Arc<dyn PronunciationScoreRepository> = Arc::new(repo.clone());
        let learner: Arc<dyn LearnerRepository> = Arc::new(repo);
        Self {
            store,
            progress,
            scores,
            learner,
        }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_store(Arc::new(InMemoryStore::new()))
    }
}
