use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use quiz_core::{Identity, Phase, Question, Session, SessionError};

/// Errors surfaced by storage adapters.
///
/// The services layer treats every one of these as best-effort: failures are
/// logged and swallowed, and the session proceeds in memory.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persisted shape of a session, keyed by page path.
///
/// Mirrors the domain `Session` so stores can serialize without leaking
/// storage concerns into the domain layer. The three array fields are
/// mandatory; a payload missing any of them fails to decode and is treated
/// as absence by the loader. Score and percentage are a display cache, never
/// the source of truth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub questions: Vec<Question>,
    pub user_answers: Vec<Option<String>>,
    pub correct_answers: Vec<Option<bool>>,
    #[serde(default)]
    pub current_index: usize,
    #[serde(default)]
    pub show_summary: bool,
    #[serde(default)]
    pub score: u32,
    #[serde(default)]
    pub percentage: u32,
    pub saved_at: DateTime<Utc>,
    #[serde(default)]
    pub identity: Option<Identity>,
}

impl Snapshot {
    /// Captures the current session state.
    #[must_use]
    pub fn from_session(session: &Session, saved_at: DateTime<Utc>) -> Self {
        Self {
            questions: session.questions().to_vec(),
            user_answers: session.user_answers().to_vec(),
            correct_answers: session.correct_answers().to_vec(),
            current_index: session.current_index(),
            show_summary: session.phase() == Phase::Summary,
            score: session.score(),
            percentage: session.percentage(),
            saved_at,
            identity: session.identity().cloned(),
        }
    }

    /// Rehydrates a session from this snapshot.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EmptyQuestionSet` if the snapshot carries no
    /// questions.
    pub fn into_session(self) -> Result<Session, SessionError> {
        Session::resume(
            self.questions,
            self.user_answers,
            self.correct_answers,
            self.current_index,
            self.show_summary,
            self.identity,
        )
    }
}

/// Latest known result for a quiz slug, kept as fallback persistence beside
/// the manifest write-back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResult {
    pub score: u32,
    pub percentage: u32,
    pub finished: bool,
    pub updated: DateTime<Utc>,
}

/// Store for page-path-keyed session snapshots.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Persist a snapshot, overwriting any prior value for the path.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the snapshot cannot be stored.
    async fn save(&self, page_path: &str, snapshot: &Snapshot) -> Result<(), StorageError>;

    /// Most recent snapshot for the path, or `None` when absent or corrupt.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` only for backend failures; corrupt payloads
    /// decode to `None`.
    async fn load(&self, page_path: &str) -> Result<Option<Snapshot>, StorageError>;

    /// Removes the snapshot for the path. Clearing a missing path is not an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the removal cannot be executed.
    async fn clear(&self, page_path: &str) -> Result<(), StorageError>;
}

/// Slug-keyed cache of the latest quiz results.
#[async_trait]
pub trait ResultCache: Send + Sync {
    /// Records the latest result for a slug, overwriting any prior entry.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the entry cannot be stored.
    async fn upsert(&self, slug: &str, result: &CachedResult) -> Result<(), StorageError>;

    /// Latest cached result for a slug, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` for backend failures.
    async fn get(&self, slug: &str) -> Result<Option<CachedResult>, StorageError>;
}

/// Simple in-memory store for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    snapshots: Arc<Mutex<HashMap<String, Snapshot>>>,
    results: Arc<Mutex<HashMap<String, CachedResult>>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for InMemoryStore {
    async fn save(&self, page_path: &str, snapshot: &Snapshot) -> Result<(), StorageError> {
        let mut guard = self
            .snapshots
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(page_path.to_owned(), snapshot.clone());
        Ok(())
    }

    async fn load(&self, page_path: &str) -> Result<Option<Snapshot>, StorageError> {
        let guard = self
            .snapshots
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(page_path).cloned())
    }

    async fn clear(&self, page_path: &str) -> Result<(), StorageError> {
        let mut guard = self
            .snapshots
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(page_path);
        Ok(())
    }
}

#[async_trait]
impl ResultCache for InMemoryStore {
    async fn upsert(&self, slug: &str, result: &CachedResult) -> Result<(), StorageError> {
        let mut guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(slug.to_owned(), result.clone());
        Ok(())
    }

    async fn get(&self, slug: &str) -> Result<Option<CachedResult>, StorageError> {
        let guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(slug).cloned())
    }
}

/// Aggregates the snapshot store and result cache behind trait objects for
/// easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub snapshots: Arc<dyn SnapshotStore>,
    pub results: Arc<dyn ResultCache>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let store = InMemoryStore::new();
        let snapshots: Arc<dyn SnapshotStore> = Arc::new(store.clone());
        let results: Arc<dyn ResultCache> = Arc::new(store);
        Self { snapshots, results }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::time::fixed_now;
    use quiz_core::{QuestionBank, Session};

    fn sample_session() -> Session {
        let raw = r#"[{"question":"a?","answer":"1"},{"question":"b?","answer":"2"}]"#;
        let mut session = Session::new(QuestionBank::from_sources(Some(raw), None), None);
        session
            .submit_intro(Identity::new("Ana", "0812", "Jakarta"))
            .unwrap();
        session.check_answer("1").unwrap();
        session.advance().unwrap();
        session
    }

    #[tokio::test]
    async fn snapshot_round_trip_reconstructs_session() {
        let store = InMemoryStore::new();
        let session = sample_session();
        let snapshot = Snapshot::from_session(&session, fixed_now());

        store.save("/pages/kuis", &snapshot).await.unwrap();
        let loaded = store.load("/pages/kuis").await.unwrap().unwrap();
        assert_eq!(loaded, snapshot);

        let restored = loaded.into_session().unwrap();
        assert_eq!(restored.questions(), session.questions());
        assert_eq!(restored.user_answers(), session.user_answers());
        assert_eq!(restored.correct_answers(), session.correct_answers());
        assert_eq!(restored.current_index(), session.current_index());
    }

    #[tokio::test]
    async fn load_of_missing_path_is_none() {
        let store = InMemoryStore::new();
        assert!(store.load("/nowhere").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn clear_removes_the_snapshot() {
        let store = InMemoryStore::new();
        let snapshot = Snapshot::from_session(&sample_session(), fixed_now());
        store.save("/p", &snapshot).await.unwrap();
        store.clear("/p").await.unwrap();
        assert!(store.load("/p").await.unwrap().is_none());
        // Clearing again is not an error.
        store.clear("/p").await.unwrap();
    }

    #[test]
    fn snapshot_missing_array_fields_fails_to_decode() {
        let payload = r#"{"questions":[],"current_index":0,"saved_at":"2024-05-01T00:00:00Z"}"#;
        assert!(serde_json::from_str::<Snapshot>(payload).is_err());
    }

    #[tokio::test]
    async fn result_cache_overwrites_per_slug() {
        let store = InMemoryStore::new();
        let first = CachedResult {
            score: 1,
            percentage: 50,
            finished: false,
            updated: fixed_now(),
        };
        let second = CachedResult {
            score: 2,
            percentage: 100,
            finished: false,
            updated: fixed_now(),
        };
        store.upsert("kuis", &first).await.unwrap();
        store.upsert("kuis", &second).await.unwrap();
        assert_eq!(store.get("kuis").await.unwrap(), Some(second));
        assert_eq!(store.get("other").await.unwrap(), None);
    }
}
