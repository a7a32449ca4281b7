#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    CachedResult, InMemoryStore, ResultCache, Snapshot, SnapshotStore, Storage, StorageError,
};
pub use sqlite::{SqliteInitError, SqliteStore};
