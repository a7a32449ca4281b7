use sqlx::Row;

use super::SqliteStore;
use crate::repository::{Snapshot, SnapshotStore, StorageError};

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait::async_trait]
impl SnapshotStore for SqliteStore {
    async fn save(&self, page_path: &str, snapshot: &Snapshot) -> Result<(), StorageError> {
        let payload = serde_json::to_string(snapshot)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        sqlx::query(
            r"
                INSERT INTO quiz_snapshots (page_path, payload, saved_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(page_path) DO UPDATE SET
                    payload = excluded.payload,
                    saved_at = excluded.saved_at
            ",
        )
        .bind(page_path)
        .bind(payload)
        .bind(snapshot.saved_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn load(&self, page_path: &str) -> Result<Option<Snapshot>, StorageError> {
        let row = sqlx::query("SELECT payload FROM quiz_snapshots WHERE page_path = ?1")
            .bind(page_path)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let payload: String = row.try_get("payload").map_err(conn)?;
        // Corrupt payloads are treated as absence, never as a fatal condition.
        Ok(serde_json::from_str(&payload).ok())
    }

    async fn clear(&self, page_path: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM quiz_snapshots WHERE page_path = ?1")
            .bind(page_path)
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(())
    }
}
