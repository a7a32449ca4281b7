use sqlx::Row;

use super::SqliteStore;
use crate::repository::{CachedResult, ResultCache, StorageError};

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

#[async_trait::async_trait]
impl ResultCache for SqliteStore {
    async fn upsert(&self, slug: &str, result: &CachedResult) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO quiz_results (slug, score, percentage, finished, updated)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(slug) DO UPDATE SET
                    score = excluded.score,
                    percentage = excluded.percentage,
                    finished = excluded.finished,
                    updated = excluded.updated
            ",
        )
        .bind(slug)
        .bind(i64::from(result.score))
        .bind(i64::from(result.percentage))
        .bind(result.finished)
        .bind(result.updated)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn get(&self, slug: &str) -> Result<Option<CachedResult>, StorageError> {
        let row = sqlx::query(
            "SELECT score, percentage, finished, updated FROM quiz_results WHERE slug = ?1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let score = u32_from_i64("score", row.try_get::<i64, _>("score").map_err(conn)?)?;
        let percentage = u32_from_i64(
            "percentage",
            row.try_get::<i64, _>("percentage").map_err(conn)?,
        )?;
        let finished: bool = row.try_get("finished").map_err(conn)?;
        let updated = row.try_get("updated").map_err(conn)?;

        Ok(Some(CachedResult {
            score,
            percentage,
            finished,
            updated,
        }))
    }
}
