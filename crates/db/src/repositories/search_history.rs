use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use brewline_core::domain::product::ProductId;
use brewline_core::domain::search::{SearchHistoryEntry, SearchHistoryId};
use brewline_core::domain::user::UserId;
use brewline_core::errors::StoreError;
use brewline_core::suggestions::SearchHistoryLog;

use super::{encode_timestamp, parse_rfc3339, RepositoryError};
use crate::DbPool;

pub struct SqlSearchHistoryLog {
    pool: DbPool,
}

impl SqlSearchHistoryLog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Deletes every entry whose expiry is at or before `now`. Returns the
    /// number of rows removed.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM search_history WHERE expires_at <= ?")
            .bind(encode_timestamp(now))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert(&self, entry: &SearchHistoryEntry) -> Result<(), RepositoryError> {
        let tags_json = serde_json::to_string(&entry.tags).map_err(|err| {
            RepositoryError::Decode(format!("could not encode search tags: {err}"))
        })?;

        sqlx::query(
            "INSERT INTO search_history
                (id, user_id, query, tags_json, product_id, created_at, expires_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&entry.id.0)
        .bind(entry.user_id.as_str())
        .bind(&entry.query)
        .bind(tags_json)
        .bind(entry.product_id.as_ref().map(|id| id.0.clone()))
        .bind(encode_timestamp(entry.created_at))
        .bind(encode_timestamp(entry.expires_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn select_recent(
        &self,
        user_id: &UserId,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<SearchHistoryEntry>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, user_id, query, tags_json, product_id, created_at, expires_at
             FROM search_history
             WHERE user_id = ? AND expires_at > ?
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?",
        )
        .bind(user_id.as_str())
        .bind(encode_timestamp(now))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(search_entry_from_row).collect()
    }
}

#[async_trait::async_trait]
impl SearchHistoryLog for SqlSearchHistoryLog {
    async fn append(&self, entry: SearchHistoryEntry) -> Result<(), StoreError> {
        Ok(self.insert(&entry).await?)
    }

    async fn recent_searches(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Vec<SearchHistoryEntry>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        Ok(self.select_recent(user_id, limit, Utc::now()).await?)
    }
}

fn search_entry_from_row(row: &SqliteRow) -> Result<SearchHistoryEntry, RepositoryError> {
    let tags_json: String = row.try_get("tags_json")?;
    let tags: BTreeSet<String> = serde_json::from_str(&tags_json).map_err(|err| {
        RepositoryError::Decode(format!("invalid search tags '{tags_json}': {err}"))
    })?;
    let product_id: Option<String> = row.try_get("product_id")?;
    let created_at: String = row.try_get("created_at")?;
    let expires_at: String = row.try_get("expires_at")?;

    Ok(SearchHistoryEntry {
        id: SearchHistoryId(row.try_get("id")?),
        user_id: UserId(row.try_get("user_id")?),
        query: row.try_get("query")?,
        tags,
        product_id: product_id.map(ProductId),
        created_at: parse_rfc3339("created_at", &created_at)?,
        expires_at: parse_rfc3339("expires_at", &expires_at)?,
    })
}
